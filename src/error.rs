use thiserror::Error;

/// Failures the pipeline distinguishes between.
///
/// Only `InvalidUrl` ever reaches a caller; the other variants describe a
/// single failed step and are logged before the pipeline moves on.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("caption attempt '{attempt}' failed: {reason}")]
    CaptionFetch { attempt: String, reason: String },

    #[error("no captions available for video {0}")]
    NoCaptionsAvailable(String),

    #[error("metadata fetch for video {video_id} failed: {reason}")]
    MetadataFetch { video_id: String, reason: String },
}
