pub mod captions;
pub mod config;
pub mod error;
pub mod fallback;
pub mod http;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod summarize;
pub mod youtube;

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

pub use captions::Segment;
pub use error::Error;
pub use metadata::VideoMetadata;
pub use pipeline::{Pipeline, PipelineOptions};
pub use summarize::{SummaryMethod, SummaryOptions, SummaryResult};

use captions::CaptionText;

/// Accepted URL shapes, most common first. The ID must not run on into
/// further ID characters.
static URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"youtube\.com/watch\?(?:[^#]*&)?v=([a-zA-Z0-9_-]{11})(?:[^a-zA-Z0-9_-]|$)",
        r"youtu\.be/([a-zA-Z0-9_-]{11})(?:[^a-zA-Z0-9_-]|$)",
        r"youtube(?:-nocookie)?\.com/embed/([a-zA-Z0-9_-]{11})(?:[^a-zA-Z0-9_-]|$)",
        r"youtube\.com/v/([a-zA-Z0-9_-]{11})(?:[^a-zA-Z0-9_-]|$)",
        r"youtube\.com/shorts/([a-zA-Z0-9_-]{11})(?:[^a-zA-Z0-9_-]|$)",
        r"^([a-zA-Z0-9_-]{11})$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid video URL regex"))
    .collect()
});

/// Extract video ID from various YouTube URL formats
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    URL_PATTERNS
        .iter()
        .find_map(|re| re.captures(input).map(|caps| caps[1].to_string()))
}

/// A video URL and the ID resolved from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRef {
    pub raw_url: String,
    pub video_id: String,
}

impl VideoRef {
    pub fn parse(raw_url: &str) -> Result<Self, Error> {
        let video_id = extract_video_id(raw_url).ok_or_else(|| Error::InvalidUrl(raw_url.trim().to_string()))?;
        Ok(Self {
            raw_url: raw_url.trim().to_string(),
            video_id,
        })
    }

    pub fn watch_url(&self) -> String {
        youtube::watch_url(&self.video_id)
    }
}

/// Outcome of the caption search
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResult {
    pub available: bool,
    pub text: String,
    pub length: usize,
    pub word_count: usize,
    /// Which route produced the text, or `none`
    pub source: String,
    /// End of the last timed segment, rounded to whole seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    /// Timed segments, only kept when asked for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<Segment>>,
}

impl TranscriptResult {
    pub fn from_captions(caption: CaptionText, source: String, keep_segments: bool) -> Self {
        let word_count = caption.text.split_whitespace().count();
        let duration_seconds = caption.duration_seconds();
        Self {
            available: true,
            length: caption.length,
            text: caption.text,
            word_count,
            source,
            duration_seconds,
            segments: keep_segments.then_some(caption.segments),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            text: String::new(),
            length: 0,
            word_count: 0,
            source: "none".to_string(),
            duration_seconds: None,
            segments: None,
        }
    }
}

/// Everything one `Pipeline::process` call produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub success: bool,
    pub video_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<TranscriptResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VideoMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryResult>,
    pub processed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessingResult {
    pub fn completed(
        video: VideoRef,
        transcript: TranscriptResult,
        metadata: Option<VideoMetadata>,
        summary: SummaryResult,
    ) -> Self {
        Self {
            success: true,
            video_url: video.raw_url.clone(),
            video: Some(video),
            transcript: Some(transcript),
            metadata,
            summary: Some(summary),
            processed_at: Utc::now(),
            error: None,
        }
    }

    pub fn failure(video_url: &str, error: &Error) -> Self {
        Self {
            success: false,
            video_url: video_url.trim().to_string(),
            video: None,
            transcript: None,
            metadata: None,
            summary: None,
            processed_at: Utc::now(),
            error: Some(error.to_string()),
        }
    }
}
