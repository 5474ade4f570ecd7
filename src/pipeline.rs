use std::time::Duration;

use log::{debug, info, warn};

use crate::http::HttpClient;
use crate::metadata::{fetch_metadata, parse_metadata};
use crate::summarize::{SummaryOptions, SummaryResult, summarize};
use crate::youtube::{CaptionOptions, fetch_watch_page, locate_transcript};
use crate::{ProcessingResult, VideoRef};

pub const NOTHING_AVAILABLE_SUMMARY: &str = "No transcript or description could be retrieved for this video.";

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub captions: CaptionOptions,
    pub summary: SummaryOptions,
    /// Timeout for the watch page request
    pub page_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            captions: CaptionOptions::default(),
            summary: SummaryOptions::default(),
            page_timeout: Duration::from_secs(15),
        }
    }
}

/// Turns a video URL into a transcript and summary.
///
/// Each call owns all of its state, so one `Pipeline` can serve concurrent
/// callers.
pub struct Pipeline<C> {
    client: C,
    options: PipelineOptions,
}

impl<C: HttpClient> Pipeline<C> {
    pub fn new(client: C, options: PipelineOptions) -> Self {
        Self { client, options }
    }

    /// Process one video URL.
    ///
    /// Only an unrecognized URL produces `success: false`. Missing captions
    /// fall back to page metadata, and missing metadata falls back to a
    /// placeholder summary.
    pub async fn process(&self, url: &str) -> ProcessingResult {
        let video = match VideoRef::parse(url) {
            Ok(video) => video,
            Err(e) => {
                warn!("{e}");
                return ProcessingResult::failure(url, &e);
            }
        };
        let video_id = video.video_id.as_str();
        let client: &dyn HttpClient = &self.client;
        info!("Processing video {video_id}");

        let page = match fetch_watch_page(client, video_id, self.options.page_timeout).await {
            Ok(html) => Some(html),
            Err(e) => {
                debug!("Watch page for {video_id} unavailable: {e:#}");
                None
            }
        };

        let transcript = locate_transcript(client, video_id, page.as_deref(), &self.options.captions).await;

        let (metadata, summary) = if transcript.available {
            let metadata = page.as_deref().map(|html| {
                let mut metadata = parse_metadata(html, video_id);
                metadata.duration_seconds = metadata.duration_seconds.or(transcript.duration_seconds);
                metadata
            });
            (metadata, summarize(&transcript.text, &self.options.summary))
        } else {
            info!("No transcript for {video_id}, summarizing page metadata");
            let metadata = match page.as_deref() {
                Some(html) => parse_metadata(html, video_id),
                None => fetch_metadata(client, video_id, self.options.page_timeout).await,
            };
            let summary = if metadata.placeholder {
                SummaryResult::degenerate(self.options.summary.method, NOTHING_AVAILABLE_SUMMARY)
            } else {
                summarize(&metadata.summary_source(), &self.options.summary)
            };
            (Some(metadata), summary)
        };

        info!(
            "Finished {video_id}: transcript={} summary confidence={}",
            transcript.available, summary.confidence
        );
        ProcessingResult::completed(video, transcript, metadata, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::ScriptedClient;

    const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    const PAGE_WITHOUT_CAPTIONS: &str = r#"<html><head><title>Baking Bread at Home - YouTube</title></head><body><script>var ytInitialPlayerResponse = {"videoDetails":{"lengthSeconds":"754","viewCount":"42000","shortDescription":"We mix flour and water into a simple dough.\nThe dough rests overnight in the fridge.\nSubscribe for more baking videos!"}};</script></body></html>"#;

    const PAGE_WITH_CAPTIONS: &str = r#"<html><head><title>Demo - YouTube</title></head><body><script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://captions.example/track?sig=hw","languageCode":"en"}]}}};</script></body></html>"#;

    fn pipeline(client: ScriptedClient, sentences: usize) -> Pipeline<ScriptedClient> {
        let mut options = PipelineOptions::default();
        options.summary.sentences = sentences;
        Pipeline::new(client, options)
    }

    #[tokio::test]
    async fn test_invalid_url_fails_without_network() {
        let pipeline = pipeline(ScriptedClient::new(), 5);
        let result = pipeline.process("https://example.com/not-youtube").await;

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("invalid YouTube URL"));
        assert!(result.transcript.is_none());
        assert!(result.summary.is_none());
        assert!(pipeline.client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_captions_fall_back_to_metadata() {
        let client = ScriptedClient::new().route("watch?v=dQw4w9WgXcQ", PAGE_WITHOUT_CAPTIONS);
        let result = pipeline(client, 5).process(VIDEO_URL).await;

        assert!(result.success);
        assert_eq!(result.video.as_ref().unwrap().video_id, "dQw4w9WgXcQ");
        let transcript = result.transcript.as_ref().unwrap();
        assert!(!transcript.available);

        let metadata = result.metadata.as_ref().unwrap();
        assert_eq!(metadata.title, "Baking Bread at Home");
        assert_eq!(metadata.view_count, Some(42_000));

        let summary = result.summary.as_ref().unwrap();
        assert!(!summary.degenerate);
        assert_eq!(
            summary.text,
            "Baking Bread at Home. We mix flour and water into a simple dough. The dough rests overnight in the fridge."
        );
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_nothing_reachable_is_degraded_success() {
        let result = pipeline(ScriptedClient::new(), 5).process(VIDEO_URL).await;

        assert!(result.success);
        assert!(!result.transcript.as_ref().unwrap().available);
        assert!(result.metadata.as_ref().unwrap().placeholder);
        let summary = result.summary.as_ref().unwrap();
        assert!(summary.degenerate);
        assert_eq!(summary.text, NOTHING_AVAILABLE_SUMMARY);
        assert_eq!(summary.confidence, 0);
    }

    #[tokio::test]
    async fn test_captions_summarized_without_promotions() {
        let client = ScriptedClient::new()
            .route("watch?v=dQw4w9WgXcQ", PAGE_WITH_CAPTIONS)
            .route("sig=hw", "<text>Hello world.</text><text>Subscribe now!</text><text>This is content.</text>");
        let result = pipeline(client, 2).process(VIDEO_URL).await;

        assert!(result.success);
        let transcript = result.transcript.as_ref().unwrap();
        assert!(transcript.available);
        assert_eq!(transcript.text, "Hello world. Subscribe now! This is content.");
        assert_eq!(transcript.source, "embedded caption tracks (en)");

        let summary = result.summary.as_ref().unwrap();
        assert!(summary.text.contains("Hello world"));
        assert!(summary.text.contains("This is content"));
        assert!(!summary.text.contains("Subscribe now"));
        assert_eq!(result.metadata.as_ref().unwrap().title, "Demo");
    }

    #[tokio::test]
    async fn test_title_only_page_is_not_padded_into_a_summary() {
        let client = ScriptedClient::new().route(
            "watch?v=dQw4w9WgXcQ",
            "<html><head><title>Baking Bread at Home - YouTube</title></head><body></body></html>",
        );
        let result = pipeline(client, 5).process(VIDEO_URL).await;

        assert!(result.success);
        let metadata = result.metadata.as_ref().unwrap();
        assert!(metadata.title_found);
        assert!(!metadata.description_found);
        let summary = result.summary.as_ref().unwrap();
        assert!(summary.degenerate);
        assert_eq!(summary.confidence, 0);
        assert!(!summary.text.contains("Video content for"));
    }

    #[tokio::test]
    async fn test_html_from_caption_endpoint_falls_back_to_metadata() {
        let client = ScriptedClient::new()
            .route("watch?v=dQw4w9WgXcQ", PAGE_WITHOUT_CAPTIONS)
            .route(
                "api/timedtext",
                "<html><body><p>Sign in to confirm that you are not a bot please</p></body></html>",
            );
        let result = pipeline(client, 5).process(VIDEO_URL).await;

        assert!(result.success);
        let transcript = result.transcript.as_ref().unwrap();
        assert!(!transcript.available);
        assert_eq!(transcript.source, "none");
        let summary = result.summary.as_ref().unwrap();
        assert!(!summary.text.contains("not a bot"));
        assert!(summary.text.starts_with("Baking Bread at Home."));
    }

    #[tokio::test]
    async fn test_duration_taken_from_captions_when_page_lacks_it() {
        let client = ScriptedClient::new()
            .route("watch?v=dQw4w9WgXcQ", PAGE_WITH_CAPTIONS)
            .route(
                "sig=hw",
                r#"<transcript><text start="0" dur="4">Hello world.</text><text start="95.2" dur="4.5">This is content.</text></transcript>"#,
            );
        let result = pipeline(client, 5).process(VIDEO_URL).await;

        assert_eq!(result.transcript.as_ref().unwrap().duration_seconds, Some(100));
        assert_eq!(result.metadata.as_ref().unwrap().duration_seconds, Some(100));
    }

    #[tokio::test]
    async fn test_serialized_shape() {
        let result = pipeline(ScriptedClient::new(), 5).process(VIDEO_URL).await;
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["videoUrl"], VIDEO_URL);
        assert_eq!(json["video"]["videoId"], "dQw4w9WgXcQ");
        assert_eq!(json["transcript"]["available"], false);
        assert_eq!(json["transcript"]["wordCount"], 0);
        assert_eq!(json["summary"]["method"], "frequency");
        assert!(json["processedAt"].is_string());
        assert!(json.get("error").is_none());

        let failed = pipeline(ScriptedClient::new(), 5).process("nope").await;
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
        assert!(json.get("transcript").is_none());
    }
}
