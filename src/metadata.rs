use std::sync::LazyLock;
use std::time::Duration;

use log::{debug, warn};
use regex::Regex;
use serde::Serialize;

use crate::Error;
use crate::captions::{collapse_whitespace, decode_entities};
use crate::http::HttpClient;
use crate::youtube::fetch_watch_page;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid metadata regex"))
        .collect()
}

static TITLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?s)<title>(.*?)</title>",
        r#"<meta\s+property="og:title"\s+content="([^"]*)""#,
        r#""videoDetails"\s*:\s*\{[^{}]*?"title"\s*:\s*"((?:[^"\\]|\\.)*)""#,
    ])
});

static DESCRIPTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r#""shortDescription"\s*:\s*"((?:[^"\\]|\\.)*)""#,
        r#"<meta\s+property="og:description"\s+content="([^"]*)""#,
        r#"<meta\s+name="description"\s+content="([^"]*)""#,
    ])
});

static VIEW_COUNT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r#""viewCount"\s*:\s*"(\d+)""#,
        r#""viewCount"\s*:\s*\{\s*"simpleText"\s*:\s*"([\d,.\s]+)"#,
    ])
});

static LENGTH_SECONDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""lengthSeconds"\s*:\s*"(\d+)""#).expect("valid length regex"));

static APPROX_DURATION_MS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""approxDurationMs"\s*:\s*"(\d+)""#).expect("valid duration regex"));

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid url regex"));

static HASHTAG_OR_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#@]\w+").expect("valid hashtag regex"));

/// Page-level facts about a video, used when no captions can be found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub duration_seconds: Option<u64>,
    pub view_count: Option<u64>,
    /// False when `title` is placeholder text
    pub title_found: bool,
    /// False when `description` is placeholder text
    pub description_found: bool,
    /// True when title and description are both placeholders
    pub placeholder: bool,
}

impl VideoMetadata {
    pub fn placeholder(video_id: &str) -> Self {
        Self {
            title: placeholder_title(video_id),
            description: placeholder_description(video_id),
            duration_seconds: None,
            view_count: None,
            title_found: false,
            description_found: false,
            placeholder: true,
        }
    }

    /// Title and description as prose for the summarizer.
    ///
    /// Links, hashtags and mentions are dropped and each description line
    /// becomes its own sentence. Placeholder fields contribute nothing.
    pub fn summary_source(&self) -> String {
        let mut sentences = Vec::new();
        if self.title_found {
            sentences.push(terminate(collapse_whitespace(&self.title)));
        }
        if self.description_found {
            sentences.extend(description_sentences(&self.description));
        }
        sentences.join(" ")
    }
}

fn description_sentences(description: &str) -> Vec<String> {
    let description = URL.replace_all(description, "");
    let description = HASHTAG_OR_MENTION.replace_all(&description, "");
    description
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .map(terminate)
        .collect()
}

fn terminate(mut sentence: String) -> String {
    if !sentence.ends_with(['.', '!', '?', '।', '॥']) {
        sentence.push('.');
    }
    sentence
}

fn placeholder_title(video_id: &str) -> String {
    format!("YouTube Video {video_id}")
}

fn placeholder_description(video_id: &str) -> String {
    format!("Video content for {video_id}")
}

/// Fetch the watch page and read metadata from it. Never fails: anything
/// that cannot be found is replaced with a placeholder.
pub async fn fetch_metadata(client: &dyn HttpClient, video_id: &str, timeout: Duration) -> VideoMetadata {
    match fetch_watch_page(client, video_id, timeout).await {
        Ok(html) => parse_metadata(&html, video_id),
        Err(e) => {
            let err = Error::MetadataFetch {
                video_id: video_id.to_string(),
                reason: format!("{e:#}"),
            };
            warn!("{err}");
            VideoMetadata::placeholder(video_id)
        }
    }
}

/// Read title, description, view count and duration from watch page HTML
pub fn parse_metadata(html: &str, video_id: &str) -> VideoMetadata {
    let title = TITLE_PATTERNS.iter().find_map(|re| {
        let raw = re.captures(html)?.get(1)?.as_str();
        let title = clean_title(raw);
        (!title.is_empty()).then_some(title)
    });

    let description = DESCRIPTION_PATTERNS.iter().find_map(|re| {
        let raw = re.captures(html)?.get(1)?.as_str();
        let description = decode_entities(&decode_escapes(raw)).trim().to_string();
        (!description.is_empty()).then_some(description)
    });

    let view_count = VIEW_COUNT_PATTERNS
        .iter()
        .find_map(|re| parse_digits(re.captures(html)?.get(1)?.as_str()));

    let duration_seconds = LENGTH_SECONDS
        .captures(html)
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .or_else(|| {
            APPROX_DURATION_MS
                .captures(html)
                .and_then(|caps| caps[1].parse::<u64>().ok())
                .map(|ms| ms / 1000)
        });

    debug!(
        "Metadata for {video_id}: title={} description={} views={view_count:?} duration={duration_seconds:?}",
        title.is_some(),
        description.is_some(),
    );

    VideoMetadata {
        title_found: title.is_some(),
        description_found: description.is_some(),
        placeholder: title.is_none() && description.is_none(),
        title: title.unwrap_or_else(|| placeholder_title(video_id)),
        description: description.unwrap_or_else(|| placeholder_description(video_id)),
        duration_seconds,
        view_count,
    }
}

fn clean_title(raw: &str) -> String {
    let title = decode_entities(&decode_escapes(raw));
    let title = collapse_whitespace(&title);
    let title = title.strip_suffix(" - YouTube").unwrap_or(&title).trim();
    if title.eq_ignore_ascii_case("youtube") {
        return String::new();
    }
    title.to_string()
}

fn parse_digits(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Decode backslash escapes from a string lifted out of page JavaScript
pub fn decode_escapes(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| {
        raw.replace("\\n", "\n")
            .replace("\\\"", "\"")
            .replace("\\/", "/")
            .replace("\\\\", "\\")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::ScriptedClient;

    const PAGE: &str = r#"<html><head><title>Learning Rust &amp; Tokio - YouTube</title>
<meta property="og:title" content="Learning Rust">
</head><body><script>var ytInitialPlayerResponse = {"videoDetails":{"videoId":"dQw4w9WgXcQ","title":"Learning Rust","lengthSeconds":"212","shortDescription":"In this video we build a cache.\nWe cover \"eviction\" policies.\nFollow @rustlang and #rust at https://example.com/x","viewCount":"1234567"}};</script></body></html>"#;

    #[test]
    fn test_parse_metadata() {
        let meta = parse_metadata(PAGE, "dQw4w9WgXcQ");
        assert_eq!(meta.title, "Learning Rust & Tokio");
        assert_eq!(
            meta.description,
            "In this video we build a cache.\nWe cover \"eviction\" policies.\nFollow @rustlang and #rust at https://example.com/x"
        );
        assert_eq!(meta.view_count, Some(1_234_567));
        assert_eq!(meta.duration_seconds, Some(212));
        assert!(meta.title_found && meta.description_found);
        assert!(!meta.placeholder);
    }

    #[test]
    fn test_title_only_page_keeps_placeholder_out_of_summary_source() {
        let meta = parse_metadata("<title>Baking Bread at Home - YouTube</title>", "dQw4w9WgXcQ");
        assert_eq!(meta.title, "Baking Bread at Home");
        assert!(meta.title_found);
        assert!(!meta.description_found);
        assert!(!meta.placeholder);
        assert_eq!(meta.description, "Video content for dQw4w9WgXcQ");
        assert_eq!(meta.summary_source(), "Baking Bread at Home.");
    }

    #[test]
    fn test_description_only_page() {
        let html = r#"<title>YouTube</title>"shortDescription":"Knead the dough for ten minutes.""#;
        let meta = parse_metadata(html, "dQw4w9WgXcQ");
        assert!(!meta.title_found);
        assert_eq!(meta.summary_source(), "Knead the dough for ten minutes.");
    }

    #[test]
    fn test_json_title_is_read_from_video_details() {
        let html = r#"<title>YouTube</title><script>var ytInitialData = {"playlist":{"title":"Watch Later"},"endScreen":{"title":"Up next"}};
var ytInitialPlayerResponse = {"videoDetails":{"videoId":"dQw4w9WgXcQ","title":"Laminating Croissant Dough","lengthSeconds":"300"}};</script>"#;
        let meta = parse_metadata(html, "dQw4w9WgXcQ");
        assert_eq!(meta.title, "Laminating Croissant Dough");
    }

    #[test]
    fn test_parse_metadata_alternate_patterns() {
        let html = r#"<title>YouTube</title><meta property="og:title" content="Sourdough Basics">
<meta name="description" content="Flour, water &amp; salt.">
"viewCount":{"simpleText":"98,765 views"},"approxDurationMs":"605000""#;
        let meta = parse_metadata(html, "abcdefghijk");
        assert_eq!(meta.title, "Sourdough Basics");
        assert_eq!(meta.description, "Flour, water & salt.");
        assert_eq!(meta.view_count, Some(98_765));
        assert_eq!(meta.duration_seconds, Some(605));
    }

    #[test]
    fn test_parse_metadata_placeholders() {
        let meta = parse_metadata("<html><body>consent wall</body></html>", "abcdefghijk");
        assert_eq!(meta, VideoMetadata::placeholder("abcdefghijk"));
        assert_eq!(meta.title, "YouTube Video abcdefghijk");
        assert_eq!(meta.description, "Video content for abcdefghijk");
        assert!(meta.placeholder);
        assert!(meta.summary_source().is_empty());
    }

    #[test]
    fn test_decode_escapes() {
        assert_eq!(decode_escapes(r#"line one\nline \"two\" & more"#), "line one\nline \"two\" & more");
        // truncated unicode escape is not valid JSON
        assert_eq!(decode_escapes(r#"a\nb \u00"#), "a\nb \\u00");
    }

    #[test]
    fn test_summary_source() {
        let meta = parse_metadata(PAGE, "dQw4w9WgXcQ");
        assert_eq!(
            meta.summary_source(),
            "Learning Rust & Tokio. In this video we build a cache. We cover \"eviction\" policies. Follow and at."
        );
    }

    #[tokio::test]
    async fn test_fetch_metadata_never_fails() {
        let client = ScriptedClient::new();
        let meta = fetch_metadata(&client, "dQw4w9WgXcQ", Duration::from_secs(1)).await;
        assert_eq!(meta, VideoMetadata::placeholder("dQw4w9WgXcQ"));
    }

    #[tokio::test]
    async fn test_fetch_metadata_reads_page() {
        let client = ScriptedClient::new().route("watch?v=dQw4w9WgXcQ", PAGE);
        let meta = fetch_metadata(&client, "dQw4w9WgXcQ", Duration::from_secs(1)).await;
        assert_eq!(meta.view_count, Some(1_234_567));
    }
}
