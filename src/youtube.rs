use std::sync::LazyLock;
use std::time::Duration;

use eyre::{Result, bail, eyre};
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::captions::{CaptionText, decode_caption_body};
use crate::fallback::FallbackChain;
use crate::http::HttpClient;
use crate::{Error, TranscriptResult};

pub const WATCH_URL: &str = "https://www.youtube.com/watch";
const TIMEDTEXT_URL: &str = "https://www.youtube.com/api/timedtext";
const INNERTUBE_PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";

static PLAYER_RESPONSE_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"var\s+ytInitialPlayerResponse\s*=\s*").expect("valid player response regex")
});

static PLAYER_RESPONSE_WINDOW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"window\[["']ytInitialPlayerResponse["']\]\s*=\s*"#).expect("valid window player response regex")
});

static CAPTION_TRACKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""captionTracks"\s*:\s*"#).expect("valid caption tracks regex"));

static LOOSE_BASE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""baseUrl"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("valid base url regex"));

static LOOSE_LANGUAGE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""languageCode"\s*:\s*"([^"]+)""#).expect("valid language code regex"));

static LOOSE_KIND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""kind"\s*:\s*"([^"]+)""#).expect("valid kind regex"));

static API_KEY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#, r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#]
        .iter()
        .map(|p| Regex::new(p).expect("valid api key regex"))
        .collect()
});

/// Whether a track was authored or machine transcribed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Manual,
    Auto,
}

/// A caption stream advertised by the watch page. `base_url` is unescaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub language_code: String,
    pub kind: TrackKind,
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<RawTrack>>,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    #[serde(rename = "baseUrl")]
    base_url: Option<String>,
    #[serde(rename = "languageCode", default)]
    language_code: String,
    kind: Option<String>,
}

impl RawTrack {
    fn into_track(self) -> Option<CaptionTrack> {
        let base_url = unescape_url(&self.base_url?);
        if base_url.is_empty() {
            return None;
        }
        let kind = match self.kind.as_deref() {
            Some("asr") => TrackKind::Auto,
            _ => TrackKind::Manual,
        };
        Some(CaptionTrack {
            language_code: self.language_code,
            kind,
            base_url,
        })
    }
}

impl PlayerResponse {
    fn into_tracks(self) -> Vec<CaptionTrack> {
        self.captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .and_then(|r| r.caption_tracks)
            .unwrap_or_default()
            .into_iter()
            .filter_map(RawTrack::into_track)
            .collect()
    }
}

/// Settings for one caption lookup
#[derive(Debug, Clone)]
pub struct CaptionOptions {
    /// Language codes in priority order; `auto` stands for any auto-generated track
    pub languages: Vec<String>,
    pub request_timeout: Duration,
    pub attempt_timeout: Duration,
    /// Keep timed segments on the transcript
    pub include_segments: bool,
}

impl Default for CaptionOptions {
    fn default() -> Self {
        Self {
            languages: ["en", "en-US", "en-GB", "auto"].iter().map(|s| s.to_string()).collect(),
            request_timeout: Duration::from_secs(10),
            attempt_timeout: Duration::from_secs(15),
            include_segments: false,
        }
    }
}

/// A guessed timedtext URL for when the page does not reveal any tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedtextEndpoint {
    pub url: String,
    pub lang: String,
    pub fmt: Option<&'static str>,
}

impl TimedtextEndpoint {
    fn new(video_id: &str, lang: &str, fmt: Option<&'static str>) -> Self {
        let mut url = format!("{TIMEDTEXT_URL}?lang={lang}&v={video_id}");
        if let Some(fmt) = fmt {
            url.push_str("&fmt=");
            url.push_str(fmt);
        }
        Self {
            url,
            lang: lang.to_string(),
            fmt,
        }
    }

    pub fn label(&self) -> String {
        match self.fmt {
            Some(fmt) => format!("timedtext lang={} fmt={fmt}", self.lang),
            None => format!("timedtext lang={}", self.lang),
        }
    }
}

struct FetchedCaptions {
    caption: CaptionText,
    language: String,
}

pub fn watch_url(video_id: &str) -> String {
    format!("{WATCH_URL}?v={video_id}")
}

/// Fetch the watch page HTML
pub async fn fetch_watch_page(client: &dyn HttpClient, video_id: &str, timeout: Duration) -> Result<String> {
    let url = watch_url(video_id);
    debug!("Fetching watch page: {url}");
    client.get_text(&url, timeout).await
}

/// Find and decode captions for a video, trying each known route in turn.
///
/// Routes: InnerTube player API, tracks embedded in the watch page, then
/// guessed timedtext endpoints. Exhausting all of them is not an error; the
/// result is simply marked unavailable.
pub async fn locate_transcript(
    client: &dyn HttpClient,
    video_id: &str,
    page: Option<&str>,
    options: &CaptionOptions,
) -> TranscriptResult {
    let timeout = options.request_timeout;
    let languages = options.languages.as_slice();
    let mut chain: FallbackChain<'_, FetchedCaptions> = FallbackChain::new(options.attempt_timeout);

    if let Some(html) = page {
        chain.push("innertube player", move || async move {
            let tracks = innertube_tracks(client, video_id, html, languages, timeout).await?;
            fetch_preferred(client, &tracks, languages, timeout).await
        });
        chain.push("embedded caption tracks", move || async move {
            let tracks = extract_caption_tracks(html).ok_or_else(|| eyre!("no caption tracks embedded in watch page"))?;
            fetch_preferred(client, &tracks, languages, timeout).await
        });
    }

    for endpoint in timedtext_endpoints(video_id, languages) {
        chain.push(endpoint.label(), move || async move {
            let body = client.get_text(&endpoint.url, timeout).await?;
            let caption = decode_caption_body(&body).ok_or_else(|| eyre!("empty or unrecognized caption payload"))?;
            Ok(FetchedCaptions {
                caption,
                language: endpoint.lang,
            })
        });
    }

    match chain.run().await {
        Some(success) => {
            let fetched = success.value;
            info!(
                "Captions for {video_id} via {} ({}): {} chars",
                success.attempt, fetched.language, fetched.caption.length
            );
            let source = format!("{} ({})", success.attempt, fetched.language);
            TranscriptResult::from_captions(fetched.caption, source, options.include_segments)
        }
        None => {
            warn!("{}", Error::NoCaptionsAvailable(video_id.to_string()));
            TranscriptResult::unavailable()
        }
    }
}

async fn fetch_preferred(
    client: &dyn HttpClient,
    tracks: &[CaptionTrack],
    languages: &[String],
    timeout: Duration,
) -> Result<FetchedCaptions> {
    let track = select_track(tracks, languages).ok_or_else(|| eyre!("caption track list is empty"))?;
    debug!("Using caption track: lang={} kind={:?}", track.language_code, track.kind);

    let body = client.get_text(&track.base_url, timeout).await?;
    let caption = decode_caption_body(&body).ok_or_else(|| eyre!("empty or unrecognized caption payload"))?;
    Ok(FetchedCaptions {
        caption,
        language: track.language_code.clone(),
    })
}

async fn innertube_tracks(
    client: &dyn HttpClient,
    video_id: &str,
    html: &str,
    languages: &[String],
    timeout: Duration,
) -> Result<Vec<CaptionTrack>> {
    let api_key = extract_api_key(html)?;
    debug!("Extracted InnerTube API key: {api_key}");

    let hl = languages
        .iter()
        .find(|l| !l.eq_ignore_ascii_case("auto"))
        .map(String::as_str)
        .unwrap_or("en");

    let body = serde_json::json!({
        "context": {
            "client": {
                "hl": hl,
                "gl": "US",
                "clientName": "WEB",
                "clientVersion": "2.20241126.01.00"
            }
        },
        "videoId": video_id
    });

    let url = format!("{INNERTUBE_PLAYER_URL}?key={api_key}&prettyPrint=false");
    let raw = client.post_json(&url, &body, timeout).await?;
    let tracks = serde_json::from_str::<PlayerResponse>(&raw)?.into_tracks();
    if tracks.is_empty() {
        bail!("player response lists no caption tracks for {video_id}");
    }
    Ok(tracks)
}

fn extract_api_key(html: &str) -> Result<String> {
    API_KEY_PATTERNS
        .iter()
        .find_map(|re| re.captures(html).map(|caps| caps[1].to_string()))
        .ok_or_else(|| eyre!("could not extract InnerTube API key from watch page"))
}

type TrackStrategy = fn(&str) -> Option<Vec<CaptionTrack>>;

const TRACK_STRATEGIES: &[(&str, TrackStrategy)] = &[
    ("var ytInitialPlayerResponse", tracks_from_player_var),
    ("window ytInitialPlayerResponse", tracks_from_player_window),
    ("captionTracks array", tracks_from_caption_array),
    ("loose baseUrl scan", tracks_from_loose_scan),
];

/// Pull the caption track list out of watch page HTML.
///
/// The embedding changes over time, so several extractions are tried in
/// order and the first one that yields tracks wins.
pub fn extract_caption_tracks(html: &str) -> Option<Vec<CaptionTrack>> {
    TRACK_STRATEGIES.iter().find_map(|(name, strategy)| {
        let tracks = strategy(html).filter(|t| !t.is_empty())?;
        debug!("Found {} caption tracks via {name}", tracks.len());
        Some(tracks)
    })
}

/// Deserialize the first JSON value that follows a marker
fn json_after<T: serde::de::DeserializeOwned>(html: &str, marker: &Regex) -> Option<T> {
    let start = marker.find(html)?.end();
    serde_json::Deserializer::from_str(&html[start..])
        .into_iter::<T>()
        .next()?
        .ok()
}

fn tracks_from_player_var(html: &str) -> Option<Vec<CaptionTrack>> {
    json_after::<PlayerResponse>(html, &PLAYER_RESPONSE_VAR).map(PlayerResponse::into_tracks)
}

fn tracks_from_player_window(html: &str) -> Option<Vec<CaptionTrack>> {
    json_after::<PlayerResponse>(html, &PLAYER_RESPONSE_WINDOW).map(PlayerResponse::into_tracks)
}

fn tracks_from_caption_array(html: &str) -> Option<Vec<CaptionTrack>> {
    let raw = json_after::<Vec<RawTrack>>(html, &CAPTION_TRACKS)?;
    Some(raw.into_iter().filter_map(RawTrack::into_track).collect())
}

/// Scan for `"baseUrl"` strings without parsing the surrounding JSON, for
/// pages where the embedding is truncated
fn tracks_from_loose_scan(html: &str) -> Option<Vec<CaptionTrack>> {
    let matches: Vec<_> = LOOSE_BASE_URL.captures_iter(html).collect();
    let tracks: Vec<CaptionTrack> = matches
        .iter()
        .enumerate()
        .filter_map(|(i, caps)| {
            let raw_url = caps.get(1)?.as_str();
            if !raw_url.contains("timedtext") {
                return None;
            }
            let tail_start = caps.get(0)?.end();
            let next_start = matches
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(html.len());
            let tail = &html[tail_start..next_start];
            let tail = tail.find("}]").map(|end| &tail[..end]).unwrap_or(tail);

            let language_code = LOOSE_LANGUAGE_CODE
                .captures(tail)
                .map(|c| c[1].to_string())
                .unwrap_or_default();
            let kind = match LOOSE_KIND.captures(tail) {
                Some(c) if &c[1] == "asr" => TrackKind::Auto,
                _ => TrackKind::Manual,
            };
            Some(CaptionTrack {
                language_code,
                kind,
                base_url: unescape_url(&decode_json_string(raw_url)),
            })
        })
        .collect();
    Some(tracks)
}

fn decode_json_string(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string())
}

/// Undo the escaping a caption URL picks up inside page scripts
pub fn unescape_url(url: &str) -> String {
    url.replace("\\u0026", "&")
        .replace("\\/", "/")
        .replace("&amp;", "&")
}

/// Choose the track to fetch.
///
/// Order: the first preferred language with a matching track (`auto` matches
/// any auto-generated track), then any manual track, then the first
/// auto-generated track, then whatever comes first.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    languages
        .iter()
        .find_map(|lang| {
            if lang.eq_ignore_ascii_case("auto") {
                tracks.iter().find(|t| t.kind == TrackKind::Auto)
            } else {
                tracks.iter().find(|t| t.language_code.eq_ignore_ascii_case(lang))
            }
        })
        .or_else(|| tracks.iter().find(|t| t.kind == TrackKind::Manual))
        .or_else(|| tracks.iter().find(|t| t.kind == TrackKind::Auto))
        .or_else(|| tracks.first())
}

/// Direct timedtext URLs to try, in order
pub fn timedtext_endpoints(video_id: &str, languages: &[String]) -> Vec<TimedtextEndpoint> {
    let mut langs: Vec<&str> = languages
        .iter()
        .map(String::as_str)
        .filter(|l| !l.eq_ignore_ascii_case("auto"))
        .collect();
    if langs.is_empty() {
        langs.push("en");
    }

    let mut endpoints = Vec::with_capacity(langs.len() * 2 + 1);
    for lang in &langs {
        endpoints.push(TimedtextEndpoint::new(video_id, lang, None));
        endpoints.push(TimedtextEndpoint::new(video_id, lang, Some("json3")));
    }
    endpoints.push(TimedtextEndpoint::new(video_id, langs[0], Some("srv3")));
    endpoints
}
