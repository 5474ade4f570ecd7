use std::sync::LazyLock;

use log::debug;
use quick_xml::events::BytesStart;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Decoded caption text shorter than this is treated as no captions at all
pub const MIN_CAPTION_CHARS: usize = 20;

static TEXT_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text([^>]*)>(.*?)</text>").expect("valid text element regex"));

static TEXT_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<text[\s>/]").expect("valid text open regex"));

static PARAGRAPH_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<p[\s>]").expect("valid paragraph regex"));

static START_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bstart="([0-9.]+)""#).expect("valid start attribute regex"));

static DUR_ATTR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\bdur="([0-9.]+)""#).expect("valid dur attribute regex"));

static INNER_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// A single captioned segment, times in seconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Caption text as handed to the summarizer
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionText {
    pub text: String,
    pub length: usize,
    pub segments: Vec<Segment>,
}

impl CaptionText {
    /// End of the last segment, or `None` when the payload carried no timing
    pub fn duration_seconds(&self) -> Option<u64> {
        self.segments
            .last()
            .map(|s| s.start + s.duration)
            .filter(|end| *end > 0.0)
            .map(|end| end.round() as u64)
    }
}

#[derive(Debug, Deserialize)]
pub struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    t_start_ms: Option<f64>,
    d_duration_ms: Option<f64>,
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    utf8: Option<String>,
}

/// A caption payload in one of the formats the timedtext service returns
#[derive(Debug)]
pub enum CaptionPayload {
    /// srv1 `<text>` elements or srv3 `<timedtext>` with `<p>` elements
    Xml(String),
    /// json3 `events[].segs[].utf8`
    JsonEvents(Json3),
}

impl CaptionPayload {
    /// Pick the payload format by looking at content markers.
    ///
    /// HTML documents are never captions, whatever they contain: a consent or
    /// bot-check page can come back with a 200 status.
    pub fn sniff(body: &str) -> Option<Self> {
        let body = body.trim_start();
        if body.starts_with('{') && body.contains("\"events\"") {
            return match serde_json::from_str::<Json3>(body) {
                Ok(json) => Some(CaptionPayload::JsonEvents(json)),
                Err(e) => {
                    debug!("Caption body looked like json3 but did not parse: {e}");
                    None
                }
            };
        }
        if is_html_document(body) {
            debug!("Caption body is an HTML document, ignoring");
            return None;
        }
        if TEXT_OPEN.is_match(body) || (body.contains("<timedtext") && PARAGRAPH_OPEN.is_match(body)) {
            return Some(CaptionPayload::Xml(body.to_string()));
        }
        None
    }

    /// Decoded segments in document order, empty ones dropped
    pub fn segments(&self) -> Vec<Segment> {
        match self {
            CaptionPayload::Xml(xml) => xml_segments(xml).unwrap_or_else(|e| {
                debug!("Caption XML did not parse ({e}), falling back to regex extraction");
                regex_segments(xml)
            }),
            CaptionPayload::JsonEvents(json) => json
                .events
                .iter()
                .filter_map(|event| {
                    let raw: String = event.segs.as_ref()?.iter().filter_map(|s| s.utf8.as_deref()).collect();
                    let text = collapse_whitespace(&html_escape::decode_html_entities(&raw));
                    (!text.is_empty()).then(|| Segment {
                        text,
                        start: event.t_start_ms.unwrap_or_default() / 1000.0,
                        duration: event.d_duration_ms.unwrap_or_default() / 1000.0,
                    })
                })
                .collect(),
        }
    }
}

/// Decode a caption body into text, or `None` when nothing usable is in it
pub fn decode_caption_body(body: &str) -> Option<CaptionText> {
    let segments = CaptionPayload::sniff(body)?.segments();
    let joined = segments.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ");
    let text = collapse_whitespace(&joined);
    let length = text.chars().count();
    if length < MIN_CAPTION_CHARS {
        debug!("Caption text too short ({length} chars)");
        return None;
    }
    Some(CaptionText { text, length, segments })
}

/// Decode HTML/XML character references.
///
/// Timedtext XML escapes the already-escaped caption text, so two passes are
/// made. Text without references comes back unchanged, but a literal
/// reference that survived one decode (`&amp;lt;` read as text) is decoded
/// again, so this is not a no-op on arbitrary decoded text.
pub fn decode_entities(text: &str) -> String {
    let once = html_escape::decode_html_entities(text);
    html_escape::decode_html_entities(&once).into_owned()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_html_document(body: &str) -> bool {
    let head: String = body.chars().take(16).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

fn is_segment_element(name: &[u8]) -> bool {
    name == b"text" || name == b"p"
}

/// Start and duration in seconds. srv1 `<text>` uses `start`/`dur` in
/// seconds, srv3 `<p>` uses `t`/`d` in milliseconds.
fn segment_timing(e: &BytesStart<'_>) -> (f64, f64) {
    let millis = e.name().as_ref() == b"p";
    let (start_key, dur_key): (&[u8], &[u8]) = if millis { (b"t", b"d") } else { (b"start", b"dur") };
    let mut start = 0.0;
    let mut duration = 0.0;
    for attr in e.attributes().flatten() {
        let Ok(value) = String::from_utf8_lossy(&attr.value).parse::<f64>() else {
            continue;
        };
        if attr.key.as_ref() == start_key {
            start = value;
        } else if attr.key.as_ref() == dur_key {
            duration = value;
        }
    }
    if millis {
        (start / 1000.0, duration / 1000.0)
    } else {
        (start, duration)
    }
}

fn xml_segments(xml: &str) -> Result<Vec<Segment>, quick_xml::Error> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut timing = (0.0, 0.0);
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) if is_segment_element(e.name().as_ref()) => {
                if depth == 0 {
                    current.clear();
                    timing = segment_timing(e);
                }
                depth += 1;
            }
            Event::End(ref e) if is_segment_element(e.name().as_ref()) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let text = collapse_whitespace(&decode_entities(&current));
                    current.clear();
                    if !text.is_empty() {
                        segments.push(Segment {
                            text,
                            start: timing.0,
                            duration: timing.1,
                        });
                    }
                }
            }
            Event::Text(e) if depth > 0 => {
                current.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::CData(e) if depth > 0 => {
                current.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(segments)
}

fn attr_seconds(re: &Regex, attrs: &str) -> f64 {
    re.captures(attrs)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .unwrap_or_default()
}

fn regex_segments(xml: &str) -> Vec<Segment> {
    TEXT_ELEMENT
        .captures_iter(xml)
        .filter_map(|caps| {
            let text = collapse_whitespace(&decode_entities(&INNER_TAG.replace_all(&caps[2], "")));
            (!text.is_empty()).then(|| Segment {
                text,
                start: attr_seconds(&START_ATTR, &caps[1]),
                duration: attr_seconds(&DUR_ATTR, &caps[1]),
            })
        })
        .collect()
}
