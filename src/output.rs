use std::fmt::Write;

use eyre::Result;

use crate::ProcessingResult;

/// Render a result as a human-readable report
pub fn render_text(result: &ProcessingResult) -> String {
    let mut out = String::new();

    if !result.success {
        let error = result.error.as_deref().unwrap_or("unknown error");
        let _ = writeln!(out, "Error: {error}");
        let _ = write!(out, "Input: {}", result.video_url);
        return out;
    }

    if let Some(ref video) = result.video {
        let _ = writeln!(out, "Video: {} ({})", video.video_id, video.watch_url());
    }

    if let Some(ref metadata) = result.metadata {
        let _ = writeln!(out, "Title: {}", metadata.title);
        let duration = metadata
            .duration_seconds
            .map(format_duration)
            .unwrap_or_else(|| "Unknown".to_string());
        let views = metadata
            .view_count
            .map(format_count)
            .unwrap_or_else(|| "Unknown".to_string());
        let _ = writeln!(out, "Duration: {duration}  Views: {views}");
    }

    if let Some(ref transcript) = result.transcript {
        if transcript.available {
            let _ = writeln!(
                out,
                "Transcript: {} words ({} characters) via {}",
                transcript.word_count, transcript.length, transcript.source
            );
        } else {
            let _ = writeln!(out, "Transcript: not available, summarized page metadata");
        }
    }

    if let Some(ref summary) = result.summary {
        let _ = writeln!(
            out,
            "\nSummary ({}, confidence {}%, {:.1}% compression):",
            summary.method, summary.confidence, summary.compression_ratio
        );
        let _ = writeln!(out, "{}", summary.text);

        if !summary.keywords.is_empty() {
            let keywords = summary
                .keywords
                .iter()
                .map(|k| format!("{} ({})", k.word, k.frequency))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "\nKeywords: {keywords}");
        }
    }

    if let Some(segments) = result.transcript.as_ref().and_then(|t| t.segments.as_ref()) {
        let _ = writeln!(out, "\nSegments:");
        for segment in segments {
            let _ = writeln!(out, "[{}] {}", format_duration(segment.start as u64), segment.text);
        }
    }

    out.trim_end().to_string()
}

/// Render a result as pretty-printed JSON
pub fn render_json(result: &ProcessingResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// `H:MM:SS`, or `M:SS` under an hour
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Thousands-separated count
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarize::{Keyword, SummaryMethod, SummaryResult};
    use crate::{Error, Segment, TranscriptResult, VideoMetadata, VideoRef};

    fn sample_result() -> ProcessingResult {
        let video = VideoRef::parse("https://youtu.be/dQw4w9WgXcQ").unwrap();
        let transcript = TranscriptResult {
            available: true,
            text: "Hello world. This is content.".to_string(),
            length: 29,
            word_count: 5,
            source: "timedtext lang=en (en)".to_string(),
            duration_seconds: Some(4),
            segments: None,
        };
        let metadata = VideoMetadata {
            title: "Test Video".to_string(),
            description: "A test".to_string(),
            duration_seconds: Some(3725),
            view_count: Some(1_234_567),
            title_found: true,
            description_found: true,
            placeholder: false,
        };
        let summary = SummaryResult {
            text: "Hello world.".to_string(),
            confidence: 41,
            method: SummaryMethod::Frequency,
            keywords: vec![Keyword {
                word: "hello".to_string(),
                frequency: 1,
            }],
            sentence_count: 1,
            compression_ratio: 58.6,
            degenerate: false,
        };
        ProcessingResult::completed(video, transcript, Some(metadata), summary)
    }

    #[test]
    fn test_render_text() {
        let output = render_text(&sample_result());
        assert_eq!(
            output,
            "Video: dQw4w9WgXcQ (https://www.youtube.com/watch?v=dQw4w9WgXcQ)\n\
             Title: Test Video\n\
             Duration: 1:02:05  Views: 1,234,567\n\
             Transcript: 5 words (29 characters) via timedtext lang=en (en)\n\
             \n\
             Summary (frequency, confidence 41%, 58.6% compression):\n\
             Hello world.\n\
             \n\
             Keywords: hello (1)"
        );
    }

    #[test]
    fn test_render_text_with_segments() {
        let mut result = sample_result();
        result.transcript.as_mut().unwrap().segments = Some(vec![
            Segment {
                text: "Hello world.".to_string(),
                start: 0.4,
                duration: 2.0,
            },
            Segment {
                text: "This is content.".to_string(),
                start: 75.9,
                duration: 1.5,
            },
        ]);
        let output = render_text(&result);
        assert!(output.ends_with("Keywords: hello (1)\n\nSegments:\n[0:00] Hello world.\n[1:15] This is content."));
    }

    #[test]
    fn test_render_text_failure() {
        let result = ProcessingResult::failure("bogus", &Error::InvalidUrl("bogus".to_string()));
        assert_eq!(render_text(&result), "Error: invalid YouTube URL: bogus\nInput: bogus");
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&sample_result()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["confidence"], 41);
        assert_eq!(value["metadata"]["viewCount"], 1_234_567);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(212), "3:32");
        assert_eq!(format_duration(3725), "1:02:05");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }
}
