use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::captions::collapse_whitespace;

/// Inputs shorter than this get the placeholder summary
pub const MIN_INPUT_CHARS: usize = 40;

/// Sentences shorter than this are not summary candidates
pub const MIN_SENTENCE_CHARS: usize = 10;

pub const MAX_EXTRACTIVE_CONFIDENCE: u8 = 95;

pub const TOO_SHORT_SUMMARY: &str = "Transcript too short to summarize effectively.";
pub const NO_CONTENT_SUMMARY: &str = "No usable content found for a summary after filtering promotional material.";
const FILLER_LINE: &str = "Additional relevant content is covered in the video.";

const TERMINATORS: [char; 5] = ['.', '!', '?', '।', '॥'];

static SENTENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^.!?।॥]+[.!?।॥]*").expect("valid sentence regex"));

/// Promotional and boilerplate phrases; a sentence containing any of them is dropped
const DENYLIST: &[&str] = &[
    "subscribe",
    "like this video",
    "hit the like",
    "smash that like",
    "ring the bell",
    "notification bell",
    "follow us",
    "follow me",
    "instagram",
    "facebook",
    "twitter",
    "tiktok",
    "linkedin",
    "snapchat",
    "patreon",
    "contact us",
    "reach out",
    "get in touch",
    "email us",
    "whatsapp",
    "call us",
    "phone number",
    "visit our",
    "check out our",
    "link in description",
    "link in the description",
    "description below",
    "links below",
    "sponsor",
    "affiliate",
    "promo code",
    "discount code",
    "coupon",
    "shop now",
    "merch",
    "limited time",
    "click here",
    "comment below",
    "share this video",
    "thanks for watching",
    "see you next time",
    "until next time",
    "www.",
    "http",
    "@",
];

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is", "are", "was",
    "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will", "would", "could", "should",
    "may", "might", "must", "can", "this", "that", "these", "those", "i", "you", "he", "she", "it", "we", "they",
    "me", "him", "her", "us", "them", "my", "your", "his", "its", "our", "their", "so", "if", "then", "than", "as",
    "very", "just", "now", "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few",
    "more", "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "too", "also", "like",
    "yeah", "oh", "um", "uh", "what", "which", "who", "from", "into", "about", "out", "going", "gonna",
];

/// Sentence selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMethod {
    /// Sentences whose words are most frequent across the text
    #[default]
    Frequency,
    /// Opening and closing sentences
    Position,
    /// Mostly frequency, topped up with position
    Hybrid,
}

impl fmt::Display for SummaryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryMethod::Frequency => write!(f, "frequency"),
            SummaryMethod::Position => write!(f, "position"),
            SummaryMethod::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl FromStr for SummaryMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frequency" => Ok(SummaryMethod::Frequency),
            "position" => Ok(SummaryMethod::Position),
            "hybrid" => Ok(SummaryMethod::Hybrid),
            other => Err(format!("unknown summary method '{other}' (expected frequency, position or hybrid)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SummaryOptions {
    pub sentences: usize,
    pub method: SummaryMethod,
    pub keywords: usize,
    /// Render as numbered lines, padded with a filler line up to `sentences`
    pub numbered: bool,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            sentences: 5,
            method: SummaryMethod::Frequency,
            keywords: 10,
            numbered: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keyword {
    pub word: String,
    pub frequency: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    pub text: String,
    /// 0..=100, see `summarize`
    pub confidence: u8,
    pub method: SummaryMethod,
    pub keywords: Vec<Keyword>,
    pub sentence_count: usize,
    /// Percentage of the input removed
    pub compression_ratio: f64,
    /// Set when the input was too thin to run extraction
    pub degenerate: bool,
}

impl SummaryResult {
    pub fn degenerate(method: SummaryMethod, text: &str) -> Self {
        Self {
            text: text.to_string(),
            confidence: 0,
            method,
            keywords: Vec::new(),
            sentence_count: 0,
            compression_ratio: 0.0,
            degenerate: true,
        }
    }
}

/// Word counts over the candidate sentences, remembering first appearance
struct FrequencyTable {
    counts: HashMap<String, usize>,
    order: Vec<String>,
}

impl FrequencyTable {
    fn build(sentences: &[String]) -> Self {
        let mut counts = HashMap::new();
        let mut order = Vec::new();
        for word in sentences.iter().flat_map(|s| tokens(s)).filter(|w| is_keyword(w)) {
            let count = counts.entry(word.clone()).or_insert(0);
            if *count == 0 {
                order.push(word);
            }
            *count += 1;
        }
        Self { counts, order }
    }

    fn count(&self, word: &str) -> usize {
        self.counts.get(word).copied().unwrap_or(0)
    }

    /// Mean frequency of the sentence's words; stop words count as zero
    fn score(&self, sentence: &str) -> f64 {
        let words: Vec<String> = tokens(sentence).collect();
        if words.is_empty() {
            return 0.0;
        }
        let total: usize = words.iter().map(|w| self.count(w)).sum();
        total as f64 / words.len() as f64
    }

    fn top(&self, limit: usize) -> Vec<Keyword> {
        let mut ranked: Vec<Keyword> = self
            .order
            .iter()
            .map(|word| Keyword {
                word: word.clone(),
                frequency: self.count(word),
            })
            .collect();
        // stable sort keeps first appearance order among equal counts
        ranked.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        ranked.truncate(limit);
        ranked
    }
}

fn is_word_edge(c: char) -> bool {
    c.is_ascii_punctuation() || TERMINATORS.contains(&c) || matches!(c, '“' | '”' | '‘' | '’' | '…' | '«' | '»')
}

fn tokens(sentence: &str) -> impl Iterator<Item = String> + '_ {
    sentence
        .split_whitespace()
        .map(|w| w.trim_matches(is_word_edge).to_lowercase())
        .filter(|w| !w.is_empty())
}

fn is_keyword(word: &str) -> bool {
    word.chars().count() > 2 && !STOP_WORDS.contains(&word)
}

/// Split text into sentences, keeping each sentence's terminator
pub fn split_sentences(text: &str) -> Vec<String> {
    SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.trim_end_matches(TERMINATORS).trim().is_empty())
        .collect()
}

pub fn is_promotional(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    DENYLIST.iter().any(|phrase| lower.contains(phrase))
}

/// Sentences long enough to carry content and free of promotional phrases
pub fn candidate_sentences(text: &str) -> Vec<String> {
    split_sentences(text)
        .into_iter()
        .filter(|s| s.trim_end_matches(TERMINATORS).trim().chars().count() >= MIN_SENTENCE_CHARS)
        .filter(|s| !is_promotional(s))
        .collect()
}

fn frequency_picks(sentences: &[String], table: &FrequencyTable, count: usize) -> Vec<usize> {
    let mut scored: Vec<(usize, f64)> = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| (i, table.score(s)))
        .collect();
    // stable sort: equal scores keep source order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.into_iter().take(count).map(|(i, _)| i).collect()
}

fn position_picks(len: usize, count: usize) -> Vec<usize> {
    let count = count.min(len);
    let head = (count * 6).div_ceil(10);
    let tail = count - head;
    (0..head).chain(len - tail..len).collect()
}

fn hybrid_picks(sentences: &[String], table: &FrequencyTable, count: usize) -> Vec<usize> {
    let by_frequency = (count * 7).div_ceil(10);
    let by_position = count * 3 / 10;

    let mut picks = frequency_picks(sentences, table, by_frequency);
    let remaining: Vec<usize> = (0..sentences.len()).filter(|i| !picks.contains(i)).collect();
    picks.extend(
        position_picks(remaining.len(), by_position)
            .into_iter()
            .map(|i| remaining[i]),
    );
    picks
}

fn capitalize(sentence: &str) -> String {
    let mut chars = sentence.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn render(selected: &[&str], options: &SummaryOptions) -> String {
    if !options.numbered {
        return selected.join(" ");
    }
    let target = selected.len().max(options.sentences);
    (0..target)
        .map(|i| {
            let line = selected.get(i).map(|s| capitalize(s)).unwrap_or_else(|| FILLER_LINE.to_string());
            format!("{}. {line}", i + 1)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reduce text to at most `options.sentences` of its own sentences.
///
/// When every candidate sentence fits, the cleaned text is returned with
/// confidence 100. Otherwise confidence is the share of the text kept,
/// capped at 95. Text under `MIN_INPUT_CHARS`, or with no candidate
/// sentences, yields a fixed placeholder with confidence 0.
pub fn summarize(text: &str, options: &SummaryOptions) -> SummaryResult {
    let clean = collapse_whitespace(text);
    let clean_len = clean.chars().count();
    if clean_len < MIN_INPUT_CHARS {
        return SummaryResult::degenerate(options.method, TOO_SHORT_SUMMARY);
    }

    let sentences = candidate_sentences(&clean);
    if sentences.is_empty() {
        return SummaryResult::degenerate(options.method, NO_CONTENT_SUMMARY);
    }

    let table = FrequencyTable::build(&sentences);
    let keywords = table.top(options.keywords);
    let limit = options.sentences.max(1);

    let picks: Vec<usize> = if sentences.len() <= limit {
        (0..sentences.len()).collect()
    } else {
        match options.method {
            SummaryMethod::Frequency => frequency_picks(&sentences, &table, limit),
            SummaryMethod::Position => position_picks(sentences.len(), limit),
            SummaryMethod::Hybrid => hybrid_picks(&sentences, &table, limit),
        }
    };
    let selected: Vec<&str> = picks.iter().map(|&i| sentences[i].as_str()).collect();
    let summary = render(&selected, options);
    let summary_len = summary.chars().count();

    let confidence = if sentences.len() <= limit {
        100
    } else {
        let kept = (summary_len as f64 * 100.0 / clean_len as f64).round();
        kept.min(MAX_EXTRACTIVE_CONFIDENCE as f64) as u8
    };
    let compression_ratio = ((1.0 - summary_len as f64 / clean_len as f64) * 1000.0).round() / 10.0;

    SummaryResult {
        text: summary,
        confidence,
        method: options.method,
        keywords,
        sentence_count: selected.len(),
        compression_ratio: compression_ratio.max(0.0),
        degenerate: false,
    }
}
