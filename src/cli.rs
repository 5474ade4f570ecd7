use clap::Parser;
use std::path::PathBuf;

use ytdigest::SummaryMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "ytdigest",
    about = "YouTube caption fetcher and extractive summarizer",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// YouTube video URL or video ID (reads from stdin if omitted)
    pub url: Option<String>,

    /// Number of sentences in the summary
    #[arg(short = 'n', long)]
    pub sentences: Option<usize>,

    /// Sentence selection: frequency, position, hybrid
    #[arg(short, long)]
    pub method: Option<SummaryMethod>,

    /// Caption language in priority order (repeatable, `auto` for generated tracks)
    #[arg(short, long)]
    pub lang: Vec<String>,

    /// Output format: text (default), json
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number the summary sentences
    #[arg(long)]
    pub numbered: bool,

    /// Include timed caption segments in the output
    #[arg(long)]
    pub segments: bool,

    /// Show config and per-video progress on stderr
    #[arg(short, long)]
    pub verbose: bool,
}
