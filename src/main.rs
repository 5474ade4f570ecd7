use std::io::{self, BufRead};
use std::path::PathBuf;

use eyre::{Result, bail};
use log::{debug, info};

mod cli;

use cli::{Cli, OutputFormat};
use ytdigest::http::WebClient;
use ytdigest::{Pipeline, ProcessingResult};

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytdigest.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytdigest")
        .join("logs")
}

fn build_after_help() -> String {
    let log_path = log_dir().join("ytdigest.log");
    let config_path = ytdigest::config::config_path();
    let config_state = if config_path.exists() { "" } else { " (not present)" };

    format!(
        "\nConfig is read from: {}{config_state}\nLogs are written to: {}",
        config_path.display(),
        log_path.display()
    )
}

fn render(result: &ProcessingResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(ytdigest::output::render_text(result)),
        OutputFormat::Json => ytdigest::output::render_json(result),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let config = ytdigest::config::Config::load().unwrap_or_default();

    // CLI flags take priority over config values
    let mut options = config.pipeline_options();
    if !cli.lang.is_empty() {
        options.captions.languages = cli.lang.clone();
    }
    if let Some(sentences) = cli.sentences {
        options.summary.sentences = sentences;
    }
    if let Some(method) = cli.method {
        options.summary.method = method;
    }
    if cli.numbered {
        options.summary.numbered = true;
    }
    if cli.segments {
        options.captions.include_segments = true;
    }
    debug!("Pipeline options: {options:?}");

    if cli.verbose {
        let config_path = ytdigest::config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
        eprintln!(
            "Languages: {}  Method: {}  Sentences: {}",
            options.captions.languages.join(","),
            options.summary.method,
            options.summary.sentences
        );
    }

    let client = WebClient::new(config.user_agent.as_deref())?;
    let pipeline = Pipeline::new(client, options);

    // Collect URLs: from arg or stdin
    let urls = if let Some(ref url) = cli.url {
        vec![url.clone()]
    } else {
        let stdin = io::stdin();
        stdin.lock().lines().collect::<Result<Vec<_>, _>>()?
    };
    let urls: Vec<&str> = urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty()).collect();

    if urls.is_empty() {
        bail!("no URL or video ID provided\n\nUsage: ytdigest <URL>\n       echo <URL> | ytdigest");
    }

    let mut rendered = Vec::with_capacity(urls.len());
    let mut failures = 0;
    for url in urls {
        if cli.verbose {
            eprintln!("Processing: {url}");
        }
        let result = pipeline.process(url).await;
        if !result.success {
            failures += 1;
        }
        if cli.verbose {
            if let Some(ref transcript) = result.transcript {
                eprintln!("Source: {}", transcript.source);
            }
        }
        rendered.push(render(&result, cli.format)?);
    }

    let separator = match cli.format {
        OutputFormat::Text => "\n\n",
        OutputFormat::Json => "\n",
    };
    let output = rendered.join(separator);

    if let Some(ref path) = cli.output {
        std::fs::write(path, format!("{output}\n"))?;
        if cli.verbose {
            eprintln!("Output written to: {}", path.display());
        }
    } else {
        println!("{output}");
    }

    if failures > 0 {
        bail!("{failures} input(s) could not be processed");
    }
    Ok(())
}
