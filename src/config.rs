use std::path::PathBuf;
use std::time::Duration;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineOptions;
use crate::summarize::SummaryMethod;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Caption languages in priority order, e.g. `["hi", "en", "auto"]`
    pub languages: Option<Vec<String>>,
    pub summary_sentences: Option<usize>,
    pub summary_method: Option<SummaryMethod>,
    pub keywords: Option<usize>,
    pub numbered: Option<bool>,
    pub request_timeout_secs: Option<u64>,
    pub attempt_timeout_secs: Option<u64>,
    pub page_timeout_secs: Option<u64>,
    /// Keep timed caption segments in the output
    pub include_segments: Option<bool>,
    pub user_agent: Option<String>,
}

impl Config {
    /// Load config from ~/.config/ytdigest/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// Pipeline settings with this file's values laid over the defaults
    pub fn pipeline_options(&self) -> PipelineOptions {
        let mut options = PipelineOptions::default();
        if let Some(languages) = self.languages.as_ref().filter(|l| !l.is_empty()) {
            options.captions.languages = languages.clone();
        }
        if let Some(secs) = self.request_timeout_secs {
            options.captions.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.attempt_timeout_secs {
            options.captions.attempt_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.page_timeout_secs {
            options.page_timeout = Duration::from_secs(secs);
        }
        if let Some(include) = self.include_segments {
            options.captions.include_segments = include;
        }
        if let Some(sentences) = self.summary_sentences {
            options.summary.sentences = sentences;
        }
        if let Some(method) = self.summary_method {
            options.summary.method = method;
        }
        if let Some(keywords) = self.keywords {
            options.summary.keywords = keywords;
        }
        if let Some(numbered) = self.numbered {
            options.summary.numbered = numbered;
        }
        options
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytdigest")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
languages = ["hi", "en", "auto"]
summary_sentences = 8
summary_method = "hybrid"
keywords = 5
request_timeout_secs = 7
include_segments = true
user_agent = "ytdigest-test"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.summary_method, Some(SummaryMethod::Hybrid));
        assert_eq!(config.user_agent.as_deref(), Some("ytdigest-test"));

        let options = config.pipeline_options();
        assert_eq!(options.captions.languages, vec!["hi", "en", "auto"]);
        assert_eq!(options.captions.request_timeout, Duration::from_secs(7));
        assert!(options.captions.include_segments);
        assert_eq!(options.summary.sentences, 8);
        assert_eq!(options.summary.method, SummaryMethod::Hybrid);
        assert_eq!(options.summary.keywords, 5);
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.languages.is_none());
        assert!(config.summary_method.is_none());

        let options = config.pipeline_options();
        assert_eq!(options.summary.sentences, 5);
        assert_eq!(options.captions.languages, vec!["en", "en-US", "en-GB", "auto"]);
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(r#"summary_method = "position""#).unwrap();
        assert_eq!(config.summary_method, Some(SummaryMethod::Position));
        assert!(config.keywords.is_none());
    }

    #[test]
    fn test_invalid_method_rejected() {
        assert!(toml::from_str::<Config>(r#"summary_method = "magic""#).is_err());
    }
}
