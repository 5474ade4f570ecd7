use std::time::Duration;

use async_trait::async_trait;
use eyre::{Result, bail};
use log::debug;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Outbound HTTP used by the pipeline. Every call carries its own timeout.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String>;

    async fn post_json(&self, url: &str, body: &serde_json::Value, timeout: Duration) -> Result<String>;
}

/// `HttpClient` backed by reqwest, identifying as a desktop browser
#[derive(Debug, Clone)]
pub struct WebClient {
    client: reqwest::Client,
    user_agent: String,
}

impl WebClient {
    pub fn new(user_agent: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            user_agent: user_agent.unwrap_or(DEFAULT_USER_AGENT).to_string(),
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder, timeout: Duration) -> reqwest::RequestBuilder {
        builder
            .timeout(timeout)
            .header("User-Agent", &self.user_agent)
            .header("Accept-Language", "en-US,en;q=0.9,hi;q=0.8")
            .header("Referer", "https://www.youtube.com/")
    }
}

#[async_trait]
impl HttpClient for WebClient {
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String> {
        debug!("GET {url} (timeout {timeout:?})");
        let resp = self.request(self.client.get(url), timeout).send().await?;

        if !resp.status().is_success() {
            bail!("GET {url} returned {}", resp.status());
        }
        Ok(resp.text().await?)
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value, timeout: Duration) -> Result<String> {
        debug!("POST {url} (timeout {timeout:?})");
        let resp = self
            .request(self.client.post(url), timeout)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("POST {url} returned {}", resp.status());
        }
        Ok(resp.text().await?)
    }
}
