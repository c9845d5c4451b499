use crate::error::{ProbeError, Result};
use crate::result::ProbeResult;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; sitecheck/0.1)";

/// HTTP client wrapper that fetches a page and extracts its SEO metadata.
#[derive(Clone)]
pub struct Prober {
    client: Client,
}

impl Prober {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self::with_settings(timeout_secs, DEFAULT_USER_AGENT)
    }

    pub fn with_settings(timeout_secs: u64, user_agent: &str) -> Self {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Fetch a page and pull out the status line plus first h1, title and
    /// meta description.
    ///
    /// 4xx/5xx responses are failures, as are network errors and timeouts.
    pub async fn probe(&self, url: &str) -> Result<ProbeResult> {
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(extract_metadata(status.as_u16(), &body))
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_metadata(status_code: u16, body: &str) -> ProbeResult {
    let document = Html::parse_document(body);

    let h1_selector = Selector::parse("h1").unwrap();
    let title_selector = Selector::parse("title").unwrap();
    let meta_selector = Selector::parse("meta[name=description]").unwrap();

    let h1 = document
        .select(&h1_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string());
    let title = document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string());
    let description = document
        .select(&meta_selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.to_string());

    ProbeResult {
        status_code,
        h1,
        title,
        description,
    }
}
