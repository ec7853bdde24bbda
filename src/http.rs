use std::path::Path;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Shared HTTP client that identifies itself with a fixed user agent.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(user_agent)
            .map_err(|e| Error::Client(format!("invalid user agent {user_agent:?}: {e}")))?;
        headers.insert(USER_AGENT, value);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// GET a page and return its body as text.
    pub async fn fetch_page(&self, url: &Url) -> Result<String> {
        debug!("Fetching page {}", url);
        let wrap = |source| Error::Fetch {
            url: url.to_string(),
            source,
        };
        self.client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(wrap)?
            .text()
            .await
            .map_err(wrap)
    }

    /// GET `url` and write the body verbatim to `dest`, truncating any
    /// existing file. Nothing is retried and partial files are left behind.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let wrap = |source| Error::Fetch {
            url: url.to_string(),
            source,
        };
        let body = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(wrap)?
            .bytes()
            .await
            .map_err(wrap)?;
        tokio::fs::write(dest, &body)
            .await
            .map_err(|e| Error::io(dest, e))?;
        debug!("Saved {} ({} bytes) to {}", url, body.len(), dest.display());
        Ok(())
    }
}
