// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use crate::error::{AppError, Result};
use crate::models::SourceConfig;

/// Raw listing page as received, before any decoding.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP response status code
    pub status: u16,
    /// Content-Type header, if provided
    pub content_type: Option<String>,
    /// Raw response body bytes
    pub body: Vec<u8>,
}

/// Something that can produce the listing page.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch `url`. Non-success statuses are errors.
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// Create a configured asynchronous HTTP client.
///
/// Without `timeout_secs` requests may wait indefinitely.
pub fn create_client(config: &SourceConfig) -> Result<Client> {
    let mut builder = Client::builder().user_agent(&config.user_agent);
    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

/// Fetches pages over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self::with_client(create_client(config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::http_status(status.as_u16(), &body));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        log::debug!(
            "Fetched {} bytes from {} (status {}, content-type {:?})",
            body.len(),
            url,
            status.as_u16(),
            content_type
        );

        Ok(FetchedPage {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}
