//! HTTP retrieval of capabilities documents and map images.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, instrument, warn};
use wms_common::{RasterImage, WmsError, WmsResult};
use wms_protocol::parse_service_exception;

/// Configuration for the fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Whole-request timeout, body included
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Extra attempts after a transport failure
    pub max_retries: u32,
    /// Pause before each retry
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_retries: 1,
            retry_delay: Duration::from_millis(250),
            user_agent: concat!("wms-fetch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Performs WMS GET requests and classifies their failures.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    config: FetchConfig,
}

impl ImageFetcher {
    pub fn new(config: FetchConfig) -> WmsResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| WmsError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Download a GetCapabilities document.
    ///
    /// The body is returned untouched; a body with no content is a
    /// [`WmsError::Decode`].
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_capabilities(&self, url: &str) -> WmsResult<Bytes> {
        let body = self.get(url).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(WmsError::Decode("empty capabilities response".to_string()));
        }
        debug!(bytes = body.len(), "Fetched capabilities");
        Ok(body)
    }

    /// Download and decode a GetMap image.
    ///
    /// A 200 response carrying an OGC service exception instead of an image
    /// is reported as [`WmsError::Decode`] with the server's message.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_map(&self, url: &str) -> WmsResult<RasterImage> {
        let body = self.get(url).await?;
        match RasterImage::decode(&body) {
            Ok(image) => {
                debug!(
                    width = image.width(),
                    height = image.height(),
                    mode = ?image.mode(),
                    "Decoded map image"
                );
                Ok(image)
            }
            Err(err) => match parse_service_exception(&body) {
                Some(message) => {
                    warn!(message = %message, "Server returned a service exception");
                    Err(WmsError::Decode(format!("service exception: {}", message)))
                }
                None => Err(err),
            },
        }
    }

    /// GET with retry on transient failures.
    async fn get(&self, url: &str) -> WmsResult<Bytes> {
        let mut retry_count = 0;

        loop {
            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && retry_count < self.config.max_retries => {
                    retry_count += 1;
                    warn!(
                        error = %e,
                        retry = retry_count,
                        max_retries = self.config.max_retries,
                        delay_ms = self.config.retry_delay.as_millis() as u64,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once(&self, url: &str) -> WmsResult<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(WmsError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.bytes().await.map_err(classify_error)
    }
}

fn classify_error(e: reqwest::Error) -> WmsError {
    if e.is_builder() {
        return WmsError::validation("url", e.to_string());
    }

    let what = if e.is_timeout() {
        "request timed out"
    } else if e.is_connect() {
        "connection failed"
    } else if e.is_body() || e.is_decode() {
        "failed reading response body"
    } else {
        "request failed"
    };
    WmsError::Transport(format!("{}: {}", what, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 1);
        assert!(config.user_agent.starts_with("wms-fetch/"));
    }

    #[test]
    fn test_fetcher_builds() {
        let fetcher = ImageFetcher::new(FetchConfig::default()).unwrap();
        assert_eq!(fetcher.config().max_retries, 1);
    }
}
