//! HTTP connection to the sharer.
//!
//! Each fetch is one independent `GET /fetch-png`; there is no session
//! and nothing to reconnect. The client keeps a connection pool, so in
//! practice consecutive polls reuse the same TCP stream.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use glimpse_core::{EncodedFrame, FrameSource, GlimpseError};

use crate::config::ViewConfig;

/// Pulls frames from a sharer's `/fetch-png`.
pub struct HttpFrameSource {
    client: Client,
    url: String,
}

impl HttpFrameSource {
    /// Build a source for the configured sharer.
    pub fn new(config: &ViewConfig) -> Result<Self, GlimpseError> {
        let client = Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .map_err(|e| GlimpseError::Fetch(e.to_string()))?;
        let url = format!("{}/fetch-png", config.network.server_url.trim_end_matches('/'));
        info!("polling {url}");
        Ok(Self { client, url })
    }

    /// The full frame URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FrameSource for HttpFrameSource {
    async fn fetch(&self) -> Result<EncodedFrame, GlimpseError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| GlimpseError::Fetch(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GlimpseError::Status(status.as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| GlimpseError::Fetch(e.to_string()))?;
        debug!(bytes = body.len(), "frame fetched");
        Ok(EncodedFrame::new(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let mut cfg = ViewConfig::default();
        cfg.network.server_url = "http://10.0.0.2:8080/".into();
        let source = HttpFrameSource::new(&cfg).unwrap();
        assert_eq!(source.url(), "http://10.0.0.2:8080/fetch-png");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_fetch_error() {
        let mut cfg = ViewConfig::default();
        // Port 1 on localhost is reliably closed.
        cfg.network.server_url = "http://127.0.0.1:1".into();
        let source = HttpFrameSource::new(&cfg).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, GlimpseError::Fetch(_)));
    }
}
