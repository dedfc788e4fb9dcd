//! Feed fetching.
//!
//! [`fetch_bytes`] reports every failure to the caller; [`fetch_feed`] is the
//! pipeline-facing wrapper that logs the failure and yields an empty payload
//! so one city's outage does not affect the others.

mod basic;
#[cfg(test)]
pub(crate) mod stub;

pub use basic::BasicClient;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Request, Response};
use tracing::{debug, error};

/// Transport seam between the WFS pipeline and the network.
///
/// [`BasicClient`] talks to the real service; tests substitute a canned
/// response.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// GETs `url` and returns the body bytes.
///
/// # Errors
///
/// Fails on an unparseable URL, transport errors and timeouts, and any
/// non-2xx status.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// Fetches a GML feed, returning an empty payload on any failure, including
/// a body that is not valid UTF-8.
#[tracing::instrument(skip(client))]
pub async fn fetch_feed<C: HttpClient>(client: &C, url: &str) -> Vec<u8> {
    let result = fetch_bytes(client, url).await.and_then(|bytes| {
        String::from_utf8(bytes)
            .map(String::into_bytes)
            .context("response body is not valid UTF-8")
    });

    match result {
        Ok(bytes) => {
            debug!(bytes = bytes.len(), "Feed bytes received");
            bytes
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "Feed fetch failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use stub::StubClient;

    #[tokio::test]
    async fn test_fetch_bytes_success() {
        let client = StubClient::new(200, b"<xml/>");
        let bytes = fetch_bytes(&client, "http://example.org/wfs?a=1").await.unwrap();

        assert_eq!(bytes, b"<xml/>");
        assert_eq!(client.requests(), vec!["http://example.org/wfs?a=1"]);
    }

    #[tokio::test]
    async fn test_fetch_bytes_error_status() {
        let client = StubClient::new(503, b"busy");
        assert!(fetch_bytes(&client, "http://example.org/wfs").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_bytes_bad_url() {
        let client = StubClient::new(200, b"");
        assert!(fetch_bytes(&client, "not a url").await.is_err());
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_feed_degrades_to_empty() {
        let client = StubClient::new(500, b"<error/>");
        assert!(fetch_feed(&client, "http://example.org/wfs").await.is_empty());

        let client = StubClient::new(200, &[0xFF, 0xFE, 0x00]);
        assert!(fetch_feed(&client, "http://example.org/wfs").await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_feed_passes_utf8_through() {
        let body = "<a>Gdańsk</a>".as_bytes();
        let client = StubClient::new(200, body);
        assert_eq!(fetch_feed(&client, "http://example.org/wfs").await, body);
    }

    #[test]
    fn test_basic_client_builds_from_settings() {
        assert!(BasicClient::new(&Settings::default()).is_ok());
    }
}
