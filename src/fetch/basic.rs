use super::HttpClient;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::time::Duration;

use crate::config::Settings;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Plain reqwest client with the service timeout, user agent and
/// `Accept: application/xml`.
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/xml"));

        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(settings.timeout))
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .build()?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
