use super::HttpClient;
use async_trait::async_trait;
use std::sync::Mutex;

/// Returns a canned response and records every requested URL.
pub(crate) struct StubClient {
    status: u16,
    body: Vec<u8>,
    pub(crate) seen: Mutex<Vec<String>>,
}

impl StubClient {
    pub(crate) fn new(status: u16, body: &[u8]) -> Self {
        Self {
            status,
            body: body.to_vec(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for StubClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.seen.lock().unwrap().push(req.url().to_string());
        let resp = http::Response::builder()
            .status(self.status)
            .body(self.body.clone())
            .unwrap();
        Ok(reqwest::Response::from(resp))
    }
}
