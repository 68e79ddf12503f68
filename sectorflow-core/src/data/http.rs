//! Blocking reqwest transport.

use super::transport::{HttpResponse, Transport, TransportError};
use std::time::Duration;

/// Transport backed by a blocking reqwest client with a fixed request timeout.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sectorflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

fn classify(url: &str, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_connect() {
        TransportError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        }
    } else {
        TransportError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

impl Transport for ReqwestTransport {
    fn name(&self) -> &str {
        "reqwest"
    }

    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let resp = self.client.get(url).send().map_err(|e| classify(url, e))?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(|e| classify(url, e))?;
        Ok(HttpResponse { status, body })
    }
}
