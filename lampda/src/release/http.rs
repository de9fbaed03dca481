//! `reqwest` implementation of [`HttpTransport`].

use std::time::Duration;

use log::trace;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::ACCEPT;

use crate::error::{Error, Result};
use crate::release::catalog::HttpTransport;

/// Media type of GitHub REST API responses.
const GITHUB_JSON: &str = "application/vnd.github+json";

/// Connect timeout for catalog requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking HTTP transport for the GitHub API.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a client identifying itself as `user_agent`.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// GET request; API calls ask for the GitHub JSON media type, asset
    /// downloads keep the default `Accept`.
    fn request(&self, url: &str, api: bool) -> RequestBuilder {
        let request = self.client.get(url);
        if api { request.header(ACCEPT, GITHUB_JSON) } else { request }
    }

    fn get(&self, url: &str, api: bool) -> Result<Response> {
        trace!("GET {url}");
        let response = self
            .request(url, api)
            .send()
            .map_err(|e| Error::Network(format!("failed to connect to {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("GET {url} failed ({status})")));
        }
        Ok(response)
    }
}

impl HttpTransport for ReqwestTransport {
    fn get_text(&self, url: &str) -> Result<String> {
        self.get(url, true)?
            .text()
            .map_err(|e| Error::Network(format!("failed to read response from {url}: {e}")))
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.get(url, false)?
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| Error::Network(format!("failed to read response from {url}: {e}")))
    }
}
