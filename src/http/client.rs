//! HTTP client for the release API and asset downloads.

use anyhow::{Context, Result};
use log::debug;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderValue},
};
use serde::de::DeserializeOwned;
use std::io::Write;

use super::status::{check_status, transport_error};

/// Thin wrapper over a shared reqwest Client.
///
/// Requests are attempted exactly once; failures surface as
/// [`crate::error::InstallError::Download`].
///
/// The optional authorization header is only attached to API calls
/// ([`HttpClient::get_json`]), never to asset downloads, which may be served
/// by a mirror or a redirect target on another host.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    auth: Option<HeaderValue>,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client, auth: None }
    }

    /// Authorization header value sent with API requests.
    pub fn with_auth(mut self, auth: Option<HeaderValue>) -> Self {
        self.auth = auth;
        self
    }

    /// Performs a GET request and deserializes the JSON response.
    #[tracing::instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET JSON from {}...", url);

        let mut request = self.client.get(url);
        if let Some(auth) = &self.auth {
            request = request.header(AUTHORIZATION, auth.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let response = check_status(url, response)?;

        response
            .json::<T>()
            .await
            .context("Failed to parse JSON response")
    }

    /// Streams the body at `url` into `writer`, one chunk at a time.
    /// Returns the number of bytes written.
    #[tracing::instrument(skip(self, writer))]
    pub async fn download_to<W>(&self, url: &str, writer: &mut W) -> Result<u64>
    where
        W: Write + ?Sized,
    {
        debug!("Downloading file from {}...", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let mut response = check_status(url, response)?;
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response.chunk().await.map_err(|e| transport_error(url, e))? {
            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer.flush().context("Failed to flush downloaded file")?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }
}
