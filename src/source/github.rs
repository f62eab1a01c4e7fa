//! GitHub releases implementation of [`ArtifactSource`].

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, header::HeaderValue};
use std::io::Write;

use crate::http::HttpClient;

use super::{ArtifactSource, ReleaseAsset, ReleaseRef, RepoId};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_WEB_URL: &str = "https://github.com";

/// GitHub API response types (internal).
mod api {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct Release {
        pub tag_name: String,
        pub assets: Vec<Asset>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Asset {
        pub name: String,
        pub size: u64,
        pub browser_download_url: String,
    }
}

/// Release assets of one GitHub repository.
pub struct GitHubSource {
    http_client: HttpClient,
    api_url: String,
    repo: RepoId,
    release: ReleaseRef,
}

impl GitHubSource {
    /// Create a new GitHub source with the public API URL.
    pub fn new(client: Client, repo: RepoId, release: ReleaseRef) -> Self {
        Self::with_api_url(client, DEFAULT_API_URL, repo, release)
    }

    /// Create a new GitHub source with a custom API URL.
    pub fn with_api_url(client: Client, api_url: &str, repo: RepoId, release: ReleaseRef) -> Self {
        Self {
            http_client: HttpClient::new(client),
            api_url: api_url.trim_end_matches('/').to_string(),
            repo,
            release,
        }
    }

    /// Authenticate release API calls. Asset downloads stay anonymous.
    pub fn with_auth(mut self, auth: Option<HeaderValue>) -> Self {
        self.http_client = self.http_client.with_auth(auth);
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn release_url(&self) -> String {
        match &self.release {
            ReleaseRef::Latest => format!("{}/repos/{}/releases/latest", self.api_url, self.repo),
            ReleaseRef::Tag(tag) => {
                format!("{}/repos/{}/releases/tags/{}", self.api_url, self.repo, tag)
            }
        }
    }
}

#[async_trait]
impl ArtifactSource for GitHubSource {
    #[tracing::instrument(skip(self))]
    async fn list_assets(&self) -> Result<Vec<ReleaseAsset>> {
        let url = self.release_url();
        debug!("Fetching release listing from {}...", url);

        let release: api::Release = self.http_client.get_json(&url).await?;
        info!(
            "Release {} of {} has {} assets",
            release.tag_name,
            self.repo,
            release.assets.len()
        );

        Ok(release.assets.into_iter().map(|a| a.into()).collect())
    }

    #[tracing::instrument(skip(self, writer))]
    async fn fetch(&self, url: &str, writer: &mut (dyn Write + Send)) -> Result<u64> {
        self.http_client.download_to(url, writer).await
    }
}

impl From<api::Asset> for ReleaseAsset {
    fn from(a: api::Asset) -> Self {
        ReleaseAsset {
            name: a.name,
            size: a.size,
            download_url: a.browser_download_url,
        }
    }
}
