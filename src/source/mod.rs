//! Artifact source abstraction.
//!
//! The release API and the download endpoint are both reached through
//! [`ArtifactSource`], so locating and downloading can be exercised against a
//! fake source without network access.

mod github;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

pub use github::{DEFAULT_API_URL, DEFAULT_WEB_URL, GitHubSource};

/// Repository hosting markdown-server releases.
pub const DEFAULT_REPO: &str = "christianhellsten/markdown-server";

/// Repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepoId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            anyhow::bail!("Invalid repository format. Expected 'owner/repo'.")
        } else {
            Ok(RepoId {
                owner: parts[0].to_string(),
                repo: parts[1].to_string(),
            })
        }
    }
}

/// Which release to install from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReleaseRef {
    #[default]
    Latest,
    Tag(String),
}

impl ReleaseRef {
    pub fn from_tag(tag: Option<String>) -> Self {
        match tag {
            Some(tag) if tag != "latest" => ReleaseRef::Tag(tag),
            _ => ReleaseRef::Latest,
        }
    }

    /// Base URL that release assets are served from, e.g.
    /// `https://github.com/owner/repo/releases/latest/download`.
    pub fn download_base(&self, web_url: &str, repo: &RepoId) -> String {
        let web_url = web_url.trim_end_matches('/');
        match self {
            ReleaseRef::Latest => format!("{}/{}/releases/latest/download", web_url, repo),
            ReleaseRef::Tag(tag) => format!("{}/{}/releases/download/{}", web_url, repo, tag),
        }
    }
}

impl fmt::Display for ReleaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseRef::Latest => write!(f, "latest"),
            ReleaseRef::Tag(tag) => write!(f, "{}", tag),
        }
    }
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseAsset {
    pub name: String,
    pub size: u64,
    pub download_url: String,
}

/// Where release assets are listed and fetched from.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// List the assets of the configured release.
    async fn list_assets(&self) -> Result<Vec<ReleaseAsset>>;

    /// Stream the bytes at `url` into `writer`; returns the byte count.
    async fn fetch(&self, url: &str, writer: &mut (dyn Write + Send)) -> Result<u64>;
}
