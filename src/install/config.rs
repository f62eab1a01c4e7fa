use anyhow::{Context, Result};
use log::debug;
use reqwest::{Client, header::HeaderValue};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{
    asset::Locator,
    runtime::Runtime,
    source::{DEFAULT_API_URL, DEFAULT_WEB_URL, GitHubSource, ReleaseRef, RepoId},
    verify::VerifyMode,
};

use super::paths::default_bin_dir;

const USER_AGENT: &str = "markdown-server-installer";

/// How the release asset is located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Build the download URL from a fixed template
    #[default]
    Static,
    /// Query the release API and search its asset list
    ReleaseApi,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Static => write!(f, "static"),
            Strategy::ReleaseApi => write!(f, "release-api"),
        }
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "static" => Ok(Strategy::Static),
            "release-api" | "api" => Ok(Strategy::ReleaseApi),
            _ => anyhow::bail!(
                "Unknown strategy: {}. Expected static or release-api.",
                s
            ),
        }
    }
}

/// User-facing knobs, usually filled from the command line
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Directory the binary is placed in; defaults per [`default_bin_dir`]
    pub bin_dir: Option<PathBuf>,
    pub repo: RepoId,
    pub release: ReleaseRef,
    pub strategy: Strategy,
    /// Overrides the static download base
    pub release_url: Option<String>,
    /// Overrides the release API base
    pub api_url: Option<String>,
    pub verify: VerifyMode,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            bin_dir: None,
            repo: RepoId {
                owner: "christianhellsten".to_string(),
                repo: "markdown-server".to_string(),
            },
            release: ReleaseRef::Latest,
            strategy: Strategy::default(),
            release_url: None,
            api_url: None,
            verify: VerifyMode::default(),
        }
    }
}

impl InstallOptions {
    /// The locator matching the selected strategy.
    pub fn locator(&self) -> Locator {
        match self.strategy {
            Strategy::Static => Locator::Static {
                base_url: self
                    .release_url
                    .clone()
                    .unwrap_or_else(|| self.release.download_base(DEFAULT_WEB_URL, &self.repo)),
            },
            Strategy::ReleaseApi => Locator::ReleaseApi,
        }
    }
}

/// Everything the install pipeline needs, resolved from [`InstallOptions`]
pub struct Config {
    pub source: GitHubSource,
    pub locator: Locator,
    pub bin_dir: PathBuf,
    pub verify: VerifyMode,
}

impl Config {
    pub fn new<R: Runtime>(runtime: &R, options: InstallOptions) -> Result<Self> {
        let client = build_client()?;
        let auth = github_token(runtime)?;

        let bin_dir = match &options.bin_dir {
            Some(dir) => dir.clone(),
            None => default_bin_dir(runtime)?,
        };

        let locator = options.locator();
        let api_url = options.api_url.as_deref().unwrap_or(DEFAULT_API_URL);
        let source = GitHubSource::with_api_url(client, api_url, options.repo, options.release)
            .with_auth(auth);

        Ok(Self {
            source,
            locator,
            bin_dir,
            verify: options.verify,
        })
    }
}

/// Shared HTTP client. Carries no credentials; see [`github_token`].
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// `GITHUB_TOKEN` as a sensitive bearer header value, if set.
pub fn github_token<R: Runtime>(runtime: &R) -> Result<Option<HeaderValue>> {
    let Ok(token) = runtime.env_var("GITHUB_TOKEN") else {
        return Ok(None);
    };
    let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
        .context("GITHUB_TOKEN contains invalid characters")?;
    auth_value.set_sensitive(true);
    debug!("Using GITHUB_TOKEN for authentication ({} chars)", token.len());
    Ok(Some(auth_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use crate::source::{ArtifactSource, DEFAULT_REPO};
    use mockall::predicate::eq;
    use mockito::Server;

    #[test]
    fn test_strategy_parse() {
        assert_eq!("static".parse::<Strategy>().unwrap(), Strategy::Static);
        assert_eq!(
            "release-api".parse::<Strategy>().unwrap(),
            Strategy::ReleaseApi
        );
        assert_eq!("API".parse::<Strategy>().unwrap(), Strategy::ReleaseApi);
        assert!("guess".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_default_options() {
        let options = InstallOptions::default();
        assert_eq!(options.repo.to_string(), DEFAULT_REPO);
        assert_eq!(options.strategy, Strategy::Static);
        assert_eq!(options.verify, VerifyMode::Output);
        assert_eq!(
            options.locator(),
            Locator::Static {
                base_url:
                    "https://github.com/christianhellsten/markdown-server/releases/latest/download"
                        .into()
            }
        );
    }

    #[test]
    fn test_locator_release_url_override() {
        let options = InstallOptions {
            release_url: Some("http://mirror.local/dl".into()),
            ..Default::default()
        };
        assert_eq!(
            options.locator(),
            Locator::Static {
                base_url: "http://mirror.local/dl".into()
            }
        );

        let options = InstallOptions {
            strategy: Strategy::ReleaseApi,
            ..Default::default()
        };
        assert_eq!(options.locator(), Locator::ReleaseApi);
    }

    #[test]
    fn test_config_uses_explicit_bin_dir() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_env_var()
            .with(eq("GITHUB_TOKEN"))
            .returning(|_| Err(std::env::VarError::NotPresent));
        // is_privileged/home_dir must not be consulted

        let options = InstallOptions {
            bin_dir: Some(PathBuf::from("/opt/tools/bin")),
            api_url: Some("http://api.local/".into()),
            ..Default::default()
        };
        let config = Config::new(&runtime, options).unwrap();

        assert_eq!(config.bin_dir, PathBuf::from("/opt/tools/bin"));
        assert_eq!(config.source.api_url(), "http://api.local");
    }

    // GITHUB_TOKEN goes to the release API only, never to the download host
    #[tokio::test]
    async fn test_github_token_scoped_to_api_requests() {
        let token = "test_token";
        let mut runtime = MockRuntime::new();
        runtime
            .expect_env_var()
            .with(eq("GITHUB_TOKEN"))
            .returning(move |_| Ok(token.to_string()));

        let mut api = Server::new_async().await;
        let api_mock = api
            .mock("GET", "/repos/christianhellsten/markdown-server/releases/latest")
            .match_header("Authorization", format!("Bearer {}", token).as_str())
            .match_header("User-Agent", USER_AGENT)
            .with_status(200)
            .with_body(r#"{"tag_name": "v5", "assets": []}"#)
            .create_async()
            .await;

        let mut mirror = Server::new_async().await;
        let mirror_mock = mirror
            .mock("GET", "/markdown-server-linux-amd64")
            .match_header("Authorization", mockito::Matcher::Missing)
            .match_header("User-Agent", USER_AGENT)
            .with_status(200)
            .with_body("binary")
            .create_async()
            .await;

        let options = InstallOptions {
            bin_dir: Some(PathBuf::from("/opt/tools/bin")),
            api_url: Some(api.url()),
            ..Default::default()
        };
        let config = Config::new(&runtime, options).unwrap();

        config.source.list_assets().await.unwrap();
        let mut buf: Vec<u8> = Vec::new();
        config
            .source
            .fetch(&format!("{}/markdown-server-linux-amd64", mirror.url()), &mut buf)
            .await
            .unwrap();

        api_mock.assert_async().await;
        mirror_mock.assert_async().await;
    }

    #[test]
    fn test_github_token_absent() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_env_var()
            .with(eq("GITHUB_TOKEN"))
            .returning(|_| Err(std::env::VarError::NotPresent));

        assert!(github_token(&runtime).unwrap().is_none());
    }
}
