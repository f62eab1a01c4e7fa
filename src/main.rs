use anyhow::Result;
use clap::Parser;
use mdsi::install::{InstallOptions, Strategy};
use mdsi::platform::HostDetector;
use mdsi::source::{DEFAULT_REPO, ReleaseRef, RepoId};
use mdsi::verify::VerifyMode;
use std::path::PathBuf;

/// markdown-server-installer - install prebuilt markdown-server binaries
///
/// Picks the release asset for this OS and CPU, downloads it into a bin
/// directory and checks it with `--version`.
///
/// If the GITHUB_TOKEN environment variable is set, it will be used for authentication.
///
/// Examples:
///   markdown-server-installer install                 # latest release into ~/.local/bin
///   markdown-server-installer -b /opt/bin install     # custom bin directory
///   markdown-server-installer --strategy release-api resolve
#[derive(Parser, Debug)]
#[command(author, version = env!("MDSI_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory to install the binary into (also via MARKDOWN_SERVER_BIN_DIR)
    #[arg(
        long = "bin-dir",
        short = 'b',
        env = "MARKDOWN_SERVER_BIN_DIR",
        value_name = "PATH",
        global = true
    )]
    pub bin_dir: Option<PathBuf>,

    /// Repository publishing the releases
    #[arg(long, value_name = "OWNER/REPO", default_value = DEFAULT_REPO, global = true)]
    pub repo: String,

    /// Release tag to install (defaults to the latest release)
    #[arg(long, value_name = "TAG", global = true)]
    pub tag: Option<String>,

    /// How to find the asset: "static" (URL template) or "release-api" (search the release listing)
    #[arg(long, value_name = "STRATEGY", default_value = "static", global = true)]
    pub strategy: String,

    /// Download base for the static strategy
    #[arg(long = "release-url", value_name = "URL", global = true)]
    pub release_url: Option<String>,

    /// GitHub API URL (defaults to https://api.github.com)
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Download, install and verify markdown-server
    Install(InstallArgs),

    /// Show which asset would be installed, without downloading it
    Resolve,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Post-install check: "output", "exit" or "skip"
    #[arg(long, value_name = "MODE", default_value = "output")]
    pub verify: String,
}

impl Cli {
    fn options(&self, verify: VerifyMode) -> Result<InstallOptions> {
        Ok(InstallOptions {
            bin_dir: self.bin_dir.clone(),
            repo: self.repo.parse::<RepoId>()?,
            release: ReleaseRef::from_tag(self.tag.clone()),
            strategy: self.strategy.parse::<Strategy>()?,
            release_url: self.release_url.clone(),
            api_url: self.api_url.clone(),
            verify,
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = mdsi::runtime::RealRuntime;

    match &cli.command {
        Commands::Install(args) => {
            let options = cli.options(args.verify.parse()?)?;
            mdsi::install::install(runtime, &HostDetector, options).await?
        }
        Commands::Resolve => {
            let options = cli.options(VerifyMode::Skip)?;
            mdsi::install::resolve(runtime, &HostDetector, options).await?
        }
    }
    Ok(())
}
