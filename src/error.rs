//! Fatal install errors.
//!
//! Every failure aborts the run. Call sites wrap these in `anyhow::Error`
//! so context can be attached; use `downcast_ref::<InstallError>()` to tell
//! the kinds apart.

use std::path::PathBuf;

/// Message shown when the release listing has no asset for this host.
pub const ASSET_NOT_FOUND_MESSAGE: &str = "No binary found for the current platform";

#[derive(Debug)]
pub enum InstallError {
    /// The host OS or CPU is not one markdown-server is published for
    UnsupportedPlatform { os: String, arch: String },
    /// The release listing contains no asset matching the computed name
    AssetNotFound { asset: String },
    /// Connection failure or non-success HTTP status
    Download { url: String, reason: String },
    /// Filesystem write, rename or permission failure
    Install { path: PathBuf, reason: String },
    /// `--version` smoke test did not pass
    Verify { path: PathBuf, reason: String },
}

impl std::fmt::Display for InstallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallError::UnsupportedPlatform { os, arch } => {
                write!(f, "Unsupported platform: os={}, arch={}", os, arch)
            }
            InstallError::AssetNotFound { asset } => {
                write!(f, "{} (looked for '{}')", ASSET_NOT_FOUND_MESSAGE, asset)
            }
            InstallError::Download { url, reason } => {
                write!(f, "Download of {} failed: {}", url, reason)
            }
            InstallError::Install { path, reason } => {
                write!(f, "Failed to install {}: {}", path.display(), reason)
            }
            InstallError::Verify { path, reason } => {
                write!(f, "Verification of {} failed: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for InstallError {}
