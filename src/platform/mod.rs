//! Platform detection and resolution
//!
//! This module turns the raw host identifiers (OS and CPU architecture) into
//! the platform descriptor used to pick a markdown-server release asset.

mod detection;

use std::fmt;

use crate::error::InstallError;

pub use detection::{HostDetector, HostInfo, PlatformDetector};

/// Operating systems markdown-server is published for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Mac,
    Linux,
    Windows,
}

impl Os {
    /// Token used in release asset names
    pub fn asset_token(&self) -> &'static str {
        match self {
            Os::Mac => "darwin",
            Os::Linux => "linux",
            Os::Windows => "windows",
        }
    }
}

/// CPU architectures markdown-server is published for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    /// Token used in release asset names
    pub fn asset_token(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }
}

/// The (operating system, CPU architecture) pair identifying which binary
/// variant to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os.asset_token(), self.arch.asset_token())
    }
}

/// Resolve the host identifiers into a platform descriptor.
///
/// Fails with [`InstallError::UnsupportedPlatform`] when either the OS or the
/// architecture is not recognized.
#[tracing::instrument]
pub fn resolve_platform(host: &HostInfo) -> Result<Platform, InstallError> {
    let unsupported = || InstallError::UnsupportedPlatform {
        os: host.os.clone(),
        arch: host.arch.clone(),
    };

    let os = match host.os.to_lowercase().as_str() {
        "macos" | "darwin" | "mac" => Os::Mac,
        "linux" => Os::Linux,
        "windows" => Os::Windows,
        _ => return Err(unsupported()),
    };

    let arch = match host.arch.to_lowercase().as_str() {
        "x86_64" | "amd64" | "x64" => Arch::Amd64,
        "aarch64" | "arm64" => Arch::Arm64,
        _ => return Err(unsupported()),
    };

    Ok(Platform { os, arch })
}
