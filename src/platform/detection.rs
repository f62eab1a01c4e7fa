/// Raw host identifiers, read once per run
#[derive(Debug, Clone, PartialEq)]
pub struct HostInfo {
    pub os: String,
    pub arch: String,
}

impl HostInfo {
    /// Read the identifiers of the running host
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

/// Trait for host detection (useful for testing)
pub trait PlatformDetector: Send + Sync {
    fn detect(&self) -> HostInfo;
}

/// Default detector using the compile-time target of this binary
pub struct HostDetector;

impl PlatformDetector for HostDetector {
    fn detect(&self) -> HostInfo {
        HostInfo::current()
    }
}
