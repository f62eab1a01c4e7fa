use log::warn;

use crate::platform::{Arch, Os, Platform};

/// Name of the installed program
pub const BINARY_NAME: &str = "markdown-server";

/// Build the release asset name for a platform:
/// `markdown-server-<os>-<arch>`, with `.exe` appended on Windows.
pub fn build_asset_name(platform: &Platform) -> String {
    if platform.os == Os::Windows && platform.arch == Arch::Arm64 {
        warn!("No windows/arm64 build of {} is known to be published", BINARY_NAME);
    }

    format!(
        "{}-{}-{}{}",
        BINARY_NAME,
        platform.os.asset_token(),
        platform.arch.asset_token(),
        exe_suffix(platform.os)
    )
}

/// File name the binary is installed under
pub fn install_name(platform: &Platform) -> &'static str {
    match platform.os {
        Os::Windows => "markdown-server.exe",
        Os::Mac | Os::Linux => BINARY_NAME,
    }
}

fn exe_suffix(os: Os) -> &'static str {
    match os {
        Os::Windows => ".exe",
        Os::Mac | Os::Linux => "",
    }
}
