//! Install pipeline.
//!
//! resolve platform -> build asset name -> locate -> download -> chmod ->
//! move into the bin dir -> `--version` smoke test. Every step runs to
//! completion before the next one starts and the first failure aborts.

mod config;
mod paths;

use anyhow::Result;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::asset::{Locator, build_asset_name, install_name};
use crate::download::download_executable;
use crate::error::InstallError;
use crate::platform::{Platform, PlatformDetector, resolve_platform};
use crate::runtime::Runtime;
use crate::source::ArtifactSource;
use crate::verify::{VerifyMode, verify_install};

pub use config::{Config, InstallOptions, Strategy, build_client, github_token};
pub use paths::default_bin_dir;

/// What a finished install did
#[derive(Debug, Clone, PartialEq)]
pub struct InstallReport {
    pub platform: Platform,
    pub asset_name: String,
    pub url: String,
    pub path: PathBuf,
    /// First line of `--version` output; empty when verification was skipped
    pub version: String,
}

/// Where an install would come from, without downloading anything
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub platform: Platform,
    pub asset_name: String,
    pub url: String,
}

/// Install markdown-server as configured by `options`.
#[tracing::instrument(skip(runtime, detector, options))]
pub async fn install<R: Runtime>(
    runtime: R,
    detector: &dyn PlatformDetector,
    options: InstallOptions,
) -> Result<()> {
    let config = Config::new(&runtime, options)?;
    info!("Installing into {}", config.bin_dir.display());

    let report = install_release(
        &runtime,
        detector,
        &config.source,
        &config.locator,
        &config.bin_dir,
        config.verify,
    )
    .await?;

    println!(
        "Installed {} ({}) to {}",
        report.asset_name,
        report.platform,
        report.path.display()
    );
    if !report.version.is_empty() {
        println!("{}", report.version);
    }
    Ok(())
}

/// Print the platform, asset name and download URL that `install` would use.
#[tracing::instrument(skip(runtime, detector, options))]
pub async fn resolve<R: Runtime>(
    runtime: R,
    detector: &dyn PlatformDetector,
    options: InstallOptions,
) -> Result<()> {
    let config = Config::new(&runtime, options)?;
    let resolution = resolve_release(detector, &config.source, &config.locator).await?;

    println!("platform: {}", resolution.platform);
    println!("asset:    {}", resolution.asset_name);
    println!("url:      {}", resolution.url);
    println!(
        "install:  {}",
        config
            .bin_dir
            .join(install_name(&resolution.platform))
            .display()
    );
    Ok(())
}

/// Resolve the host platform and locate the matching release asset.
///
/// Fails with `UnsupportedPlatform` before any network call is made.
pub async fn resolve_release(
    detector: &dyn PlatformDetector,
    source: &dyn ArtifactSource,
    locator: &Locator,
) -> Result<Resolution> {
    let host = detector.detect();
    let platform = resolve_platform(&host)?;
    debug!("Resolved {:?} to {}", host, platform);

    let asset_name = build_asset_name(&platform);
    let url = locator.locate(source, &asset_name).await?;

    Ok(Resolution {
        platform,
        asset_name,
        url,
    })
}

/// Run the whole pipeline against the given collaborators.
pub async fn install_release<R: Runtime>(
    runtime: &R,
    detector: &dyn PlatformDetector,
    source: &dyn ArtifactSource,
    locator: &Locator,
    bin_dir: &Path,
    verify: VerifyMode,
) -> Result<InstallReport> {
    let Resolution {
        platform,
        asset_name,
        url,
    } = resolve_release(detector, source, locator).await?;

    let dest_name = install_name(&platform);
    runtime
        .create_dir_all(bin_dir)
        .map_err(|e| InstallError::Install {
            path: bin_dir.to_path_buf(),
            reason: format!("{:#}", e),
        })?;

    // Staged next to the destination so the final rename stays on one filesystem
    let staged = bin_dir.join(format!(".{}.download", dest_name));

    if let Err(e) = download_executable(runtime, source, &url, &staged).await {
        discard_staged(runtime, &staged);
        return Err(e);
    }

    let path = match install_binary(runtime, &staged, bin_dir, dest_name) {
        Ok(path) => path,
        Err(e) => {
            discard_staged(runtime, &staged);
            return Err(e);
        }
    };

    let version = verify_install(runtime, &path, verify)?;

    Ok(InstallReport {
        platform,
        asset_name,
        url,
        path,
        version,
    })
}

/// Move the downloaded file to `<bin_dir>/<dest_name>`, replacing any
/// previous install in one step. A failed rename leaves the previous
/// binary untouched.
#[tracing::instrument(skip(runtime))]
pub fn install_binary<R: Runtime>(
    runtime: &R,
    staged: &Path,
    bin_dir: &Path,
    dest_name: &str,
) -> Result<PathBuf> {
    let dest = bin_dir.join(dest_name);

    runtime
        .rename(staged, &dest)
        .map_err(|e| InstallError::Install {
            path: dest.clone(),
            reason: format!("{:#}", e),
        })?;
    info!("Installed {}", dest.display());

    Ok(dest)
}

fn discard_staged<R: Runtime>(runtime: &R, staged: &Path) {
    if !runtime.exists(staged) {
        return;
    }
    if let Err(e) = runtime.remove_file(staged) {
        warn!("Failed to remove {}: {:#}", staged.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::EXECUTABLE_MODE;
    use crate::platform::HostInfo;
    use crate::runtime::{MockRuntime, ProcessOutput};
    use crate::source::fake::FakeSource;
    use crate::test_utils::test_bin_dir;
    use mockall::Sequence;
    use mockall::predicate::eq;

    struct FixedHost(&'static str, &'static str);

    impl PlatformDetector for FixedHost {
        fn detect(&self) -> HostInfo {
            HostInfo {
                os: self.0.to_string(),
                arch: self.1.to_string(),
            }
        }
    }

    const LINUX_URL: &str =
        "https://github.com/o/r/releases/latest/download/markdown-server-linux-amd64";

    fn static_locator() -> Locator {
        Locator::Static {
            base_url: "https://github.com/o/r/releases/latest/download".into(),
        }
    }

    #[tokio::test]
    async fn test_resolve_release_static() {
        let source = FakeSource::default();
        let resolution = resolve_release(&FixedHost("linux", "x86_64"), &source, &static_locator())
            .await
            .unwrap();

        assert_eq!(resolution.asset_name, "markdown-server-linux-amd64");
        assert_eq!(resolution.url, LINUX_URL);
    }

    #[tokio::test]
    async fn test_unsupported_platform_aborts_before_network() {
        let source = FakeSource::default().with_asset("markdown-server-linux-amd64", "x");
        // No runtime expectations: nothing may touch the filesystem
        let runtime = MockRuntime::new();

        let err = install_release(
            &runtime,
            &FixedHost("linux", "riscv64"),
            &source,
            &Locator::ReleaseApi,
            &test_bin_dir(),
            VerifyMode::Output,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::UnsupportedPlatform { .. })
        ));
        assert_eq!(*source.list_calls.lock().unwrap(), 0);
        assert!(source.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_release_full_pipeline() {
        let bin_dir = test_bin_dir();
        let staged = bin_dir.join(".markdown-server.download");
        let dest = bin_dir.join("markdown-server");
        let mut seq = Sequence::new();
        let mut runtime = MockRuntime::new();

        runtime
            .expect_create_dir_all()
            .with(eq(bin_dir.clone()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        runtime
            .expect_create_file()
            .with(eq(staged.clone()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Box::new(std::io::sink())));
        runtime
            .expect_set_permissions()
            .with(eq(staged.clone()), eq(EXECUTABLE_MODE))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        runtime
            .expect_rename()
            .with(eq(staged.clone()), eq(dest.clone()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        runtime
            .expect_run()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Ok(ProcessOutput {
                    success: true,
                    code: Some(0),
                    stdout: "markdown-server version 1.2.3\n".into(),
                    stderr: String::new(),
                })
            });

        let source = FakeSource::default().with_file(LINUX_URL, b"binary");
        let report = install_release(
            &runtime,
            &FixedHost("linux", "x86_64"),
            &source,
            &static_locator(),
            &bin_dir,
            VerifyMode::Output,
        )
        .await
        .unwrap();

        assert_eq!(report.path, dest);
        assert_eq!(report.asset_name, "markdown-server-linux-amd64");
        assert_eq!(report.version, "markdown-server version 1.2.3");
        assert_eq!(*source.fetched.lock().unwrap(), vec![LINUX_URL.to_string()]);
    }

    #[tokio::test]
    async fn test_install_release_api_not_found() {
        let runtime = MockRuntime::new();
        let source = FakeSource::default()
            .with_asset("markdown-server-darwin-arm64", "https://dl/mac")
            .with_asset("markdown-server-windows-amd64.exe", "https://dl/win");

        let err = install_release(
            &runtime,
            &FixedHost("linux", "aarch64"),
            &source,
            &Locator::ReleaseApi,
            &test_bin_dir(),
            VerifyMode::Output,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::AssetNotFound { .. })
        ));
        assert!(source.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_download_discards_staged_file() {
        let bin_dir = test_bin_dir();
        let staged = bin_dir.join(".markdown-server.download");
        let mut runtime = MockRuntime::new();

        runtime.expect_create_dir_all().returning(|_| Ok(()));
        runtime
            .expect_create_file()
            .returning(|_| Ok(Box::new(std::io::sink())));
        runtime
            .expect_exists()
            .with(eq(staged.clone()))
            .returning(|_| true);
        runtime
            .expect_remove_file()
            .with(eq(staged.clone()))
            .times(1)
            .returning(|_| Ok(()));

        // Nothing served at the static URL
        let source = FakeSource::default();
        let err = install_release(
            &runtime,
            &FixedHost("linux", "x86_64"),
            &source,
            &static_locator(),
            &bin_dir,
            VerifyMode::Output,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::Download { .. })
        ));
    }

    #[test]
    fn test_install_binary_renames_over_destination() {
        let bin_dir = test_bin_dir();
        let staged = bin_dir.join(".markdown-server.download");
        let dest = bin_dir.join("markdown-server");
        let mut runtime = MockRuntime::new();

        // No exists/remove_file expectations: the old binary is never deleted up front
        runtime
            .expect_rename()
            .with(eq(staged.clone()), eq(dest.clone()))
            .times(1)
            .returning(|_, _| Ok(()));

        let path = install_binary(&runtime, &staged, &bin_dir, "markdown-server").unwrap();
        assert_eq!(path, dest);
    }

    #[test]
    fn test_failed_install_keeps_previous_binary() {
        let dir = tempfile::tempdir().unwrap();
        let bin_dir = dir.path();
        let previous = bin_dir.join("markdown-server");
        std::fs::write(&previous, b"old working binary").unwrap();

        // Staged download is missing, so the rename fails
        let staged = bin_dir.join(".markdown-server.download");
        let err = install_binary(
            &crate::runtime::RealRuntime,
            &staged,
            bin_dir,
            "markdown-server",
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::Install { .. })
        ));
        assert_eq!(std::fs::read(&previous).unwrap(), b"old working binary");
    }

    #[test]
    fn test_install_binary_rename_failure() {
        let bin_dir = test_bin_dir();
        let staged = bin_dir.join(".markdown-server.exe.download");
        let mut runtime = MockRuntime::new();

        runtime
            .expect_rename()
            .returning(|_, _| Err(anyhow::anyhow!("Access is denied")));

        let err = install_binary(&runtime, &staged, &bin_dir, "markdown-server.exe").unwrap_err();
        match err.downcast_ref::<InstallError>() {
            Some(InstallError::Install { path, reason }) => {
                assert_eq!(path, &bin_dir.join("markdown-server.exe"));
                assert!(reason.contains("Access is denied"));
            }
            other => panic!("Expected Install error, got {:?}", other),
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_install_release_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let bin_dir = dir.path().join("bin");
        let runtime = crate::runtime::RealRuntime;

        for body in [&b"first"[..], &b"second"[..]] {
            let source = FakeSource::default().with_file(LINUX_URL, body);
            let report = install_release(
                &runtime,
                &FixedHost("linux", "x86_64"),
                &source,
                &static_locator(),
                &bin_dir,
                VerifyMode::Skip,
            )
            .await
            .unwrap();
            assert_eq!(std::fs::read(&report.path).unwrap(), body);
        }

        assert!(!bin_dir.join(".markdown-server.download").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(bin_dir.join("markdown-server"))
                .unwrap()
                .permissions()
                .mode();
            assert_ne!(mode & 0o100, 0, "owner execute bit should be set");
        }
    }
}
