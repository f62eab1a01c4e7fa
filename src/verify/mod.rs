//! Post-install smoke test.
//!
//! Runs the installed binary with `--version` and checks the result.

use anyhow::Result;
use log::{debug, info};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::InstallError;
use crate::runtime::Runtime;

/// Text a working markdown-server prints for `--version`.
pub const VERSION_MARKER: &str = "markdown-server version";

/// How strictly the installed binary is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyMode {
    /// The process must exit successfully
    Exit,
    /// The process must exit successfully and print [`VERSION_MARKER`]
    #[default]
    Output,
    /// Do not run the binary
    Skip,
}

impl fmt::Display for VerifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyMode::Exit => write!(f, "exit"),
            VerifyMode::Output => write!(f, "output"),
            VerifyMode::Skip => write!(f, "skip"),
        }
    }
}

impl FromStr for VerifyMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exit" => Ok(VerifyMode::Exit),
            "output" => Ok(VerifyMode::Output),
            "skip" | "none" => Ok(VerifyMode::Skip),
            _ => anyhow::bail!("Unknown verify mode: {}. Expected exit, output, or skip.", s),
        }
    }
}

/// Run `<bin_path> --version` and check it according to `mode`.
/// Returns the first line of output on success (empty when skipped).
#[tracing::instrument(skip(runtime))]
pub fn verify_install<R: Runtime>(runtime: &R, bin_path: &Path, mode: VerifyMode) -> Result<String> {
    if mode == VerifyMode::Skip {
        debug!("Skipping verification of {}", bin_path.display());
        return Ok(String::new());
    }

    let failed = |reason: String| InstallError::Verify {
        path: bin_path.to_path_buf(),
        reason,
    };

    let output = runtime
        .run(bin_path, &["--version".to_string()])
        .map_err(|e| failed(format!("{:#}", e)))?;

    if !output.success {
        let status = output
            .code
            .map(|c| format!("exit code {}", c))
            .unwrap_or_else(|| "terminated by signal".to_string());
        return Err(failed(format!("{} ({})", status, output.stderr.trim())).into());
    }

    // Each stream is checked on its own so the marker cannot straddle them
    let streams = [output.stdout.as_str(), output.stderr.as_str()];
    let marked = streams.iter().find(|s| s.contains(VERSION_MARKER));
    if mode == VerifyMode::Output && marked.is_none() {
        return Err(failed(format!(
            "output does not contain '{}': {}",
            VERSION_MARKER,
            format!("{}\n{}", output.stdout.trim(), output.stderr.trim()).trim()
        ))
        .into());
    }

    let first_line = marked
        .into_iter()
        .chain(streams.iter())
        .find_map(|s| s.lines().map(str::trim).find(|l| !l.is_empty()))
        .unwrap_or_default()
        .to_string();
    info!("{} --version: {}", bin_path.display(), first_line);
    Ok(first_line)
}
