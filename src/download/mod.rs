use crate::error::InstallError;
use crate::runtime::Runtime;
use crate::source::ArtifactSource;
use anyhow::Result;
use log::info;
use std::io::Write;
use std::path::Path;

/// Mode applied to downloaded binaries (rwxr-xr-x).
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Streams `url` from `source` into `dest` and marks it executable.
///
/// The file handle is closed before the mode is changed, so the result can be
/// executed right away.
#[tracing::instrument(skip(runtime, source, dest))]
pub async fn download_executable<R: Runtime>(
    runtime: &R,
    source: &dyn ArtifactSource,
    url: &str,
    dest: &Path,
) -> Result<u64> {
    info!("Downloading {}...", url);

    let install_error = |reason: String| InstallError::Install {
        path: dest.to_path_buf(),
        reason,
    };

    let file = runtime
        .create_file(dest)
        .map_err(|e| install_error(format!("{:#}", e)))?;
    let mut writer = TrackedWriter::new(file);
    let fetched = source.fetch(url, &mut writer).await;
    let write_failure = writer.failure.take();
    drop(writer);

    // A failed write or flush is a filesystem error, whatever the source wrapped it in
    if let Some(reason) = write_failure {
        return Err(install_error(reason).into());
    }
    let bytes = fetched?;

    runtime
        .set_permissions(dest, EXECUTABLE_MODE)
        .map_err(|e| install_error(format!("{:#}", e)))?;

    info!("Download complete ({} bytes).", bytes);
    Ok(bytes)
}

/// Remembers the first io error raised by the wrapped file.
struct TrackedWriter {
    inner: Box<dyn Write + Send>,
    failure: Option<String>,
}

impl TrackedWriter {
    fn new(inner: Box<dyn Write + Send>) -> Self {
        Self {
            inner,
            failure: None,
        }
    }

    fn record<T>(&mut self, result: std::io::Result<T>) -> std::io::Result<T> {
        if let Err(e) = &result {
            self.failure.get_or_insert_with(|| e.to_string());
        }
        result
    }
}

impl Write for TrackedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let result = self.inner.write(buf);
        self.record(result)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let result = self.inner.flush();
        self.record(result)
    }
}
