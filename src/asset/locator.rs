use anyhow::Result;
use log::{debug, info};

use crate::error::InstallError;
use crate::source::{ArtifactSource, ReleaseAsset};

/// How the download URL of an asset is found
#[derive(Debug, Clone, PartialEq)]
pub enum Locator {
    /// Append the asset name to a fixed release download base. No network call;
    /// a wrong name only shows up when the download returns 404.
    Static { base_url: String },
    /// Ask the release API for its asset list and search it by name.
    ReleaseApi,
}

impl Locator {
    /// Resolve `asset_name` to a download URL.
    #[tracing::instrument(skip(self, source))]
    pub async fn locate(&self, source: &dyn ArtifactSource, asset_name: &str) -> Result<String> {
        match self {
            Locator::Static { base_url } => {
                let url = format!("{}/{}", base_url.trim_end_matches('/'), asset_name);
                debug!("Static asset URL: {}", url);
                Ok(url)
            }
            Locator::ReleaseApi => {
                let assets = source.list_assets().await?;
                let asset = find_asset(&assets, asset_name)?;
                info!("Found release asset {}", asset.name);
                Ok(asset.download_url.clone())
            }
        }
    }
}

/// Linear search for the first asset whose name contains `asset_name`.
pub fn find_asset<'a>(
    assets: &'a [ReleaseAsset],
    asset_name: &str,
) -> Result<&'a ReleaseAsset, InstallError> {
    let mut matches = assets.iter().filter(|a| a.name.contains(asset_name));

    let first = matches.next().ok_or_else(|| InstallError::AssetNotFound {
        asset: asset_name.to_string(),
    })?;

    for ignored in matches {
        debug!(
            "Ignoring additional match {} (using {})",
            ignored.name, first.name
        );
    }

    Ok(first)
}
