//! Release asset naming and location
//!
//! Builds the expected asset name for a platform and resolves it to a
//! download URL, either by template or by searching a release listing.

mod locator;
mod name;

pub use locator::{Locator, find_asset};
pub use name::{BINARY_NAME, build_asset_name, install_name};
