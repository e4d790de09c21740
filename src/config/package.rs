// src/config/package.rs

//! Package descriptor (`package.json`) loading.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::errors::{AssetpipeError, Result};
use crate::template::ConfigNode;

/// Config tree key the descriptor is mounted under.
pub const PACKAGE_KEY: &str = "pkg";

/// The fields the build itself depends on. The rest of the descriptor is
/// mounted as-is and only reachable through placeholders.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: String,
}

/// Read and check a package descriptor, returning it as a config node.
pub fn load_package(path: &Path) -> Result<(PackageDescriptor, ConfigNode)> {
    let contents = fs::read_to_string(path).map_err(|e| {
        AssetpipeError::ConfigError(format!("cannot read package descriptor {path:?}: {e}"))
    })?;
    parse_package(&contents, path)
}

/// Parse descriptor JSON; `origin` is only used in error messages.
pub fn parse_package(contents: &str, origin: &Path) -> Result<(PackageDescriptor, ConfigNode)> {
    let value: serde_json::Value = serde_json::from_str(contents)?;
    if !value.is_object() {
        return Err(AssetpipeError::ConfigError(format!(
            "package descriptor {origin:?} must be a JSON object"
        )));
    }

    let descriptor: PackageDescriptor =
        serde_json::from_value(value.clone()).map_err(|e| {
            AssetpipeError::ConfigError(format!(
                "package descriptor {origin:?} needs string `name` and `version`: {e}"
            ))
        })?;

    debug!(name = %descriptor.name, version = %descriptor.version, "loaded package descriptor");
    Ok((descriptor, ConfigNode::from_json(value)))
}
