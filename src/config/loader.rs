// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::model::{ConfigFile, ConfigSource, RawConfigFile};
use crate::config::package::{load_package, PACKAGE_KEY};
use crate::config::validate::validate_config;
use crate::errors::{AssetpipeError, Result};
use crate::template::{resolve_tree, ConfigNode, ConfigTree, RUN_NAMESPACE};

/// Load a configuration file, resolve its placeholders and read the typed
/// sections.
///
/// This does **not** perform semantic validation (unknown tasks, pipeline
/// cycles, ...). Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<(RawConfigFile, ConfigSource)> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        AssetpipeError::ConfigError(format!("cannot read config file {path:?}: {e}"))
    })?;
    load_from_str(&contents, path)
}

/// Same as [`load_from_path`] with the file contents already in memory.
/// `path` still decides the project root and where the package descriptor
/// is looked up.
pub fn load_from_str(contents: &str, path: &Path) -> Result<(RawConfigFile, ConfigSource)> {
    let document: toml::Table = toml::from_str(contents)?;
    let root = project_root(path);

    let tree = build_tree(document, &root)?;
    let raw: RawConfigFile = tree
        .root()
        .to_toml()
        .try_into()
        .map_err(|e: toml::de::Error| {
            AssetpipeError::ConfigError(format!("invalid config section: {e}"))
        })?;

    let source = ConfigSource {
        path: path.to_path_buf(),
        root,
        tree: Arc::new(tree),
    };
    Ok((raw, source))
}

/// Load a configuration file from path and validate it.
///
/// This is the entry point for the rest of the application:
///
/// - Reads TOML and mounts the package descriptor at `pkg`.
/// - Resolves every `<%= ... %>` placeholder.
/// - Checks task references, pipeline aliases and watch rules.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let (raw, source) = load_from_path(&path)?;
    validate_config(raw, source)
}

/// Build the resolved Config Tree from a parsed TOML document.
///
/// Top-level `pkg` and `run` keys are reserved: the first holds the package
/// descriptor, the second run-time metadata written back by tasks.
pub fn build_tree(document: toml::Table, root: &Path) -> Result<ConfigTree> {
    for reserved in [PACKAGE_KEY, RUN_NAMESPACE] {
        if document.contains_key(reserved) {
            return Err(AssetpipeError::ConfigError(format!(
                "top-level key `{reserved}` is reserved"
            )));
        }
    }

    let (package_rel, explicit) = match document
        .get("config")
        .and_then(|c| c.get("package"))
    {
        Some(toml::Value::String(s)) => (s.clone(), true),
        Some(other) => {
            return Err(AssetpipeError::ConfigError(format!(
                "[config].package must be a string, got {}",
                other.type_str()
            )));
        }
        None => ("package.json".to_string(), false),
    };

    let package_path = root.join(&package_rel);
    let package = if package_path.is_file() {
        let (_, node) = load_package(&package_path)?;
        Some(node)
    } else if explicit {
        return Err(AssetpipeError::ConfigError(format!(
            "package descriptor {package_path:?} does not exist"
        )));
    } else {
        warn!(path = ?package_path, "no package descriptor found; `pkg` is not available");
        None
    };

    let mut node = ConfigNode::from_toml(toml::Value::Table(document));
    if let (ConfigNode::Map(map), Some(pkg)) = (&mut node, package) {
        map.insert(PACKAGE_KEY.to_string(), pkg);
    }

    let tree = resolve_tree(&node)?;
    debug!("config tree resolved");
    Ok(tree)
}

/// Project root for a config file: its parent directory, or the current
/// working directory for a bare file name like `Assetpipe.toml`.
pub fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Default config location: `Assetpipe.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Assetpipe.toml")
}
