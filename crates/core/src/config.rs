//! Runtime configuration read from the host's key-value properties.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const INSTALL_KEY: &str = "strata.content.install";
pub const PREFIX_KEY: &str = "strata.content.prefix";
pub const MODULES_KEY: &str = "strata.modules";
pub const DEPLOYMENT_KEY: &str = "strata.deployment";
pub const CLASSPATH_KEY: &str = "strata.classpath";
pub const BOOT_DIR_KEY: &str = "strata.boot.dir";

/// Environment variable overriding the storage directory.
pub const STORAGE_ENV: &str = "STRATA_STORAGE_DIR";
pub const DEFAULT_STORAGE_DIR: &str = ".strata/storage";
pub const DEFAULT_PREFIX: &str = "strata";

/// Layer created from [`MODULES_KEY`].
pub const MODULES_LAYER: &str = "modules";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentKind {
    Classpath,
    Directory,
    Embedded,
}

impl DeploymentKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "classpath" => Some(Self::Classpath),
            "directory" => Some(Self::Directory),
            "embedded" => Some(Self::Embedded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Install boot units through the host after initialization
    pub install_boot: bool,
    pub install_prefix: String,
    pub modules_dir: Option<PathBuf>,
    pub deployment: Option<DeploymentKind>,
    pub classpath: Vec<PathBuf>,
    pub boot_dir: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            install_boot: true,
            install_prefix: DEFAULT_PREFIX.to_string(),
            modules_dir: None,
            deployment: None,
            classpath: Vec::new(),
            boot_dir: None,
        }
    }
}

impl RuntimeConfig {
    /// Build from properties. Unknown keys are ignored and malformed values
    /// fall back to their defaults.
    pub fn from_map(props: &HashMap<String, String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = props.get(INSTALL_KEY) {
            match parse_bool(value) {
                Some(install) => config.install_boot = install,
                None => warn!(
                    "Ignoring malformed {}={:?}, using {}",
                    INSTALL_KEY, value, config.install_boot
                ),
            }
        }
        if let Some(prefix) = props.get(PREFIX_KEY).map(|p| p.trim()) {
            if prefix.is_empty() {
                warn!("Ignoring empty {}", PREFIX_KEY);
            } else {
                config.install_prefix = prefix.to_string();
            }
        }
        config.modules_dir = non_empty(props, MODULES_KEY).map(PathBuf::from);
        if let Some(value) = non_empty(props, DEPLOYMENT_KEY) {
            config.deployment = DeploymentKind::parse(value);
            if config.deployment.is_none() {
                warn!("Unknown {}={:?}", DEPLOYMENT_KEY, value);
            }
        }
        if let Some(value) = non_empty(props, CLASSPATH_KEY) {
            config.classpath = std::env::split_paths(value).collect();
        }
        config.boot_dir = non_empty(props, BOOT_DIR_KEY).map(PathBuf::from);

        config
    }

    /// Storage directory: [`STORAGE_ENV`] if set, else `explicit`, else
    /// `~/.strata/storage`.
    pub fn storage_dir(explicit: Option<&Path>) -> PathBuf {
        if let Ok(dir) = std::env::var(STORAGE_ENV) {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }
        if let Some(dir) = explicit {
            return dir.to_path_buf();
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_STORAGE_DIR)
    }
}

fn non_empty<'a>(props: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    props
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
