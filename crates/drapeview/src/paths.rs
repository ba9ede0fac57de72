use std::env;
use std::path::{Path, PathBuf};

use directories_next::ProjectDirs;
use tracing::debug;

pub const ENV_CONFIG_DIR: &str = "DRAPEVIEW_CONFIG_DIR";
pub const CONFIG_FILE: &str = "drapeview.toml";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Drapeview";
const APPLICATION: &str = "drapeview";

/// Where the configuration file was found, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLocation {
    /// Given with `--config`; must exist.
    Explicit(PathBuf),
    /// Found in the environment override or platform config directory.
    Discovered(PathBuf),
    /// Nothing on disk; built-in defaults apply.
    Defaults,
}

impl ConfigLocation {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigLocation::Explicit(path) | ConfigLocation::Discovered(path) => Some(path),
            ConfigLocation::Defaults => None,
        }
    }
}

/// Resolves the configuration file: `--config`, then
/// `$DRAPEVIEW_CONFIG_DIR/drapeview.toml`, then the platform config directory.
pub fn locate_config(explicit: Option<&Path>) -> ConfigLocation {
    if let Some(path) = explicit {
        return ConfigLocation::Explicit(path.to_path_buf());
    }
    for dir in config_dirs() {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return ConfigLocation::Discovered(candidate);
        }
        debug!(path = %candidate.display(), "no configuration file");
    }
    ConfigLocation::Defaults
}

fn config_dirs() -> Vec<PathBuf> {
    if let Some(dir) = env::var_os(ENV_CONFIG_DIR).filter(|value| !value.is_empty()) {
        return vec![PathBuf::from(dir)];
    }
    ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
        .map(|dirs| vec![dirs.config_dir().to_path_buf()])
        .unwrap_or_default()
}
