use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::config::AppConfig;

/// Config file name inside the data directory
pub const CONFIG_FILE: &str = "momentum.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("could not determine a data directory; pass -C or set MOMENTUM_HOME")]
    NoDataDir,
}

/// Read `momentum.toml` from the data directory. A missing file yields defaults.
pub fn read_config(data_dir: &Path) -> Result<AppConfig, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(e) => return Err(ConfigError::ReadError { path, source: e }),
    };
    toml::from_str(&text).map_err(|e| ConfigError::ParseError { path, source: e })
}

/// Pick the data directory: explicit flag, then `MOMENTUM_HOME`, then the
/// platform data directory (`$XDG_DATA_HOME` or its default on Linux).
pub fn resolve_data_dir(flag: Option<&Path>) -> Result<PathBuf, ConfigError> {
    resolve_data_dir_with(flag, |name| std::env::var(name).ok(), dirs::data_dir())
}

fn resolve_data_dir_with(
    flag: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
    platform: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = flag {
        return Ok(dir.to_path_buf());
    }
    if let Some(home) = env("MOMENTUM_HOME").filter(|v| !v.trim().is_empty()) {
        return Ok(PathBuf::from(home));
    }
    platform
        .map(|dir| dir.join("momentum"))
        .ok_or(ConfigError::NoDataDir)
}
