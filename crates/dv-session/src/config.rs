//! Loading `delve.toml`

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use dv_core::config::DelveConfig;

pub const CONFIG_FILE: &str = "delve.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Places a config file is looked for, most specific first
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("delve").join(CONFIG_FILE));
    }
    paths
}

/// Read one config file. A missing file gives the defaults; an unreadable or
/// malformed one is an error.
pub fn load_config(path: &Path) -> Result<DelveConfig, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(DelveConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "loaded config");
    Ok(config)
}

/// First config found along [`search_paths`], or the defaults
pub fn discover_config() -> Result<DelveConfig, ConfigError> {
    match search_paths().into_iter().find(|p| p.exists()) {
        Some(path) => load_config(&path),
        None => Ok(DelveConfig::default()),
    }
}

pub fn parse_config(text: &str) -> Result<DelveConfig, toml::de::Error> {
    toml::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(parse_config("").unwrap(), DelveConfig::default());
    }

    #[test]
    fn sections_override_defaults() {
        let text = r#"
            [fog]
            radius = 2

            [encounters]
            random_move_chance = 0.5
            weights = { trap = 1.0, battle = 0.0, event = 0.0 }

            [save]
            auto_save_minutes = 1
            compress = true
        "#;
        let config = parse_config(text).unwrap();
        assert_eq!(config.fog.radius, 2);
        assert!(config.fog.enabled);
        assert_eq!(config.encounters.random_move_chance, 0.5);
        assert_eq!(config.encounters.weights.battle, 0.0);
        assert_eq!(config.encounters.cooldown_secs, 60);
        assert_eq!(config.save.auto_save_minutes, 1);
        assert!(config.save.compress);
        assert_eq!(config.render.cell_size, 32);
    }

    #[test]
    fn missing_file_is_default() {
        let path = std::env::temp_dir().join("delve_no_such_config.toml");
        assert_eq!(load_config(&path).unwrap(), DelveConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("delve_bad_{}.toml", std::process::id()));
        std::fs::write(&path, "[fog\nradius = ").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));
        std::fs::remove_file(&path).ok();
    }
}
