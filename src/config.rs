//! Configuration management for pointwarp

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::points::{ControlPair, PointStore};
use crate::transform::WarpParams;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub warp: WarpParams,

    /// Control point pairs applied on every run
    #[serde(default)]
    pub points: Vec<ControlPair>,
}

impl Config {
    /// Load configuration from a file, or fall back to defaults if it doesn't exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?;
            tracing::info!(
                "Loaded configuration from {:?} ({} control pairs)",
                path,
                config.points.len()
            );
            Ok(config)
        } else {
            tracing::debug!("No configuration at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn point_store(&self) -> PointStore {
        PointStore::from_pairs(&self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::Point;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.warp.kernel_scale, 20000.0);
        assert_eq!(config.warp.alpha, 1.0);
        assert_eq!(config.warp.background, [255, 255, 255]);
        assert!(config.points.is_empty());
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [warp]
            alpha = 0.5

            [[points]]
            source = { x = 2.0, y = 2.0 }
            target = { x = 0.0, y = 0.0 }
            "#,
        )
        .unwrap();

        assert_eq!(config.warp.alpha, 0.5);
        assert_eq!(config.warp.kernel_scale, 20000.0);
        assert_eq!(config.points.len(), 1);
        assert_eq!(config.points[0].source, Point::new(2.0, 2.0));

        let store = config.point_store();
        assert_eq!(store.len(), 1);
        assert!(store.is_complete());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("warp.toml");

        let mut config = Config::default();
        config.warp.kernel_scale = 5000.0;
        config.points.push(ControlPair::new(Point::new(1.0, 2.0), Point::new(3.5, 4.0)));
        config.save(&path).unwrap();

        let loaded = Config::load_or_default(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = Config::load_or_default(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(!path.exists());
    }

    #[test]
    fn test_malformed_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[warp]\nalpha = \"lots\"\n").unwrap();
        assert!(Config::load_or_default(&path).is_err());
    }
}
