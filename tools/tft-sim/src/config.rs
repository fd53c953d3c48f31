//! Simulator configuration (tft-sim.toml)
//!
//! Holds the panel description consumed by the engine and the demo loop
//! settings. Every key is optional; missing keys take the Waveshare 3.2"
//! defaults.

use anyhow::{Context, Result};
use ili9340_display::PanelConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::sim::DemoOptions;

/// Parsed simulator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub panel: PanelConfig,
    pub demo: DemoOptions,
}

impl SimConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Load `path` if given, otherwise use the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate configuration content
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.panel.validate()?;
        Ok(config)
    }

    /// Render as a commented TOML file
    pub fn generate(&self) -> Result<String> {
        let body = toml::to_string_pretty(self).context("Failed to serialize config")?;
        Ok(format!(
            "# tft-sim configuration\n\
             #\n\
             # panel.rotation accepts 0-3 or 0/90/180/270 degrees.\n\
             # panel.max_chunk is the largest single SPI write in bytes.\n\
             \n{}",
            body
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ili9340_display::Rotation;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_partial_config() {
        let content = r#"
[panel]
rotation = 90
max_chunk = 4096

[demo]
ticks = 20
"#;
        let config = SimConfig::parse(content).unwrap();

        assert_eq!(config.panel.rotation, Rotation::Deg90);
        assert_eq!(config.panel.max_chunk, 4096);
        assert_eq!(config.panel.native_width, 240);
        assert_eq!(config.demo.ticks, 20);
        assert_eq!(config.demo.producer_every, DemoOptions::default().producer_every);
    }

    #[test]
    fn test_parse_rotation_index() {
        let config = SimConfig::parse("[panel]\nrotation = 3\n").unwrap();
        assert_eq!(config.panel.rotation, Rotation::Deg270);
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        assert!(SimConfig::parse("[panel]\nrotation = 45\n").is_err());
        assert!(SimConfig::parse("[panel]\nmax_chunk = 0\n").is_err());
        assert!(SimConfig::parse("[panel.spi]\nmode = 7\n").is_err());
    }

    #[test]
    fn test_generated_config_parses_back() {
        let config = SimConfig::default();
        let text = config.generate().unwrap();
        assert!(text.starts_with("# tft-sim configuration"));
        assert_eq!(SimConfig::parse(&text).unwrap(), config);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[panel]\nnative_width = 128\nnative_height = 160").unwrap();

        let config = SimConfig::load(file.path()).unwrap();
        assert_eq!(config.panel.dimensions(), (128, 160));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SimConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
