//! Panel configuration

use serde::{Deserialize, Serialize};

use super::ili9340::DisplayError;
use super::rotation::Rotation;
use crate::hal::{SpiConfig, DEFAULT_MAX_CHUNK};

/// Static description of the attached panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Width in pixels at 0° rotation
    pub native_width: u16,
    /// Height in pixels at 0° rotation
    pub native_height: u16,
    /// Orientation applied at bring-up
    pub rotation: Rotation,
    /// Largest single bus write in bytes
    pub max_chunk: usize,
    /// Bus settings for whoever opens the SPI device
    pub spi: SpiConfig,
}

impl PanelConfig {
    /// Waveshare 3.2" (ILI9340, 240×320)
    pub const WAVESHARE_32B: Self = Self {
        native_width: 240,
        native_height: 320,
        rotation: Rotation::Deg0,
        max_chunk: DEFAULT_MAX_CHUNK,
        spi: SpiConfig::DISPLAY,
    };

    /// Effective `(width, height)` in the configured rotation
    pub fn dimensions(&self) -> (u16, u16) {
        self.rotation
            .dimensions(self.native_width, self.native_height)
    }

    /// Reject configurations the engine cannot drive
    pub fn validate(&self) -> Result<(), DisplayError> {
        if self.native_width == 0 || self.native_height == 0 {
            return Err(DisplayError::InvalidConfig(format!(
                "panel dimensions must be non-zero, got {}x{}",
                self.native_width, self.native_height
            )));
        }
        if self.max_chunk == 0 {
            return Err(DisplayError::InvalidConfig(
                "max_chunk must be at least one byte".to_string(),
            ));
        }
        if !self.spi.is_valid() {
            return Err(DisplayError::InvalidConfig(format!(
                "unsupported SPI settings: mode {} at {} Hz",
                self.spi.mode, self.spi.clock_hz
            )));
        }
        Ok(())
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::WAVESHARE_32B
    }
}
