//! SPI bus settings for the display
//!
//! The bus itself is opened by the owner of the [`DisplayBus`](super::DisplayBus)
//! implementation. These settings describe what the panel expects so the
//! owner can configure the device, and how large a single transfer may be.

use serde::{Deserialize, Serialize};

/// Largest payload handed to a single bus write by default.
///
/// Full-screen fills are 153,600 bytes on a 240×320 panel, well above what
/// the SBC SPI drivers accept in one transfer.
pub const DEFAULT_MAX_CHUNK: usize = 50_000;

/// SPI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiConfig {
    /// SPI controller chip select line
    pub chip_select: u8,
    /// Clock frequency in Hz
    pub clock_hz: u32,
    /// SPI mode (0-3)
    pub mode: u8,
}

impl SpiConfig {
    /// 48 MHz, mode 0, CS0
    pub const DISPLAY: Self = Self {
        chip_select: 0,
        clock_hz: 48_000_000,
        mode: 0,
    };

    /// Check that the mode is one of the four SPI modes
    pub fn is_valid(&self) -> bool {
        self.mode <= 3 && self.clock_hz > 0
    }
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self::DISPLAY
    }
}

/// Number of bus writes needed to send `len` bytes in bursts of `max_chunk`
pub fn chunk_count(len: usize, max_chunk: usize) -> usize {
    len.div_ceil(max_chunk.max(1))
}
