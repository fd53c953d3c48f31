//! Bus collaborator interface
//!
//! The transfer engine never opens devices itself. Whoever owns the SPI
//! device and the two GPIO control lines implements [`DisplayBus`] and hands
//! the value to [`Display`](crate::display::Display), which drives it from a
//! single thread of control.
//!
//! - [`gpio`]: control line identifiers and levels
//! - [`spi`]: bus settings and the per-transfer size limit
//! - [`recording`]: an in-memory bus that records every operation

pub mod gpio;
pub mod recording;
pub mod spi;

pub use gpio::{ControlLine, Level};
pub use recording::{BusOp, RecordingBus};
pub use spi::{SpiConfig, DEFAULT_MAX_CHUNK};

use thiserror::Error;

/// Interface the engine consumes to talk to the panel.
pub trait DisplayBus {
    /// Write `bytes` in a single blocking transfer.
    ///
    /// Implementations may reject transfers above their burst limit; the
    /// engine splits large payloads before calling this.
    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError>;

    /// Drive a control line to `level`.
    fn set_control_line(&mut self, line: ControlLine, level: Level) -> Result<(), BusError>;

    /// Block for `ms` milliseconds. Only used by the bring-up sequence.
    fn delay_ms(&mut self, ms: u32);
}

impl<B: DisplayBus + ?Sized> DisplayBus for &mut B {
    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        B::write(self, bytes)
    }

    fn set_control_line(&mut self, line: ControlLine, level: Level) -> Result<(), BusError> {
        B::set_control_line(self, line, level)
    }

    fn delay_ms(&mut self, ms: u32) {
        B::delay_ms(self, ms)
    }
}

/// Failures reported by a bus collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("bus write timed out")]
    Timeout,
    #[error("device did not acknowledge the transfer")]
    Nak,
    #[error("device disconnected")]
    Disconnected,
    #[error("transfer of {len} bytes exceeds the bus limit of {limit} bytes")]
    TooLarge { len: usize, limit: usize },
    #[error("control line {0:?} could not be driven")]
    ControlLine(ControlLine),
    #[error("bus I/O error: {0}")]
    Io(String),
}
