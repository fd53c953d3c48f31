//! Control lines driven alongside the SPI bus
//!
//! # Pin Assignments (Waveshare 3.2" on a Raspberry Pi header)
//!
//! | GPIO | Function      | Direction |
//! |------|---------------|-----------|
//! | 22   | DC (Data/Cmd) | Output    |
//! | 27   | RST (Reset)   | Output    |

use serde::{Deserialize, Serialize};

/// Control lines owned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlLine {
    /// Data/Command select: low for commands, high for data
    DataCommand,
    /// Hardware reset, active low
    Reset,
}

impl ControlLine {
    /// Default BCM GPIO number for this line
    pub const fn default_pin(self) -> u8 {
        match self {
            ControlLine::DataCommand => 22,
            ControlLine::Reset => 27,
        }
    }
}

/// Logic level of a control line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Level of the data/command line for a command (`false`) or data (`true`) write
    pub const fn for_data(is_data: bool) -> Self {
        if is_data {
            Level::High
        } else {
            Level::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pins() {
        assert_eq!(ControlLine::DataCommand.default_pin(), 22);
        assert_eq!(ControlLine::Reset.default_pin(), 27);
    }

    #[test]
    fn test_data_command_levels() {
        assert_eq!(Level::for_data(true), Level::High);
        assert_eq!(Level::for_data(false), Level::Low);
    }
}
