//! In-memory bus that records every operation
//!
//! Used by the unit tests and by host tooling that wants to inspect the
//! exact byte stream the engine produces. Writes are classified as commands
//! or data from the level of the data/command line at the time of the write,
//! the same way the controller sees them.

use super::{BusError, ControlLine, DisplayBus, Level};

/// One recorded bus operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    /// Byte written while data/command was low
    Command(u8),
    /// Payload written while data/command was high
    Data(Vec<u8>),
    /// Control line change
    Line(ControlLine, Level),
    /// Delay request in milliseconds
    Delay(u32),
}

/// Recording bus
#[derive(Debug, Default)]
pub struct RecordingBus {
    ops: Vec<BusOp>,
    data_command: Option<Level>,
    writes: usize,
    write_limit: Option<usize>,
    fail_after: Option<usize>,
}

impl RecordingBus {
    /// Create an empty recording bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes larger than `limit` bytes with [`BusError::TooLarge`]
    pub fn with_write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }

    /// Fail every write after the first `writes` succeeded
    pub fn fail_after_writes(mut self, writes: usize) -> Self {
        self.fail_after = Some(self.writes + writes);
        self
    }

    /// Stop injecting write failures
    pub fn heal(&mut self) {
        self.fail_after = None;
    }

    /// Recorded operations in call order
    pub fn ops(&self) -> &[BusOp] {
        &self.ops
    }

    /// Drain the recorded operations, keeping line state and counters
    pub fn take_ops(&mut self) -> Vec<BusOp> {
        std::mem::take(&mut self.ops)
    }

    /// Number of successful write calls (commands and data)
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// All command bytes in call order
    pub fn commands(&self) -> Vec<u8> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                BusOp::Command(cmd) => Some(*cmd),
                _ => None,
            })
            .collect()
    }

    /// All data payloads in call order
    pub fn data_writes(&self) -> Vec<&[u8]> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                BusOp::Data(bytes) => Some(bytes.as_slice()),
                _ => None,
            })
            .collect()
    }

    /// Data payloads that follow the first occurrence of `cmd`, up to the next command
    pub fn payload_after(&self, cmd: u8) -> Vec<&[u8]> {
        self.ops
            .iter()
            .skip_while(|op| **op != BusOp::Command(cmd))
            .skip(1)
            .take_while(|op| !matches!(op, BusOp::Command(_)))
            .filter_map(|op| match op {
                BusOp::Data(bytes) => Some(bytes.as_slice()),
                _ => None,
            })
            .collect()
    }
}

impl DisplayBus for RecordingBus {
    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        if let Some(limit) = self.write_limit {
            if bytes.len() > limit {
                return Err(BusError::TooLarge {
                    len: bytes.len(),
                    limit,
                });
            }
        }
        if let Some(fail_after) = self.fail_after {
            if self.writes >= fail_after {
                return Err(BusError::Timeout);
            }
        }

        self.writes += 1;
        match self.data_command {
            Some(Level::Low) => self
                .ops
                .extend(bytes.iter().map(|&cmd| BusOp::Command(cmd))),
            _ => self.ops.push(BusOp::Data(bytes.to_vec())),
        }
        Ok(())
    }

    fn set_control_line(&mut self, line: ControlLine, level: Level) -> Result<(), BusError> {
        if line == ControlLine::DataCommand {
            self.data_command = Some(level);
        }
        self.ops.push(BusOp::Line(line, level));
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.ops.push(BusOp::Delay(ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_by_data_command_level() {
        let mut bus = RecordingBus::new();
        bus.set_control_line(ControlLine::DataCommand, Level::Low).unwrap();
        bus.write(&[0x2A]).unwrap();
        bus.set_control_line(ControlLine::DataCommand, Level::High).unwrap();
        bus.write(&[0x00, 0x01]).unwrap();

        assert_eq!(bus.commands(), vec![0x2A]);
        assert_eq!(bus.data_writes(), vec![&[0x00u8, 0x01][..]]);
        assert_eq!(bus.write_count(), 2);
    }

    #[test]
    fn test_write_limit() {
        let mut bus = RecordingBus::new().with_write_limit(4);
        assert!(bus.write(&[0; 4]).is_ok());
        assert_eq!(
            bus.write(&[0; 5]),
            Err(BusError::TooLarge { len: 5, limit: 4 })
        );
        assert_eq!(bus.write_count(), 1);
    }

    #[test]
    fn test_fault_injection() {
        let mut bus = RecordingBus::new().fail_after_writes(1);
        assert!(bus.write(&[1]).is_ok());
        assert_eq!(bus.write(&[2]), Err(BusError::Timeout));

        bus.heal();
        assert!(bus.write(&[3]).is_ok());
    }

    #[test]
    fn test_payload_after() {
        let mut bus = RecordingBus::new();
        bus.set_control_line(ControlLine::DataCommand, Level::Low).unwrap();
        bus.write(&[0x2C]).unwrap();
        bus.set_control_line(ControlLine::DataCommand, Level::High).unwrap();
        bus.write(&[1, 2]).unwrap();
        bus.write(&[3]).unwrap();
        bus.set_control_line(ControlLine::DataCommand, Level::Low).unwrap();
        bus.write(&[0x29]).unwrap();

        assert_eq!(bus.payload_after(0x2C), vec![&[1u8, 2][..], &[3u8][..]]);
        assert!(bus.payload_after(0x2A).is_empty());
    }
}
