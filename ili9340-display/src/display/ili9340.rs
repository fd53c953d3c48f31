//! ILI9340 LCD Controller Driver
//!
//! Wire protocol for the ILI9340/ILI9341 TFT controller found on the
//! Waveshare 3.2" and Adafruit 2.2"/2.8" SPI panels.
//!
//! Every command byte is written with the data/command line low and every
//! parameter or pixel payload with it high. Pixel payloads are split into
//! bursts no larger than the configured chunk size.

use byteorder::{BigEndian, ByteOrder};
use log::{info, trace};
use thiserror::Error;

use super::framebuffer::{serialize_pixels, Rgb565};
use super::rotation::Rotation;
use crate::hal::{BusError, ControlLine, DisplayBus, Level};

/// ILI9340 commands
#[allow(dead_code)]
pub mod cmd {
    pub const NOP: u8 = 0x00;
    pub const SWRESET: u8 = 0x01;
    pub const SLPOUT: u8 = 0x11;
    pub const INVOFF: u8 = 0x20; // Display inversion off
    pub const INVON: u8 = 0x21; // Display inversion on
    pub const GAMMASET: u8 = 0x26;
    pub const DISPOFF: u8 = 0x28;
    pub const DISPON: u8 = 0x29;
    pub const CASET: u8 = 0x2A; // Column address set
    pub const PASET: u8 = 0x2B; // Page address set
    pub const RAMWR: u8 = 0x2C; // Memory write
    pub const MADCTL: u8 = 0x36; // Memory access control
    pub const PIXFMT: u8 = 0x3A; // Pixel format
    pub const FRMCTR1: u8 = 0xB1; // Frame rate control
    pub const DFUNCTR: u8 = 0xB6; // Display function control
    pub const PWCTR1: u8 = 0xC0;
    pub const PWCTR2: u8 = 0xC1;
    pub const VMCTR1: u8 = 0xC5;
    pub const VMCTR2: u8 = 0xC7;
    pub const PWCTRA: u8 = 0xCB; // Power control A
    pub const PWCTRB: u8 = 0xCF; // Power control B
    pub const GMCTRP1: u8 = 0xE0; // Positive gamma correction
    pub const GMCTRN1: u8 = 0xE1; // Negative gamma correction
    pub const DTCTRA: u8 = 0xE8; // Driver timing control A
    pub const DTCTRB: u8 = 0xEA; // Driver timing control B
    pub const PWRSEQ: u8 = 0xED; // Power on sequence control
    pub const UNDOC_EF: u8 = 0xEF;
    pub const EN3GAM: u8 = 0xF2; // Enable 3-gamma
    pub const PUMPCTR: u8 = 0xF7; // Pump ratio control
}

/// Power, VCOM and timing registers, sent before the orientation
const POWER_SEQUENCE: &[(u8, &[u8])] = &[
    (cmd::UNDOC_EF, &[0x03, 0x80, 0x02]),
    (cmd::PWCTRA, &[0x39, 0x2C, 0x00, 0x34, 0x02]),
    (cmd::PWCTRB, &[0x00, 0xC1, 0x30]),
    (cmd::DTCTRA, &[0x85, 0x00, 0x78]),
    (cmd::DTCTRB, &[0x00, 0x00]),
    (cmd::PWRSEQ, &[0x64, 0x03, 0x12, 0x81]),
    (cmd::PUMPCTR, &[0x20]),
    (cmd::PWCTR1, &[0x23]),
    (cmd::PWCTR2, &[0x10]),
    (cmd::VMCTR1, &[0x3E, 0x28]),
    (cmd::VMCTR2, &[0x86]),
];

/// Pixel format, frame rate and gamma, sent after the orientation
const PANEL_SEQUENCE: &[(u8, &[u8])] = &[
    (cmd::PIXFMT, &[0x55]), // 16 bits per pixel
    (cmd::FRMCTR1, &[0x00, 0x18]), // fosc, 79 Hz
    (cmd::DFUNCTR, &[0x08, 0x82, 0x27]),
    (cmd::EN3GAM, &[0x00]),
    (cmd::GAMMASET, &[0x01]),
    (
        cmd::GMCTRP1,
        &[
            0x0F, 0x31, 0x2B, 0x0C, 0x0E, 0x08, 0x4E, 0xF1, 0x37, 0x07, 0x10, 0x03, 0x0E, 0x09,
            0x00,
        ],
    ),
    (
        cmd::GMCTRN1,
        &[
            0x00, 0x0E, 0x14, 0x03, 0x11, 0x07, 0x31, 0xC1, 0x48, 0x08, 0x0F, 0x0C, 0x31, 0x36,
            0x0F,
        ],
    ),
];

/// Display errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    #[error("bus transfer failed: {0}")]
    Bus(#[from] BusError),
    #[error("address window ({x1}, {y1})-({x2}, {y2}) is outside the {width}x{height} panel")]
    InvalidWindow {
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
        width: u16,
        height: u16,
    },
    #[error("invalid panel configuration: {0}")]
    InvalidConfig(String),
}

/// ILI9340 driver
pub struct Ili9340<B> {
    bus: B,
    max_chunk: usize,
}

impl<B: DisplayBus> Ili9340<B> {
    /// Create a driver that splits payloads into bursts of at most `max_chunk` bytes
    pub fn new(bus: B, max_chunk: usize) -> Self {
        Self {
            bus,
            max_chunk: max_chunk.max(1),
        }
    }

    /// Largest payload handed to a single bus write
    pub fn max_chunk(&self) -> usize {
        self.max_chunk
    }

    /// Bus collaborator
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutable access to the bus collaborator
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Give the bus back to its owner
    pub fn release(self) -> B {
        self.bus
    }

    /// Hardware reset through the reset line
    pub fn hardware_reset(&mut self) -> Result<(), DisplayError> {
        self.bus.set_control_line(ControlLine::Reset, Level::Low)?;
        self.bus.delay_ms(1);
        self.bus.set_control_line(ControlLine::Reset, Level::High)?;
        // At least 100 ms before the first command
        self.bus.delay_ms(100);
        Ok(())
    }

    /// Reset and configure the panel, leaving it on in `rotation`
    pub fn init(&mut self, rotation: Rotation) -> Result<(), DisplayError> {
        info!("initializing ILI9340 ({:?})", rotation);
        self.hardware_reset()?;

        for (command, args) in POWER_SEQUENCE {
            self.command(*command, args)?;
        }
        self.set_rotation(rotation)?;
        for (command, args) in PANEL_SEQUENCE {
            self.command(*command, args)?;
        }

        self.send_command(cmd::SLPOUT)?;
        self.bus.delay_ms(120);
        self.send_command(cmd::DISPON)?;
        info!("ILI9340 ready");
        Ok(())
    }

    /// Write a single command byte
    pub fn send_command(&mut self, command: u8) -> Result<(), DisplayError> {
        self.bus
            .set_control_line(ControlLine::DataCommand, Level::for_data(false))?;
        self.bus.write(&[command])?;
        Ok(())
    }

    /// Write a parameter or pixel payload, chunked
    pub fn send_data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        if data.is_empty() {
            return Ok(());
        }
        self.bus
            .set_control_line(ControlLine::DataCommand, Level::for_data(true))?;
        self.transfer_chunked(data, self.max_chunk)
    }

    /// Command followed by its parameters
    pub fn command(&mut self, command: u8, args: &[u8]) -> Result<(), DisplayError> {
        self.send_command(command)?;
        self.send_data(args)
    }

    /// One bus write per slice of at most `max_chunk` bytes, in order
    pub fn transfer_chunked(&mut self, bytes: &[u8], max_chunk: usize) -> Result<(), DisplayError> {
        let max_chunk = max_chunk.max(1);
        for (index, chunk) in bytes.chunks(max_chunk).enumerate() {
            trace!(
                "data.len={} skip={} take={}",
                bytes.len(),
                index * max_chunk,
                chunk.len()
            );
            self.bus.write(chunk)?;
        }
        Ok(())
    }

    /// Set the drawing window and start a memory write
    ///
    /// Coordinates are inclusive and must already lie on the panel.
    pub fn set_address_window(
        &mut self,
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
    ) -> Result<(), DisplayError> {
        debug_assert!(x1 <= x2 && y1 <= y2, "inverted address window");

        let mut columns = [0u8; 4];
        BigEndian::write_u16(&mut columns[..2], x1);
        BigEndian::write_u16(&mut columns[2..], x2);
        self.command(cmd::CASET, &columns)?;

        let mut pages = [0u8; 4];
        BigEndian::write_u16(&mut pages[..2], y1);
        BigEndian::write_u16(&mut pages[2..], y2);
        self.command(cmd::PASET, &pages)?;

        self.send_command(cmd::RAMWR)
    }

    /// Serialize colors high byte first and stream them to the current window
    pub fn send_pixel_run(&mut self, colors: &[Rgb565]) -> Result<(), DisplayError> {
        self.send_data(&serialize_pixels(colors))
    }

    /// Send the memory access control byte for `rotation`
    pub fn set_rotation(&mut self, rotation: Rotation) -> Result<(), DisplayError> {
        self.command(cmd::MADCTL, &[rotation.madctl()])
    }

    /// Toggle display inversion
    pub fn invert(&mut self, on: bool) -> Result<(), DisplayError> {
        self.send_command(if on { cmd::INVON } else { cmd::INVOFF })
    }
}
