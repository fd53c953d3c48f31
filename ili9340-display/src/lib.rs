//! SPI transfer engine for ILI9340 TFT panels
//!
//! Turns drawing calls into the smallest practical set of windowed SPI
//! transfers for an ILI9340-class controller attached to a single-board
//! computer.
//!
//! # Architecture
//!
//! ```text
//!  producer (draw calls)          consumer (tick)
//!     │            │                    │
//!     ▼            ▼                    ▼
//! ┌──────────┐ ┌─────────────┐   ┌──────────────┐
//! │DrawQueue │ │ FrameBuffer │──▶│   Display    │
//! │  (FIFO)  │ │ (ScanLines) │   │ drain/flush  │
//! └────┬─────┘ └─────────────┘   └──────┬───────┘
//!      └────────────────────────────────┤
//!                                       ▼
//!                                ┌─────────────┐
//!                                │   Ili9340   │  CASET/PASET/RAMWR
//!                                └──────┬──────┘
//!                                       ▼
//!                                ┌─────────────┐
//!                                │ DisplayBus  │  chunked writes, DC/RST
//!                                └─────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use ili9340_display::{Display, PanelConfig, RecordingBus, Rgb565};
//!
//! let mut display = Display::new(RecordingBus::new(), PanelConfig::default()).unwrap();
//! display.fill_rect(230, 0, 50, 10, Rgb565::WHITE);
//! while display.drain_one().unwrap() {}
//! assert_eq!(display.bus().data_writes().last().unwrap().len(), 200);
//! ```

pub mod display;
pub mod hal;

// Re-export main types
pub use display::{
    Display, DisplayError, DrawInstruction, FrameBuffer, PanelConfig, Rect, Rgb565, Rotation,
};
pub use hal::{BusError, BusOp, ControlLine, DisplayBus, Level, RecordingBus};
