//! Display transfer engine
//!
//! [`Display`] owns the controller, the draw queue and the frame buffer for
//! one panel. Two update paths are supported:
//!
//! - **Queue path**: draw primitives clip, serialize and enqueue one
//!   [`DrawInstruction`]; [`Display::drain_one`] sends the oldest one.
//! - **Frame buffer path**: [`Display::set_pixel`] and friends write into the
//!   [`FrameBuffer`]; [`Display::flush`] sends the bounding rectangle of
//!   everything that changed.
//!
//! Pick one path per rotation epoch. Nothing orders the two against each
//! other on the panel.
//!
//! The engine is driven from a single thread of control. A producer calls
//! the drawing methods, a consumer calls `drain_one`/`flush` at its own
//! cadence; both go through `&mut Display`.

pub mod config;
pub mod framebuffer;
pub mod ili9340;
pub mod queue;
pub mod rotation;

pub use config::PanelConfig;
pub use framebuffer::{DirtyRegion, FrameBuffer, Rgb565, ScanLine};
pub use ili9340::{DisplayError, Ili9340};
pub use queue::{DrawInstruction, DrawQueue, Rect};
pub use rotation::Rotation;

use log::{debug, info};

use crate::hal::spi::chunk_count;
use crate::hal::DisplayBus;

/// High-level display interface
pub struct Display<B> {
    controller: Ili9340<B>,
    config: PanelConfig,
    rotation: Rotation,
    width: u16,
    height: u16,
    queue: DrawQueue,
    framebuffer: FrameBuffer,
}

impl<B: DisplayBus> Display<B> {
    /// Create a display instance in the configured rotation.
    ///
    /// Nothing is sent to the panel until [`init`](Self::init) or a drawing
    /// call is drained.
    pub fn new(bus: B, config: PanelConfig) -> Result<Self, DisplayError> {
        config.validate()?;
        let rotation = config.rotation;
        let (width, height) = config.dimensions();

        Ok(Self {
            controller: Ili9340::new(bus, config.max_chunk),
            config,
            rotation,
            width,
            height,
            queue: DrawQueue::new(),
            framebuffer: FrameBuffer::new(width, height),
        })
    }

    /// Reset and configure the panel in the current rotation
    pub fn init(&mut self) -> Result<(), DisplayError> {
        self.controller.init(self.rotation)
    }

    /// Effective width in the current rotation
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Effective height in the current rotation
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Current orientation
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Panel configuration the display was created with
    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Bus collaborator
    pub fn bus(&self) -> &B {
        self.controller.bus()
    }

    /// Mutable access to the bus collaborator
    pub fn bus_mut(&mut self) -> &mut B {
        self.controller.bus_mut()
    }

    /// Number of queued instructions
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Payload bytes waiting in the queue
    pub fn pending_bytes(&self) -> usize {
        self.queue.pending_bytes()
    }

    /// Queued instructions, oldest first
    pub fn pending_instructions(&self) -> impl Iterator<Item = &DrawInstruction> {
        self.queue.iter()
    }

    // ------------------------------------------------------------------
    // Queue path
    // ------------------------------------------------------------------

    /// Fill a rectangle. Off-panel or empty rectangles are dropped.
    ///
    /// Returns true if an instruction was enqueued.
    pub fn fill_rect(&mut self, x: u16, y: u16, w: u16, h: u16, color: Rgb565) -> bool {
        let Some(rect) = self.clip(x, y, w, h) else {
            return false;
        };
        self.queue.enqueue(DrawInstruction::solid(rect, color));
        true
    }

    /// Draw a single pixel
    pub fn draw_pixel(&mut self, x: u16, y: u16, color: Rgb565) -> bool {
        self.fill_rect(x, y, 1, 1, color)
    }

    /// Draw a horizontal line of width `w`
    pub fn draw_hline(&mut self, x: u16, y: u16, w: u16, color: Rgb565) -> bool {
        self.fill_rect(x, y, w, 1, color)
    }

    /// Draw a vertical line of height `h`
    pub fn draw_vline(&mut self, x: u16, y: u16, h: u16, color: Rgb565) -> bool {
        self.fill_rect(x, y, 1, h, color)
    }

    /// Fill the whole panel
    pub fn fill_screen(&mut self, color: Rgb565) -> bool {
        self.fill_rect(0, 0, self.width, self.height, color)
    }

    /// Same as [`fill_screen`](Self::fill_screen)
    pub fn clear_screen(&mut self, color: Rgb565) -> bool {
        self.fill_screen(color)
    }

    /// Enqueue a row-major block of `w * h` pixels (glyphs, sprites),
    /// cropped to the panel like a fill.
    ///
    /// # Panics
    ///
    /// Panics if `pixels.len() != w * h`.
    pub fn draw_block(&mut self, x: u16, y: u16, w: u16, h: u16, pixels: &[Rgb565]) -> bool {
        assert_eq!(pixels.len(), w as usize * h as usize, "block size mismatch");
        let Some(rect) = self.clip(x, y, w, h) else {
            return false;
        };

        let instruction = if rect.w == w && rect.h == h {
            DrawInstruction::from_pixels(rect, pixels)
        } else {
            let visible: Vec<Rgb565> = pixels
                .chunks(w as usize)
                .take(rect.h as usize)
                .flat_map(|row| &row[..rect.w as usize])
                .copied()
                .collect();
            DrawInstruction::from_pixels(rect, &visible)
        };
        self.queue.enqueue(instruction);
        true
    }

    /// Enqueue a pre-built instruction.
    ///
    /// Instructions that do not fit the panel in the current rotation are
    /// dropped; returns true if it was queued.
    pub fn enqueue(&mut self, instruction: DrawInstruction) -> bool {
        if !instruction.rect().fits(self.width, self.height) {
            debug!(
                "dropping instruction {:?} outside {}x{} panel",
                instruction.rect(),
                self.width,
                self.height
            );
            return false;
        }
        self.queue.enqueue(instruction);
        true
    }

    /// Send the oldest queued instruction.
    ///
    /// Returns `Ok(false)` when the queue is empty. A failed transfer is not
    /// requeued.
    pub fn drain_one(&mut self) -> Result<bool, DisplayError> {
        let Some(instruction) = self.queue.dequeue() else {
            return Ok(false);
        };
        let (x1, y1, x2, y2) = instruction.window();
        debug!(
            "drain ({}, {})-({}, {}) {} bytes in {} writes, {} pending",
            x1,
            y1,
            x2,
            y2,
            instruction.data().len(),
            chunk_count(instruction.data().len(), self.controller.max_chunk()),
            self.queue.len()
        );

        self.controller.set_address_window(x1, y1, x2, y2)?;
        self.controller.send_data(instruction.data())?;
        Ok(true)
    }

    /// Drain until the queue is empty; stops at the first bus error.
    ///
    /// Returns the number of instructions sent.
    pub fn drain_all(&mut self) -> Result<usize, DisplayError> {
        let mut sent = 0;
        while self.drain_one()? {
            sent += 1;
        }
        Ok(sent)
    }

    /// Set the controller window directly, checked against the panel
    pub fn set_address_window(
        &mut self,
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
    ) -> Result<(), DisplayError> {
        if x1 > x2 || y1 > y2 || x2 >= self.width || y2 >= self.height {
            return Err(DisplayError::InvalidWindow {
                x1,
                y1,
                x2,
                y2,
                width: self.width,
                height: self.height,
            });
        }
        self.controller.set_address_window(x1, y1, x2, y2)
    }

    /// Stream pixels into the current window
    pub fn send_pixel_run(&mut self, colors: &[Rgb565]) -> Result<(), DisplayError> {
        self.controller.send_pixel_run(colors)
    }

    // ------------------------------------------------------------------
    // Frame buffer path
    // ------------------------------------------------------------------

    /// Write one pixel into the frame buffer
    pub fn set_pixel(&mut self, x: u16, y: u16, color: Rgb565) -> bool {
        self.framebuffer.set_pixel(x, y, color)
    }

    /// Pixel currently held in the frame buffer
    pub fn pixel(&self, x: u16, y: u16) -> Option<Rgb565> {
        self.framebuffer.get_pixel(x, y)
    }

    /// Fill a rectangle in the frame buffer
    pub fn buffer_fill_rect(&mut self, x: u16, y: u16, w: u16, h: u16, color: Rgb565) -> bool {
        self.framebuffer.fill_rect(x, y, w, h, color)
    }

    /// Copy a row-major pixel block into the frame buffer
    pub fn buffer_block(&mut self, x: u16, y: u16, w: u16, h: u16, pixels: &[Rgb565]) -> bool {
        self.framebuffer.write_block(x, y, w, h, pixels)
    }

    /// Frame buffer `(width, height)`; follows the rotation
    pub fn buffer_dimensions(&self) -> (u16, u16) {
        (self.framebuffer.width(), self.framebuffer.height())
    }

    /// Rectangle the next [`flush`](Self::flush) would send
    pub fn dirty_rect(&self) -> Option<Rect> {
        self.framebuffer.dirty_rect()
    }

    /// Send the bounding rectangle of all frame buffer changes.
    ///
    /// Returns the rectangle sent, or `None` without touching the bus when
    /// nothing changed.
    pub fn flush(&mut self) -> Result<Option<Rect>, DisplayError> {
        let Some(region) = self.framebuffer.take_dirty_region() else {
            return Ok(None);
        };
        let (x1, y1, x2, y2) = region.rect.window();
        debug!(
            "flush ({}, {})-({}, {}) {} bytes in {} writes",
            x1,
            y1,
            x2,
            y2,
            region.data.len(),
            chunk_count(region.data.len(), self.controller.max_chunk())
        );

        self.controller.set_address_window(x1, y1, x2, y2)?;
        self.controller.send_data(&region.data)?;
        Ok(Some(region.rect))
    }

    // ------------------------------------------------------------------
    // Panel control
    // ------------------------------------------------------------------

    /// Change orientation.
    ///
    /// Pending instructions address the old coordinate space and are
    /// discarded; the frame buffer is reallocated to the new dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::Bus`] if the MADCTL write fails. The rotation,
    /// dimensions, pending instructions and frame buffer are then left as
    /// they were, so queued work for the old orientation is still pending.
    pub fn rotate(&mut self, rotation: Rotation) -> Result<(), DisplayError> {
        self.controller.set_rotation(rotation)?;

        let (width, height) =
            rotation.dimensions(self.config.native_width, self.config.native_height);
        self.rotation = rotation;
        self.width = width;
        self.height = height;

        let discarded = self.queue.clear();
        self.framebuffer = FrameBuffer::new(width, height);
        info!(
            "rotated to {}° ({}x{}), discarded {} pending instructions",
            rotation.degrees(),
            width,
            height,
            discarded
        );
        Ok(())
    }

    /// Toggle display inversion; queue and frame buffer are untouched
    pub fn invert(&mut self, on: bool) -> Result<(), DisplayError> {
        self.controller.invert(on)
    }

    /// Discard pending work and hand the bus back to its owner
    pub fn shutdown(mut self) -> B {
        let discarded = self.queue.clear();
        info!("display shut down, discarded {} pending instructions", discarded);
        self.controller.release()
    }

    fn clip(&self, x: u16, y: u16, w: u16, h: u16) -> Option<Rect> {
        let rect = Rect::clip(x, y, w, h, self.width, self.height);
        if rect.is_none() {
            debug!(
                "dropping ({}, {}) {}x{} outside {}x{} panel",
                x, y, w, h, self.width, self.height
            );
        }
        rect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{BusError, RecordingBus};
    use super::ili9340::cmd;

    fn display() -> Display<RecordingBus> {
        Display::new(RecordingBus::new(), PanelConfig::default()).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let config = PanelConfig {
            max_chunk: 0,
            ..PanelConfig::default()
        };
        assert!(Display::new(RecordingBus::new(), config).is_err());
    }

    #[test]
    fn test_construction_is_silent() {
        let display = display();
        assert_eq!((display.width(), display.height()), (240, 320));
        assert!(display.bus().ops().is_empty());
    }

    #[test]
    fn test_fill_clipped_at_right_edge() {
        let mut display = display();
        assert!(display.fill_rect(230, 0, 50, 10, Rgb565(0xFFFF)));

        assert_eq!(display.pending(), 1);
        let instruction = display.pending_instructions().next().unwrap();
        assert_eq!(
            (instruction.x(), instruction.y(), instruction.w(), instruction.h()),
            (230, 0, 10, 10)
        );
        assert_eq!(instruction.data().len(), 200);
        assert!(instruction.data().iter().all(|b| *b == 0xFF));
    }

    #[test]
    fn test_off_panel_draws_are_dropped() {
        let mut display = display();
        assert!(!display.fill_rect(240, 0, 10, 10, Rgb565::RED));
        assert!(!display.fill_rect(0, 320, 10, 10, Rgb565::RED));
        assert!(!display.draw_pixel(240, 5, Rgb565::RED));
        assert!(!display.draw_hline(5, 5, 0, Rgb565::RED));
        assert!(!display.draw_vline(5, 5, 0, Rgb565::RED));
        assert_eq!(display.pending(), 0);
    }

    #[test]
    fn test_lines_and_pixels() {
        let mut display = display();
        display.draw_hline(10, 10, 300, Rgb565::RED);
        display.draw_vline(10, 300, 100, Rgb565::RED);
        display.draw_pixel(3, 4, Rgb565::RED);

        let rects: Vec<Rect> = display.pending_instructions().map(|i| i.rect()).collect();
        assert_eq!(
            rects,
            vec![
                Rect { x: 10, y: 10, w: 230, h: 1 },
                Rect { x: 10, y: 300, w: 1, h: 20 },
                Rect { x: 3, y: 4, w: 1, h: 1 },
            ]
        );
    }

    #[test]
    fn test_full_screen_clear_is_chunked() {
        let mut display = display();
        display.fill_rect(0, 0, 240, 320, Rgb565(0x0000));
        assert!(display.drain_one().unwrap());

        let bus = display.bus();
        assert_eq!(bus.commands(), vec![cmd::CASET, cmd::PASET, cmd::RAMWR]);
        assert_eq!(bus.payload_after(cmd::CASET), vec![&[0u8, 0, 0, 239][..]]);
        assert_eq!(bus.payload_after(cmd::PASET), vec![&[0u8, 0, 0x01, 0x3F][..]]);

        let pixels = bus.payload_after(cmd::RAMWR);
        assert_eq!(pixels.len(), chunk_count(153_600, 50_000));
        assert_eq!(pixels.len(), 4);
        assert!(pixels.iter().all(|chunk| chunk.len() <= 50_000));
        let payload = pixels.concat();
        assert_eq!(payload.len(), 153_600);
        assert!(payload.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_drain_is_fifo_and_one_at_a_time() {
        let mut display = display();
        display.draw_pixel(1, 1, Rgb565(0x1111));
        display.draw_pixel(2, 2, Rgb565(0x2222));

        assert!(display.drain_one().unwrap());
        assert_eq!(display.pending(), 1);
        assert_eq!(display.bus().payload_after(cmd::RAMWR), vec![&[0x11u8, 0x11][..]]);

        display.bus_mut().take_ops();
        assert!(display.drain_one().unwrap());
        assert_eq!(display.bus().payload_after(cmd::RAMWR), vec![&[0x22u8, 0x22][..]]);
        assert!(!display.drain_one().unwrap());
    }

    #[test]
    fn test_drain_empty_queue_is_noop() {
        let mut display = display();
        assert!(!display.drain_one().unwrap());
        assert_eq!(display.drain_all().unwrap(), 0);
        assert_eq!(display.bus().write_count(), 0);
    }

    #[test]
    fn test_drain_all() {
        let mut display = display();
        display.fill_screen(Rgb565::BLUE);
        display.draw_hline(0, 0, 10, Rgb565::RED);
        assert_eq!(display.drain_all().unwrap(), 2);
        assert_eq!(display.pending(), 0);
    }

    #[test]
    fn test_failed_drain_is_not_requeued() {
        let bus = RecordingBus::new().fail_after_writes(2);
        let mut display = Display::new(bus, PanelConfig::default()).unwrap();
        display.draw_pixel(0, 0, Rgb565::RED);
        display.draw_pixel(1, 0, Rgb565::RED);

        assert_eq!(
            display.drain_one(),
            Err(DisplayError::Bus(BusError::Timeout))
        );
        assert_eq!(display.pending(), 1);

        display.bus_mut().heal();
        assert!(display.drain_one().unwrap());
        assert_eq!(display.pending(), 0);
    }

    #[test]
    fn test_rotate_resets_queue_and_buffer() {
        let mut display = display();
        display.fill_rect(0, 0, 10, 10, Rgb565::RED);
        display.set_pixel(5, 5, Rgb565::RED);

        display.rotate(Rotation::Deg90).unwrap();

        assert_eq!((display.width(), display.height()), (320, 240));
        assert_eq!(display.pending(), 0);
        assert_eq!(display.dirty_rect(), None);
        assert_eq!(display.bus().commands(), vec![cmd::MADCTL]);
        assert_eq!(display.bus().payload_after(cmd::MADCTL), vec![&[0x20u8 | 0x08][..]]);

        // Landscape coordinates are now valid
        assert!(display.fill_rect(300, 200, 10, 10, Rgb565::RED));
        assert!(display.set_pixel(319, 239, Rgb565::RED));
    }

    #[test]
    fn test_rotate_all_modes() {
        let mut display = display();
        for rotation in Rotation::ALL {
            display.fill_screen(Rgb565::WHITE);
            display.rotate(rotation).unwrap();
            assert_eq!(display.pending(), 0);
            let (width, height) = rotation.dimensions(240, 320);
            assert_eq!((display.width(), display.height()), (width, height));
            assert_eq!(display.buffer_dimensions(), (width, height));
            assert!(display.set_pixel(width - 1, height - 1, Rgb565::RED));
            assert!(!display.set_pixel(width, height - 1, Rgb565::RED));
            assert!(!display.set_pixel(width - 1, height, Rgb565::RED));
            assert_eq!(display.rotation(), rotation);
        }
    }

    #[test]
    fn test_failed_rotate_keeps_state() {
        let bus = RecordingBus::new().fail_after_writes(0);
        let mut display = Display::new(bus, PanelConfig::default()).unwrap();
        display.draw_pixel(0, 0, Rgb565::RED);

        assert!(display.rotate(Rotation::Deg90).is_err());
        assert_eq!(display.rotation(), Rotation::Deg0);
        assert_eq!(display.pending(), 1);
        assert_eq!(display.buffer_dimensions(), (240, 320));
    }

    #[test]
    fn test_invert_leaves_queue() {
        let mut display = display();
        display.draw_pixel(0, 0, Rgb565::RED);
        display.invert(true).unwrap();
        assert_eq!(display.pending(), 1);
        assert_eq!(display.bus().commands(), vec![cmd::INVON]);
    }

    #[test]
    fn test_draw_block_crops() {
        let mut display = display();
        let glyph: Vec<Rgb565> = (0..12).map(Rgb565).collect();
        assert!(display.draw_block(238, 318, 4, 3, &glyph));

        let instruction = display.pending_instructions().next().unwrap();
        assert_eq!(instruction.rect(), Rect { x: 238, y: 318, w: 2, h: 2 });
        assert_eq!(instruction.data(), &[0u8, 0, 0, 1, 0, 4, 0, 5]);
    }

    #[test]
    fn test_enqueue_validates_geometry() {
        let mut display = display();
        let inside = DrawInstruction::solid(Rect { x: 0, y: 0, w: 240, h: 1 }, Rgb565::RED);
        let outside = DrawInstruction::solid(Rect { x: 1, y: 0, w: 240, h: 1 }, Rgb565::RED);
        assert!(display.enqueue(inside));
        assert!(!display.enqueue(outside));
        assert_eq!(display.pending(), 1);
    }

    #[test]
    fn test_set_address_window_checks_bounds() {
        let mut display = display();
        assert!(display.set_address_window(0, 0, 239, 319).is_ok());
        assert!(matches!(
            display.set_address_window(0, 0, 240, 319),
            Err(DisplayError::InvalidWindow { .. })
        ));
        assert!(display.set_address_window(5, 0, 4, 0).is_err());
    }

    #[test]
    fn test_flush_untouched_buffer() {
        let mut display = display();
        assert_eq!(display.flush().unwrap(), None);
        assert_eq!(display.bus().write_count(), 0);
    }

    #[test]
    fn test_flush_sends_bounding_rect() {
        let mut display = display();
        display.set_pixel(10, 20, Rgb565::WHITE);
        display.set_pixel(12, 22, Rgb565::WHITE);

        let rect = display.flush().unwrap().unwrap();
        assert_eq!(rect, Rect { x: 10, y: 20, w: 3, h: 3 });

        let bus = display.bus();
        assert_eq!(bus.payload_after(cmd::CASET), vec![&[0u8, 10, 0, 12][..]]);
        assert_eq!(bus.payload_after(cmd::PASET), vec![&[0u8, 20, 0, 22][..]]);
        let payload = bus.payload_after(cmd::RAMWR).concat();
        assert_eq!(payload.len(), 18);
        assert_eq!(&payload[..2], &[0xFFu8, 0xFF]);
        assert_eq!(&payload[16..], &[0xFFu8, 0xFF]);

        // Second flush has nothing left to send
        display.bus_mut().take_ops();
        assert_eq!(display.flush().unwrap(), None);
        assert!(display.bus().ops().is_empty());
    }

    #[test]
    fn test_buffer_writes_of_same_color_do_not_flush() {
        let mut display = display();
        display.buffer_fill_rect(0, 0, 10, 10, Rgb565::BLACK);
        assert_eq!(display.dirty_rect(), None);

        display.buffer_block(0, 0, 2, 1, &[Rgb565::RED, Rgb565::BLACK]);
        assert_eq!(display.dirty_rect(), Some(Rect { x: 0, y: 0, w: 1, h: 1 }));
        assert_eq!(display.pixel(0, 0), Some(Rgb565::RED));
    }

    #[test]
    fn test_shutdown_returns_bus() {
        let mut display = display();
        display.fill_screen(Rgb565::RED);
        let bus = display.shutdown();
        assert_eq!(bus.write_count(), 0);
    }
}
