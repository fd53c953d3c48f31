//! RGB565 frame buffer with per-line dirty tracking
//!
//! Each [`ScanLine`] remembers the contiguous span of columns that changed
//! since it was last flushed. Spans are 1-based and inclusive, with 0 meaning
//! "nothing changed", so a clean line reports `(0, 0)`.
//!
//! [`FrameBuffer::take_dirty_region`] merges the spans of all dirty lines into
//! one bounding rectangle. Unchanged pixels inside that rectangle are sent
//! again; one contiguous window costs less than many small ones.

use byteorder::{BigEndian, ByteOrder};

use super::queue::Rect;

/// RGB565 color (16-bit: 5 red, 6 green, 5 blue)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb565(pub u16);

impl Rgb565 {
    pub const BLACK: Self = Self(0x0000);
    pub const WHITE: Self = Self(0xFFFF);
    pub const RED: Self = Self(0xF800);
    pub const GREEN: Self = Self(0x07E0);
    pub const BLUE: Self = Self(0x001F);

    /// Create RGB565 from RGB888 components
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let r5 = (r >> 3) as u16;
        let g6 = (g >> 2) as u16;
        let b5 = (b >> 3) as u16;
        Self((r5 << 11) | (g6 << 5) | b5)
    }

    /// Wire representation, high byte first
    pub fn to_be_bytes(self) -> [u8; 2] {
        let mut bytes = [0u8; 2];
        BigEndian::write_u16(&mut bytes, self.0);
        bytes
    }
}

impl From<u16> for Rgb565 {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// Serialize colors row-major, two bytes per pixel, high byte first
pub fn serialize_pixels(colors: &[Rgb565]) -> Vec<u8> {
    let mut bytes = vec![0u8; colors.len() * 2];
    for (chunk, color) in bytes.chunks_exact_mut(2).zip(colors) {
        BigEndian::write_u16(chunk, color.0);
    }
    bytes
}

/// Serialize `count` copies of one color
pub fn serialize_solid(color: Rgb565, count: usize) -> Vec<u8> {
    let [hi, lo] = color.to_be_bytes();
    let mut bytes = Vec::with_capacity(count * 2);
    for _ in 0..count {
        bytes.push(hi);
        bytes.push(lo);
    }
    bytes
}

/// One row of the frame buffer
#[derive(Debug, Clone)]
pub struct ScanLine {
    pixels: Vec<Rgb565>,
    changed_start: u16,
    changed_end: u16,
}

impl ScanLine {
    /// Create a clean line of `width` black pixels
    pub fn new(width: u16) -> Self {
        Self {
            pixels: vec![Rgb565::BLACK; width as usize],
            changed_start: 0,
            changed_end: 0,
        }
    }

    /// Number of columns
    pub fn width(&self) -> u16 {
        self.pixels.len() as u16
    }

    /// Pixel at 0-based column `col`
    pub fn pixel(&self, col: u16) -> Option<Rgb565> {
        self.pixels.get(col as usize).copied()
    }

    /// First changed column, 1-based; 0 when clean
    pub fn changed_start(&self) -> u16 {
        self.changed_start
    }

    /// Last changed column, 1-based; 0 when clean
    pub fn changed_end(&self) -> u16 {
        self.changed_end
    }

    /// Changed span as 1-based inclusive `(start, end)`
    pub fn changed_span(&self) -> Option<(u16, u16)> {
        if self.changed_start == 0 || self.changed_end == 0 {
            None
        } else {
            Some((self.changed_start, self.changed_end))
        }
    }

    /// Whether any column changed since the last flush
    pub fn is_dirty(&self) -> bool {
        self.changed_span().is_some()
    }

    /// Store `color` at 0-based column `col`.
    ///
    /// Returns true if the stored pixel changed. Writing the color already
    /// present leaves the dirty span untouched.
    pub fn set_pixel(&mut self, col: u16, color: Rgb565) -> bool {
        let Some(pixel) = self.pixels.get_mut(col as usize) else {
            return false;
        };
        if *pixel == color {
            return false;
        }
        *pixel = color;

        let position = col + 1;
        self.changed_start = if self.changed_start == 0 {
            position
        } else {
            self.changed_start.min(position)
        };
        self.changed_end = if self.changed_end == 0 {
            position
        } else {
            self.changed_end.max(position)
        };
        true
    }

    /// Write a run of pixels starting at 0-based column `col`; columns past
    /// the end of the line are ignored. Returns the number of changed pixels.
    pub fn write_run(&mut self, col: u16, colors: &[Rgb565]) -> usize {
        let mut changed = 0;
        for (offset, color) in colors.iter().enumerate() {
            let Some(target) = (col as usize)
                .checked_add(offset)
                .filter(|c| *c < self.pixels.len())
            else {
                break;
            };
            if self.set_pixel(target as u16, *color) {
                changed += 1;
            }
        }
        changed
    }

    /// Set every pixel to `color`.
    ///
    /// If any pixel changed, the whole line is marked dirty. Returns true if
    /// the line changed.
    pub fn fill(&mut self, color: Rgb565) -> bool {
        let mut changed = false;
        for pixel in &mut self.pixels {
            if *pixel != color {
                *pixel = color;
                changed = true;
            }
        }
        if changed {
            self.changed_start = 1;
            self.changed_end = self.width();
        }
        changed
    }

    /// Mark the line clean
    pub fn reset_change(&mut self) {
        self.changed_start = 0;
        self.changed_end = 0;
    }

    /// Serialize the 1-based inclusive column span `start..=end`
    pub fn serialize_span(&self, start: u16, end: u16) -> Vec<u8> {
        let first = (start.max(1) - 1) as usize;
        let last = (end as usize).min(self.pixels.len());
        if first >= last {
            return Vec::new();
        }
        serialize_pixels(&self.pixels[first..last])
    }
}

/// Rectangle of pixels ready for transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyRegion {
    /// 0-based rectangle on the panel
    pub rect: Rect,
    /// Row-major big-endian pixel bytes, `2 * w * h` long
    pub data: Vec<u8>,
}

/// Frame buffer sized to the current panel orientation
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    lines: Vec<ScanLine>,
}

impl FrameBuffer {
    /// Create a clean frame buffer initialized to black
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            lines: (0..height).map(|_| ScanLine::new(width)).collect(),
        }
    }

    /// Width in pixels
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Scan line at `row`
    pub fn line(&self, row: u16) -> Option<&ScanLine> {
        self.lines.get(row as usize)
    }

    /// Get pixel at coordinates
    pub fn get_pixel(&self, x: u16, y: u16) -> Option<Rgb565> {
        self.line(y).and_then(|line| line.pixel(x))
    }

    /// Set pixel at coordinates (bounds-checked)
    ///
    /// Returns true if the coordinates are on the panel.
    pub fn set_pixel(&mut self, x: u16, y: u16, color: Rgb565) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.lines[y as usize].set_pixel(x, color);
        true
    }

    /// Fill a rectangle, clipped to the buffer
    ///
    /// Returns false if nothing of the rectangle is on the panel.
    pub fn fill_rect(&mut self, x: u16, y: u16, w: u16, h: u16, color: Rgb565) -> bool {
        let Some(rect) = Rect::clip(x, y, w, h, self.width, self.height) else {
            return false;
        };
        for row in rect.y..rect.y + rect.h {
            let line = &mut self.lines[row as usize];
            for col in rect.x..rect.x + rect.w {
                line.set_pixel(col, color);
            }
        }
        true
    }

    /// Copy a row-major block of `w * h` pixels to `(x, y)`, cropping what
    /// falls outside the buffer.
    ///
    /// # Panics
    ///
    /// Panics if `pixels.len() != w * h`.
    pub fn write_block(&mut self, x: u16, y: u16, w: u16, h: u16, pixels: &[Rgb565]) -> bool {
        assert_eq!(
            pixels.len(),
            w as usize * h as usize,
            "block of {}x{} needs {} pixels",
            w,
            h,
            w as usize * h as usize
        );
        let Some(rect) = Rect::clip(x, y, w, h, self.width, self.height) else {
            return false;
        };
        for row in 0..rect.h {
            let start = row as usize * w as usize;
            let run = &pixels[start..start + rect.w as usize];
            self.lines[(rect.y + row) as usize].write_run(rect.x, run);
        }
        true
    }

    /// Set every pixel to `color`
    pub fn clear(&mut self, color: Rgb565) {
        for line in &mut self.lines {
            line.fill(color);
        }
    }

    /// Whether any line is dirty
    pub fn is_dirty(&self) -> bool {
        self.lines.iter().any(ScanLine::is_dirty)
    }

    /// Bounding rectangle of all changes, without consuming them
    pub fn dirty_rect(&self) -> Option<Rect> {
        let (start, first, end, last) = self.dirty_bounds()?;
        Some(Rect {
            x: start - 1,
            y: first,
            w: end - start + 1,
            h: last - first + 1,
        })
    }

    /// Compute the dirty rectangle, serialize its pixels and mark the
    /// contributing lines clean. `None` when nothing changed.
    pub fn take_dirty_region(&mut self) -> Option<DirtyRegion> {
        let (start, first, end, last) = self.dirty_bounds()?;
        let rect = Rect {
            x: start - 1,
            y: first,
            w: end - start + 1,
            h: last - first + 1,
        };

        let mut data = Vec::with_capacity(rect.byte_len());
        for line in &mut self.lines[first as usize..=last as usize] {
            data.extend(line.serialize_span(start, end));
            line.reset_change();
        }
        Some(DirtyRegion { rect, data })
    }

    /// 1-based column span and 0-based row span: `(start, first_row, end, last_row)`
    fn dirty_bounds(&self) -> Option<(u16, u16, u16, u16)> {
        let mut rows: Option<(u16, u16)> = None;
        let mut start = u16::MAX;
        let mut end = 0;

        for (row, line) in self.lines.iter().enumerate() {
            let Some((line_start, line_end)) = line.changed_span() else {
                continue;
            };
            start = start.min(line_start);
            end = end.max(line_end);
            let row = row as u16;
            rows = Some(match rows {
                None => (row, row),
                Some((first, _)) => (first, row),
            });
        }

        let (first, last) = rows?;
        if start == u16::MAX || end < start || end > self.width {
            // Fall back to the full line width
            start = 1;
            end = self.width;
        }
        Some((start, first, end, last))
    }
}
