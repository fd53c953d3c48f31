//! Draw queue
//!
//! Drawing calls are clipped and serialized at the primitive boundary and
//! land here as [`DrawInstruction`]s. The consumer side pops one instruction
//! per tick, so a full-screen fill never blocks the producer.

use std::collections::VecDeque;

use super::framebuffer::{serialize_pixels, serialize_solid, Rgb565};

/// Rectangle in panel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

impl Rect {
    /// Clip a rectangle to a `width × height` panel.
    ///
    /// Returns `None` when the origin lies off the panel or the clipped
    /// rectangle is empty. Rectangles fully inside are returned unchanged.
    pub fn clip(x: u16, y: u16, w: u16, h: u16, width: u16, height: u16) -> Option<Self> {
        if x >= width || y >= height {
            return None;
        }
        let w = w.min(width - x);
        let h = h.min(height - y);
        if w == 0 || h == 0 {
            return None;
        }
        Some(Self { x, y, w, h })
    }

    /// Whether the rectangle is non-empty and lies entirely on the panel
    pub fn fits(&self, width: u16, height: u16) -> bool {
        self.w > 0
            && self.h > 0
            && u32::from(self.x) + u32::from(self.w) <= u32::from(width)
            && u32::from(self.y) + u32::from(self.h) <= u32::from(height)
    }

    /// Inclusive controller window `(x1, y1, x2, y2)`
    pub fn window(&self) -> (u16, u16, u16, u16) {
        (
            self.x,
            self.y,
            self.x + self.w.saturating_sub(1),
            self.y + self.h.saturating_sub(1),
        )
    }

    /// Pixel count
    pub fn area(&self) -> usize {
        self.w as usize * self.h as usize
    }

    /// Serialized size at two bytes per pixel
    pub fn byte_len(&self) -> usize {
        self.area() * 2
    }
}

/// Write this rectangle of serialized pixels starting at `(x, y)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawInstruction {
    rect: Rect,
    data: Vec<u8>,
}

impl DrawInstruction {
    /// Wrap pre-serialized pixel bytes.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != 2 * w * h`.
    pub fn new(rect: Rect, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            rect.byte_len(),
            "instruction for {}x{} at ({}, {}) carries {} bytes",
            rect.w,
            rect.h,
            rect.x,
            rect.y,
            data.len()
        );
        Self { rect, data }
    }

    /// Rectangle filled with one color
    pub fn solid(rect: Rect, color: Rgb565) -> Self {
        Self::new(rect, serialize_solid(color, rect.area()))
    }

    /// Rectangle from row-major pixels
    pub fn from_pixels(rect: Rect, pixels: &[Rgb565]) -> Self {
        Self::new(rect, serialize_pixels(pixels))
    }

    /// Rectangle covered
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Left column
    pub fn x(&self) -> u16 {
        self.rect.x
    }

    /// Top row
    pub fn y(&self) -> u16 {
        self.rect.y
    }

    /// Width in pixels
    pub fn w(&self) -> u16 {
        self.rect.w
    }

    /// Height in pixels
    pub fn h(&self) -> u16 {
        self.rect.h
    }

    /// Serialized pixel bytes, row-major
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Controller window covering the instruction
    pub fn window(&self) -> (u16, u16, u16, u16) {
        self.rect.window()
    }
}

/// FIFO of pending instructions
#[derive(Debug, Default)]
pub struct DrawQueue {
    pending: VecDeque<DrawInstruction>,
}

impl DrawQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail
    pub fn enqueue(&mut self, instruction: DrawInstruction) {
        self.pending.push_back(instruction);
    }

    /// Remove the oldest instruction
    pub fn dequeue(&mut self) -> Option<DrawInstruction> {
        self.pending.pop_front()
    }

    /// Oldest instruction, left in place
    pub fn peek(&self) -> Option<&DrawInstruction> {
        self.pending.front()
    }

    /// Drop everything pending; returns how many instructions were discarded
    pub fn clear(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        discarded
    }

    /// Number of pending instructions
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Total payload bytes waiting to be sent
    pub fn pending_bytes(&self) -> usize {
        self.pending.iter().map(|i| i.data.len()).sum()
    }

    /// Pending instructions, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &DrawInstruction> {
        self.pending.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: u16 = 240;
    const H: u16 = 320;

    #[test]
    fn test_clip_inside_is_identity() {
        for (x, y, w, h) in [(0, 0, 240, 320), (10, 20, 30, 40), (239, 319, 1, 1)] {
            assert_eq!(Rect::clip(x, y, w, h, W, H), Some(Rect { x, y, w, h }));
        }
    }

    #[test]
    fn test_clip_outside_is_dropped() {
        assert_eq!(Rect::clip(240, 0, 10, 10, W, H), None);
        assert_eq!(Rect::clip(0, 320, 10, 10, W, H), None);
        assert_eq!(Rect::clip(u16::MAX, u16::MAX, 1, 1, W, H), None);
    }

    #[test]
    fn test_clip_empty_is_dropped() {
        assert_eq!(Rect::clip(10, 10, 0, 5, W, H), None);
        assert_eq!(Rect::clip(10, 10, 5, 0, W, H), None);
    }

    #[test]
    fn test_clip_right_and_bottom_edges() {
        let rect = Rect::clip(230, 300, 50, 50, W, H).unwrap();
        assert_eq!(rect.x + rect.w, W);
        assert_eq!(rect.y + rect.h, H);

        // No overflow for huge sizes
        let rect = Rect::clip(1, 1, u16::MAX, u16::MAX, W, H).unwrap();
        assert_eq!((rect.w, rect.h), (239, 319));
    }

    #[test]
    fn test_window() {
        let rect = Rect { x: 5, y: 6, w: 10, h: 1 };
        assert_eq!(rect.window(), (5, 6, 14, 6));
    }

    #[test]
    fn test_fits() {
        assert!(Rect { x: 0, y: 0, w: 240, h: 320 }.fits(W, H));
        assert!(!Rect { x: 1, y: 0, w: 240, h: 320 }.fits(W, H));
        assert!(!Rect { x: 0, y: 0, w: 0, h: 1 }.fits(W, H));
    }

    #[test]
    fn test_solid_instruction() {
        let instruction = DrawInstruction::solid(Rect { x: 1, y: 2, w: 3, h: 2 }, Rgb565(0xABCD));
        assert_eq!(instruction.data().len(), 12);
        assert!(instruction
            .data()
            .chunks(2)
            .all(|pair| pair == [0xAB, 0xCD]));
    }

    #[test]
    #[should_panic(expected = "carries 3 bytes")]
    fn test_serialization_mismatch_panics() {
        DrawInstruction::new(Rect { x: 0, y: 0, w: 1, h: 1 }, vec![0, 0, 0]);
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = DrawQueue::new();
        for x in 0..3 {
            queue.enqueue(DrawInstruction::solid(Rect { x, y: 0, w: 1, h: 1 }, Rgb565::RED));
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pending_bytes(), 6);
        assert_eq!(queue.peek().map(|i| i.x()), Some(0));

        let order: Vec<u16> = std::iter::from_fn(|| queue.dequeue()).map(|i| i.x()).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert!(queue.is_empty());
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_clear() {
        let mut queue = DrawQueue::new();
        queue.enqueue(DrawInstruction::solid(Rect { x: 0, y: 0, w: 2, h: 2 }, Rgb565::RED));
        queue.enqueue(DrawInstruction::solid(Rect { x: 0, y: 0, w: 1, h: 1 }, Rgb565::RED));
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.pending_bytes(), 0);
    }
}
