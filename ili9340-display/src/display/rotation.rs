//! Panel orientation
//!
//! The controller rotates by remapping memory access (MADCTL). The 90° and
//! 270° modes swap the row/column exchange bit, so the logical width and
//! height swap with them.

use serde::{Deserialize, Serialize};

/// MADCTL bits
pub mod madctl {
    pub const MY: u8 = 0x80; // Row address order
    pub const MX: u8 = 0x40; // Column address order
    pub const MV: u8 = 0x20; // Row/column exchange
    pub const ML: u8 = 0x10; // Vertical refresh order
    pub const BGR: u8 = 0x08; // BGR color filter
    pub const MH: u8 = 0x04; // Horizontal refresh order
}

/// The four fixed orientations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    /// Portrait, native dimensions
    #[default]
    Deg0,
    /// Landscape
    Deg90,
    /// Portrait, flipped
    Deg180,
    /// Landscape, flipped
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Rotation for index 0-3
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Rotation::Deg0),
            1 => Some(Rotation::Deg90),
            2 => Some(Rotation::Deg180),
            3 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    /// Index 0-3, clockwise from portrait
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Clockwise rotation in degrees
    pub const fn degrees(self) -> u16 {
        self.index() as u16 * 90
    }

    /// Next orientation clockwise
    pub const fn next(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    /// Memory access control byte for this orientation
    pub const fn madctl(self) -> u8 {
        match self {
            Rotation::Deg0 => madctl::MX | madctl::BGR,
            Rotation::Deg90 => madctl::MV | madctl::BGR,
            Rotation::Deg180 => madctl::MY | madctl::BGR,
            Rotation::Deg270 => madctl::MX | madctl::MY | madctl::MV | madctl::BGR,
        }
    }

    /// Whether rows and columns are exchanged
    pub const fn is_landscape(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    /// Effective `(width, height)` for a panel with the given native size
    pub const fn dimensions(self, native_width: u16, native_height: u16) -> (u16, u16) {
        if self.is_landscape() {
            (native_height, native_width)
        } else {
            (native_width, native_height)
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    /// Accepts either an index (0-3) or degrees (0, 90, 180, 270)
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0..=3 => Rotation::from_index(value as u8).ok_or_else(|| value.to_string()),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            _ => Err(format!(
                "invalid rotation {}: expected 0-3 or 0/90/180/270 degrees",
                value
            )),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_madctl_bytes() {
        assert_eq!(Rotation::Deg0.madctl(), 0x48);
        assert_eq!(Rotation::Deg90.madctl(), 0x20 | 0x08);
        assert_eq!(Rotation::Deg180.madctl(), 0x88);
        assert_eq!(Rotation::Deg270.madctl(), 0xE8);
    }

    #[test]
    fn test_dimensions_swap() {
        assert_eq!(Rotation::Deg0.dimensions(240, 320), (240, 320));
        assert_eq!(Rotation::Deg90.dimensions(240, 320), (320, 240));
        assert_eq!(Rotation::Deg180.dimensions(240, 320), (240, 320));
        assert_eq!(Rotation::Deg270.dimensions(240, 320), (320, 240));
    }

    #[test]
    fn test_index_round_trip() {
        for rotation in Rotation::ALL {
            assert_eq!(Rotation::from_index(rotation.index()), Some(rotation));
        }
        assert_eq!(Rotation::from_index(4), None);
        assert_eq!(Rotation::Deg270.next(), Rotation::Deg0);
    }

    #[test]
    fn test_try_from_degrees() {
        assert_eq!(Rotation::try_from(1u16), Ok(Rotation::Deg90));
        assert_eq!(Rotation::try_from(180u16), Ok(Rotation::Deg180));
        assert!(Rotation::try_from(45u16).is_err());
        assert_eq!(u16::from(Rotation::Deg270), 270);
    }
}
