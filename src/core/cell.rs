//! Grid cell coordinates and their spatial keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

// Packed layout: 26 bits x, 12 bits y, 26 bits z.
const PACK_XZ_BITS: u32 = 26;
const PACK_Y_BITS: u32 = 12;
const PACK_Y_SHIFT: u32 = PACK_XZ_BITS;
const PACK_X_SHIFT: u32 = PACK_Y_SHIFT + PACK_Y_BITS;
const PACK_XZ_MASK: u64 = (1 << PACK_XZ_BITS) - 1;
const PACK_Y_MASK: u64 = (1 << PACK_Y_BITS) - 1;

/// Integer world cell (x east, y up, z south)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cell {
    /// X coordinate
    pub x: i32,
    /// Y coordinate (vertical)
    pub y: i32,
    /// Z coordinate
    pub z: i32,
}

impl Cell {
    /// Create a new cell
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Origin cell
    pub const ORIGIN: Cell = Cell { x: 0, y: 0, z: 0 };

    /// Cell displaced by the given offset
    #[inline]
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Cell {
        Cell::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Cell directly below
    #[inline]
    pub fn below(&self) -> Cell {
        self.offset(0, -1, 0)
    }

    /// Cell directly above
    #[inline]
    pub fn above(&self) -> Cell {
        self.offset(0, 1, 0)
    }

    /// Spatial key used to index per-search node records.
    ///
    /// Depends only on the coordinates, never on visit order, so the same
    /// cell always maps to the same key across searches.
    #[inline]
    pub fn spatial_key(&self) -> u64 {
        spatial_key(self.x, self.y, self.z)
    }

    /// Squared euclidean distance to another cell
    #[inline]
    pub fn distance_squared(&self, other: &Cell) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        let dz = (self.z - other.z) as f64;
        dx * dx + dy * dy + dz * dz
    }

    /// Manhattan distance to another cell
    #[inline]
    pub fn manhattan_distance(&self, other: &Cell) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs() + (self.z - other.z).abs()
    }

    /// Pack into a single u64 (26/12/26 bit fields, two's complement).
    ///
    /// Lossless for |x|, |z| < 2^25 and |y| < 2^11.
    #[inline]
    pub fn to_packed(&self) -> u64 {
        ((self.x as i64 as u64 & PACK_XZ_MASK) << PACK_X_SHIFT)
            | ((self.y as i64 as u64 & PACK_Y_MASK) << PACK_Y_SHIFT)
            | (self.z as i64 as u64 & PACK_XZ_MASK)
    }

    /// Inverse of [`Cell::to_packed`]
    #[inline]
    pub fn from_packed(packed: u64) -> Self {
        let bits = packed as i64;
        let x = (bits << (64 - PACK_X_SHIFT - PACK_XZ_BITS)) >> (64 - PACK_XZ_BITS);
        let y = (bits << (64 - PACK_Y_SHIFT - PACK_Y_BITS)) >> (64 - PACK_Y_BITS);
        let z = (bits << (64 - PACK_XZ_BITS)) >> (64 - PACK_XZ_BITS);
        Cell::new(x as i32, y as i32, z as i32)
    }
}

/// Spatial key of raw coordinates (see [`Cell::spatial_key`]).
#[inline]
pub fn spatial_key(x: i32, y: i32, z: i32) -> u64 {
    let mut hash: i64 = 3241;
    hash = hash.wrapping_mul(3_457_689).wrapping_add(x as i64);
    hash = hash.wrapping_mul(8_734_625).wrapping_add(y as i64);
    hash = hash.wrapping_mul(2_873_465).wrapping_add(z as i64);
    hash as u64
}

impl Add for Cell {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Cell::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Cell {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Cell::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl FromStr for Cell {
    type Err = String;

    /// Parses `x,y,z`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(format!("expected x,y,z but got '{}'", s));
        }
        let parse = |p: &str| {
            p.parse::<i32>()
                .map_err(|e| format!("invalid coordinate '{}': {}", p, e))
        };
        Ok(Cell::new(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?))
    }
}
