//! World border and valid vertical range.

use serde::{Deserialize, Serialize};

use super::Cell;

/// Horizontal world border plus the valid vertical range.
///
/// Both are consulted before any move model query; cells outside are
/// never expanded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldBounds {
    /// Smallest valid x (inclusive)
    pub min_x: i32,
    /// Largest valid x (inclusive)
    pub max_x: i32,
    /// Smallest valid z (inclusive)
    pub min_z: i32,
    /// Largest valid z (inclusive)
    pub max_z: i32,
    /// Lowest valid y (inclusive)
    pub min_y: i32,
    /// Highest valid y (inclusive)
    pub max_y: i32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            min_x: -29_999_984,
            max_x: 29_999_984,
            min_z: -29_999_984,
            max_z: 29_999_984,
            min_y: 0,
            max_y: 256,
        }
    }
}

impl WorldBounds {
    /// Square border of the given half extent around the origin
    pub fn square(half_extent: i32) -> Self {
        Self {
            min_x: -half_extent,
            max_x: half_extent,
            min_z: -half_extent,
            max_z: half_extent,
            ..Default::default()
        }
    }

    /// Whether the column (x, z) is inside the horizontal border
    #[inline]
    pub fn contains(&self, x: i32, z: i32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }

    /// Whether y is inside the vertical range
    #[inline]
    pub fn contains_y(&self, y: i32) -> bool {
        y >= self.min_y && y <= self.max_y
    }

    /// Whether the cell is inside both the border and the vertical range
    #[inline]
    pub fn contains_cell(&self, cell: Cell) -> bool {
        self.contains(cell.x, cell.z) && self.contains_y(cell.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_bounds() {
        let bounds = WorldBounds::square(10);
        assert!(bounds.contains(10, -10));
        assert!(!bounds.contains(11, 0));
        assert!(!bounds.contains(0, -11));
    }

    #[test]
    fn test_vertical_range() {
        let bounds = WorldBounds::default();
        assert!(bounds.contains_y(0));
        assert!(bounds.contains_y(256));
        assert!(!bounds.contains_y(-1));
        assert!(!bounds.contains_y(257));
        assert!(!bounds.contains_cell(Cell::new(0, 300, 0)));
    }
}
