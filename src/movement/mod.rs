//! Candidate moves and the move model capability.
//!
//! The search never decides whether a move is physically possible. It walks
//! the fixed [`Move`] set, checks the tentative destination against the world
//! bounds, and asks a [`MoveModel`] for the real destination and cost.
//!
//! This module provides:
//! - [`Move`]: the fixed enumerable set of relative moves
//! - [`MoveResult`]: destination + cost reported by a model
//! - [`MoveModel`]: the narrow interface the search consumes
//! - [`VoxelWorld`] / [`WalkingModel`]: a small reference world used by the
//!   demo binary and the tests

pub mod costs;
mod voxel;

pub use costs::COST_INF;
pub use voxel::{VoxelWorld, WalkingModel};

use crate::core::Cell;

/// A candidate relative move.
///
/// North is -z, south is +z, east is +x, west is -x.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Move {
    Downward,
    Pillar,
    TraverseNorth,
    TraverseSouth,
    TraverseEast,
    TraverseWest,
    AscendNorth,
    AscendSouth,
    AscendEast,
    AscendWest,
    DescendNorth,
    DescendSouth,
    DescendEast,
    DescendWest,
    DiagonalNortheast,
    DiagonalNorthwest,
    DiagonalSoutheast,
    DiagonalSouthwest,
}

impl Move {
    /// Every move, in the order the search tries them
    pub const ALL: [Move; 18] = [
        Move::Downward,
        Move::Pillar,
        Move::TraverseNorth,
        Move::TraverseSouth,
        Move::TraverseEast,
        Move::TraverseWest,
        Move::AscendNorth,
        Move::AscendSouth,
        Move::AscendEast,
        Move::AscendWest,
        Move::DescendNorth,
        Move::DescendSouth,
        Move::DescendEast,
        Move::DescendWest,
        Move::DiagonalNortheast,
        Move::DiagonalNorthwest,
        Move::DiagonalSoutheast,
        Move::DiagonalSouthwest,
    ];

    /// Nominal (dx, dy, dz) offset of the move.
    ///
    /// Descends may land lower than the nominal offset; the model reports
    /// the actual destination.
    pub const fn offset(self) -> (i32, i32, i32) {
        match self {
            Move::Downward => (0, -1, 0),
            Move::Pillar => (0, 1, 0),
            Move::TraverseNorth => (0, 0, -1),
            Move::TraverseSouth => (0, 0, 1),
            Move::TraverseEast => (1, 0, 0),
            Move::TraverseWest => (-1, 0, 0),
            Move::AscendNorth => (0, 1, -1),
            Move::AscendSouth => (0, 1, 1),
            Move::AscendEast => (1, 1, 0),
            Move::AscendWest => (-1, 1, 0),
            Move::DescendNorth => (0, -1, -1),
            Move::DescendSouth => (0, -1, 1),
            Move::DescendEast => (1, -1, 0),
            Move::DescendWest => (-1, -1, 0),
            Move::DiagonalNortheast => (1, 0, -1),
            Move::DiagonalNorthwest => (-1, 0, -1),
            Move::DiagonalSoutheast => (1, 0, 1),
            Move::DiagonalSouthwest => (-1, 0, 1),
        }
    }

    /// Nominal destination when applied at `from`
    #[inline]
    pub fn nominal_destination(self, from: Cell) -> Cell {
        let (dx, dy, dz) = self.offset();
        from.offset(dx, dy, dz)
    }
}

/// Destination and cost of one move, as reported by a [`MoveModel`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveResult {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Traversal cost in ticks, or [`COST_INF`] when infeasible
    pub cost: f64,
}

impl MoveResult {
    /// Feasible move to `dest` with the given cost
    pub fn new(dest: Cell, cost: f64) -> Self {
        Self {
            x: dest.x,
            y: dest.y,
            z: dest.z,
            cost,
        }
    }

    /// Move that cannot be made
    pub fn infeasible() -> Self {
        Self {
            x: 0,
            y: 0,
            z: 0,
            cost: COST_INF,
        }
    }

    /// Destination cell
    #[inline]
    pub fn destination(&self) -> Cell {
        Cell::new(self.x, self.y, self.z)
    }

    /// Whether the cost is the infeasible sentinel (or above it)
    #[inline]
    pub fn is_infeasible(&self) -> bool {
        self.cost >= COST_INF
    }
}

/// Computes the destination and cost of a candidate move.
///
/// Implementations own whatever world snapshot they need and must be safe
/// to query from a background search thread. Feasible costs must be finite
/// and strictly positive; anything else that is not the infeasible
/// sentinel aborts the search.
pub trait MoveModel: Send + Sync {
    fn apply(&self, x: i32, y: i32, z: i32, movement: Move) -> MoveResult;
}

impl<T: MoveModel + ?Sized> MoveModel for std::sync::Arc<T> {
    fn apply(&self, x: i32, y: i32, z: i32, movement: Move) -> MoveResult {
        (**self).apply(x, y, z, movement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_are_unit_steps() {
        for mv in Move::ALL {
            let (dx, dy, dz) = mv.offset();
            assert!(dx.abs() <= 1 && dy.abs() <= 1 && dz.abs() <= 1);
            assert!((dx, dy, dz) != (0, 0, 0), "{:?} must move", mv);
        }
    }

    #[test]
    fn test_infeasible_sentinel() {
        assert!(MoveResult::infeasible().is_infeasible());
        assert!(MoveResult::new(Cell::ORIGIN, f64::INFINITY).is_infeasible());
        assert!(!MoveResult::new(Cell::ORIGIN, 4.0).is_infeasible());
    }
}
