//! Reference voxel world and walking move model.
//!
//! Everything below `ground_y` is solid; individual cells can be made solid
//! (walls, pillars) or carved out (holes) on top of that.

use rustc_hash::FxHashMap;

use super::costs::{
    CENTER_AFTER_FALL_COST, WALK_OFF_BLOCK_COST, WALK_ONE_BLOCK_COST, fall_cost,
    jump_one_block_cost,
};
use super::{Move, MoveModel, MoveResult};
use crate::core::Cell;

/// Sparse voxel world over a flat ground plane.
#[derive(Clone, Debug)]
pub struct VoxelWorld {
    /// Cells with y < ground_y are solid unless overridden
    ground_y: i32,
    /// Explicit overrides (true = solid, false = air)
    overrides: FxHashMap<Cell, bool>,
}

impl VoxelWorld {
    /// Flat world whose walkable surface is at `ground_y`
    pub fn flat(ground_y: i32) -> Self {
        Self {
            ground_y,
            overrides: FxHashMap::default(),
        }
    }

    /// Height agents stand at on open ground
    pub fn ground_y(&self) -> i32 {
        self.ground_y
    }

    /// Make a cell solid
    pub fn set_solid(&mut self, cell: Cell) {
        self.overrides.insert(cell, true);
    }

    /// Make a cell air
    pub fn set_air(&mut self, cell: Cell) {
        self.overrides.insert(cell, false);
    }

    /// Build a wall column of the given height standing on the ground
    pub fn add_wall(&mut self, x: i32, z: i32, height: i32) {
        for dy in 0..height {
            self.set_solid(Cell::new(x, self.ground_y + dy, z));
        }
    }

    /// Whether the cell is solid
    pub fn is_solid(&self, cell: Cell) -> bool {
        match self.overrides.get(&cell) {
            Some(&solid) => solid,
            None => cell.y < self.ground_y,
        }
    }

    #[inline]
    fn can_walk_on(&self, cell: Cell) -> bool {
        self.is_solid(cell)
    }

    #[inline]
    fn can_walk_through(&self, cell: Cell) -> bool {
        !self.is_solid(cell)
    }

    /// An agent fits at `cell` (feet and head clear)
    #[inline]
    fn fits(&self, cell: Cell) -> bool {
        self.can_walk_through(cell) && self.can_walk_through(cell.above())
    }

    /// An agent can stand at `cell`
    pub fn can_stand_at(&self, cell: Cell) -> bool {
        self.fits(cell) && self.can_walk_on(cell.below())
    }
}

/// Walking-only move model over a [`VoxelWorld`].
///
/// No block placing or breaking: pillar and downward moves are always
/// infeasible.
#[derive(Clone, Debug)]
pub struct WalkingModel {
    world: VoxelWorld,
    /// Deepest drop a descend may take
    max_fall: i32,
    jump_cost: f64,
}

impl WalkingModel {
    /// Create a model over the given world
    pub fn new(world: VoxelWorld) -> Self {
        Self {
            world,
            max_fall: 3,
            jump_cost: jump_one_block_cost(),
        }
    }

    /// Limit how deep descends may fall
    pub fn with_max_fall(mut self, max_fall: i32) -> Self {
        self.max_fall = max_fall.max(1);
        self
    }

    /// World this model reads
    pub fn world(&self) -> &VoxelWorld {
        &self.world
    }

    fn traverse(&self, src: Cell, dx: i32, dz: i32) -> MoveResult {
        let dest = src.offset(dx, 0, dz);
        if self.world.can_stand_at(dest) {
            MoveResult::new(dest, WALK_ONE_BLOCK_COST)
        } else {
            MoveResult::infeasible()
        }
    }

    fn ascend(&self, src: Cell, dx: i32, dz: i32) -> MoveResult {
        let dest = src.offset(dx, 1, dz);
        // Head room above the source for the jump
        if !self.world.can_walk_through(src.offset(0, 2, 0)) {
            return MoveResult::infeasible();
        }
        if self.world.can_stand_at(dest) {
            MoveResult::new(dest, WALK_ONE_BLOCK_COST + self.jump_cost)
        } else {
            MoveResult::infeasible()
        }
    }

    fn descend(&self, src: Cell, dx: i32, dz: i32) -> MoveResult {
        let edge = src.offset(dx, 0, dz);
        if !self.world.fits(edge) || self.world.can_walk_on(edge.below()) {
            // Blocked, or solid floor: that is a traverse, not a descend
            return MoveResult::infeasible();
        }
        for fall in 1..=self.max_fall {
            let landing = edge.offset(0, -fall, 0);
            if !self.world.can_walk_through(landing) {
                return MoveResult::infeasible();
            }
            if self.world.can_walk_on(landing.below()) {
                let cost =
                    WALK_OFF_BLOCK_COST + fall_cost(fall as f64) + CENTER_AFTER_FALL_COST;
                return MoveResult::new(landing, cost);
            }
        }
        MoveResult::infeasible()
    }

    fn diagonal(&self, src: Cell, dx: i32, dz: i32) -> MoveResult {
        let dest = src.offset(dx, 0, dz);
        if !self.world.fits(src.offset(dx, 0, 0)) || !self.world.fits(src.offset(0, 0, dz)) {
            return MoveResult::infeasible();
        }
        if self.world.can_stand_at(dest) {
            MoveResult::new(dest, WALK_ONE_BLOCK_COST * std::f64::consts::SQRT_2)
        } else {
            MoveResult::infeasible()
        }
    }
}

impl MoveModel for WalkingModel {
    fn apply(&self, x: i32, y: i32, z: i32, movement: Move) -> MoveResult {
        let src = Cell::new(x, y, z);
        let (dx, _, dz) = movement.offset();
        match movement {
            Move::Downward | Move::Pillar => MoveResult::infeasible(),
            Move::TraverseNorth | Move::TraverseSouth | Move::TraverseEast | Move::TraverseWest => {
                self.traverse(src, dx, dz)
            }
            Move::AscendNorth | Move::AscendSouth | Move::AscendEast | Move::AscendWest => {
                self.ascend(src, dx, dz)
            }
            Move::DescendNorth | Move::DescendSouth | Move::DescendEast | Move::DescendWest => {
                self.descend(src, dx, dz)
            }
            Move::DiagonalNortheast
            | Move::DiagonalNorthwest
            | Move::DiagonalSoutheast
            | Move::DiagonalSouthwest => self.diagonal(src, dx, dz),
        }
    }
}
