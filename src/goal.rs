//! Search goals.
//!
//! A [`Goal`] is a membership test plus a heuristic estimate of the
//! remaining cost. The set of goal kinds is closed; composites cover the
//! "any of these" case.

use std::fmt;

use crate::core::Cell;
use crate::movement::costs::{COST_HEURISTIC, fall_cost, jump_one_block_cost};

/// Where a search is trying to get to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Goal {
    /// Exactly this cell
    Block(Cell),
    /// Any cell within `range` blocks (euclidean) of `center`
    Near { center: Cell, range: i32 },
    /// Any height in this column
    XZ { x: i32, z: i32 },
    /// Any cell at this height
    YLevel(i32),
    /// Any cell inside the inclusive box spanned by `min` and `max`
    Region { min: Cell, max: Cell },
    /// Any of the contained goals
    AnyOf(Vec<Goal>),
}

impl Goal {
    /// Box goal from two arbitrary corners
    pub fn region(a: Cell, b: Cell) -> Self {
        Goal::Region {
            min: Cell::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Cell::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Whether the cell satisfies this goal
    pub fn is_in_goal(&self, cell: Cell) -> bool {
        match self {
            Goal::Block(target) => *target == cell,
            Goal::Near { center, range } => {
                let range = *range as f64;
                center.distance_squared(&cell) <= range * range
            }
            Goal::XZ { x, z } => cell.x == *x && cell.z == *z,
            Goal::YLevel(y) => cell.y == *y,
            Goal::Region { min, max } => {
                (min.x..=max.x).contains(&cell.x)
                    && (min.y..=max.y).contains(&cell.y)
                    && (min.z..=max.z).contains(&cell.z)
            }
            Goal::AnyOf(goals) => goals.iter().any(|g| g.is_in_goal(cell)),
        }
    }

    /// Estimated cost from the cell to the goal
    pub fn heuristic(&self, cell: Cell) -> f64 {
        match self {
            Goal::Block(target) | Goal::Near { center: target, .. } => block_heuristic(
                cell.x - target.x,
                cell.y - target.y,
                cell.z - target.z,
            ),
            Goal::XZ { x, z } => xz_heuristic((cell.x - x) as f64, (cell.z - z) as f64),
            Goal::YLevel(y) => y_level_heuristic(*y, cell.y),
            Goal::Region { min, max } => block_heuristic(
                axis_gap(cell.x, min.x, max.x),
                axis_gap(cell.y, min.y, max.y),
                axis_gap(cell.z, min.z, max.z),
            ),
            Goal::AnyOf(goals) => goals
                .iter()
                .map(|g| g.heuristic(cell))
                .fold(f64::INFINITY, f64::min),
        }
    }

    /// Heuristic value at the goal itself, used for ETA estimation
    pub fn heuristic_at_goal(&self) -> f64 {
        match self {
            // Every base heuristic bottoms out at zero on its target
            Goal::Block(_)
            | Goal::Near { .. }
            | Goal::XZ { .. }
            | Goal::YLevel(_)
            | Goal::Region { .. } => 0.0,
            Goal::AnyOf(goals) => goals
                .iter()
                .map(Goal::heuristic_at_goal)
                .fold(f64::INFINITY, f64::min),
        }
    }
}

/// Signed distance from `v` to the interval [lo, hi] (0 inside)
fn axis_gap(v: i32, lo: i32, hi: i32) -> i32 {
    if v < lo {
        v - lo
    } else if v > hi {
        v - hi
    } else {
        0
    }
}

/// Mix of diagonal and straight horizontal distance
fn xz_heuristic(x_diff: f64, z_diff: f64) -> f64 {
    let x = x_diff.abs();
    let z = z_diff.abs();
    let (straight, diagonal) = if x < z { (z - x, x) } else { (x - z, z) };
    (diagonal * std::f64::consts::SQRT_2 + straight) * COST_HEURISTIC
}

/// Vertical cost estimate from `current_y` to `goal_y`
fn y_level_heuristic(goal_y: i32, current_y: i32) -> f64 {
    if current_y > goal_y {
        fall_cost(2.0) / 2.0 * (current_y - goal_y) as f64
    } else if current_y < goal_y {
        (goal_y - current_y) as f64 * jump_one_block_cost()
    } else {
        0.0
    }
}

/// Heuristic for a displacement (current - target)
fn block_heuristic(x_diff: i32, y_diff: i32, z_diff: i32) -> f64 {
    y_level_heuristic(0, y_diff) + xz_heuristic(x_diff as f64, z_diff as f64)
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Goal::Block(cell) => write!(f, "Block{}", cell),
            Goal::Near { center, range } => write!(f, "Near{}±{}", center, range),
            Goal::XZ { x, z } => write!(f, "XZ({}, {})", x, z),
            Goal::YLevel(y) => write!(f, "YLevel({})", y),
            Goal::Region { min, max } => write!(f, "Region{}..{}", min, max),
            Goal::AnyOf(goals) => write!(f, "AnyOf[{} goals]", goals.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_block_membership() {
        let goal = Goal::Block(Cell::new(5, 64, 0));
        assert!(goal.is_in_goal(Cell::new(5, 64, 0)));
        assert!(!goal.is_in_goal(Cell::new(5, 65, 0)));
        assert_relative_eq!(goal.heuristic(Cell::new(5, 64, 0)), 0.0);
    }

    #[test]
    fn test_heuristic_decreases_toward_goal() {
        let goal = Goal::Block(Cell::new(10, 64, 0));
        let far = goal.heuristic(Cell::new(0, 64, 0));
        let near = goal.heuristic(Cell::new(5, 64, 0));
        assert!(near < far);
        assert_relative_eq!(far, 10.0 * COST_HEURISTIC, epsilon = 1e-9);
    }

    #[test]
    fn test_near_tolerance() {
        let goal = Goal::Near {
            center: Cell::new(0, 64, 0),
            range: 2,
        };
        assert!(goal.is_in_goal(Cell::new(2, 64, 0)));
        assert!(goal.is_in_goal(Cell::new(1, 64, 1)));
        assert!(!goal.is_in_goal(Cell::new(2, 64, 1)));
        assert_relative_eq!(goal.heuristic_at_goal(), 0.0);
    }

    #[test]
    fn test_region_is_inclusive() {
        let goal = Goal::region(Cell::new(4, 70, 4), Cell::new(0, 60, 0));
        assert!(goal.is_in_goal(Cell::new(0, 60, 0)));
        assert!(goal.is_in_goal(Cell::new(4, 70, 4)));
        assert!(!goal.is_in_goal(Cell::new(5, 64, 2)));
        assert_relative_eq!(goal.heuristic(Cell::new(2, 64, 2)), 0.0);
        assert!(goal.heuristic(Cell::new(8, 64, 2)) > 0.0);
    }

    #[test]
    fn test_y_level_asymmetry() {
        let goal = Goal::YLevel(64);
        assert!(goal.is_in_goal(Cell::new(100, 64, -7)));
        let above = goal.heuristic(Cell::new(0, 66, 0));
        let below = goal.heuristic(Cell::new(0, 62, 0));
        assert!(above > 0.0 && below > 0.0);
        assert!(above != below);
    }

    #[test]
    fn test_any_of_takes_minimum() {
        let a = Goal::Block(Cell::new(10, 64, 0));
        let b = Goal::Block(Cell::new(2, 64, 0));
        let goal = Goal::AnyOf(vec![a.clone(), b.clone()]);
        let from = Cell::new(0, 64, 0);
        assert_relative_eq!(goal.heuristic(from), b.heuristic(from));
        assert!(goal.is_in_goal(Cell::new(10, 64, 0)));
    }
}
