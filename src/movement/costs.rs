//! Action cost constants, in ticks.

/// Sentinel cost for a move that cannot be made.
///
/// Any cost at or above this value is treated as infeasible.
pub const COST_INF: f64 = 1_000_000.0;

/// Walking one block at normal speed
pub const WALK_ONE_BLOCK_COST: f64 = 20.0 / 4.317;

/// Sprinting one block
pub const SPRINT_ONE_BLOCK_COST: f64 = 20.0 / 5.612;

/// Stepping off the edge of a block before a fall
pub const WALK_OFF_BLOCK_COST: f64 = WALK_ONE_BLOCK_COST * 0.8;

/// Re-centering on the landing block after a fall
pub const CENTER_AFTER_FALL_COST: f64 = WALK_ONE_BLOCK_COST - WALK_OFF_BLOCK_COST;

/// Scale applied to block distances by the goal heuristics.
///
/// Slightly below the sprint cost so the estimate stays optimistic for
/// walking moves.
pub const COST_HEURISTIC: f64 = 3.563;

/// Downward velocity after `ticks` ticks of free fall (blocks/tick)
fn fall_velocity(ticks: u32) -> f64 {
    (0.98f64.powi(ticks as i32) - 1.0) * -3.92
}

/// Ticks needed to free-fall the given distance in blocks
pub fn fall_cost(distance: f64) -> f64 {
    if distance <= 0.0 {
        return 0.0;
    }
    let mut remaining = distance;
    let mut ticks = 0u32;
    loop {
        let step = fall_velocity(ticks);
        if step > 0.0 && remaining <= step {
            return ticks as f64 + remaining / step;
        }
        remaining -= step;
        ticks += 1;
    }
}

/// Ticks spent gaining one block of height with a jump
pub fn jump_one_block_cost() -> f64 {
    fall_cost(1.25) - fall_cost(0.25)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fall_cost_monotonic() {
        let mut last = 0.0;
        for n in 1..10 {
            let cost = fall_cost(n as f64);
            assert!(cost > last, "fall cost must grow with distance");
            last = cost;
        }
    }

    #[test]
    fn test_jump_cost_positive() {
        let jump = jump_one_block_cost();
        assert!(jump > 0.0 && jump < WALK_ONE_BLOCK_COST);
    }

    #[test]
    fn test_heuristic_scale_is_optimistic() {
        assert!(COST_HEURISTIC < SPRINT_ONE_BLOCK_COST);
        assert!(SPRINT_ONE_BLOCK_COST < WALK_ONE_BLOCK_COST);
    }
}
