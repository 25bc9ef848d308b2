//! Search Engine Property Tests
//!
//! Runs whole searches against small synthetic worlds and checks the
//! properties callers rely on:
//! - Dijkstra finds the cheapest route (checked against a brute-force sweep)
//! - Every route is contiguous and starts where it was asked to
//! - Cancellation, deadlines and exhaustion end the search cleanly
//! - Identical inputs give identical routes
//! - Broken cost models abort instead of producing garbage
//!
//! Run with: `cargo test --test search_properties`

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use marga::SearchError;
use marga::core::{Cell, WorldBounds};
use marga::goal::Goal;
use marga::movement::{Move, MoveModel, MoveResult, VoxelWorld, WalkingModel};
use marga::search::{SearchConfig, SearchEngine, SearchOutcome, SearchState, SearchStrategy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const LONG: Duration = Duration::from_secs(30);
const Y: i32 = 64;

// ============================================================================
// Test Models
// ============================================================================

/// Unit-cost steps along the x axis
struct LineModel;

impl MoveModel for LineModel {
    fn apply(&self, x: i32, y: i32, z: i32, movement: Move) -> MoveResult {
        match movement {
            Move::TraverseEast => MoveResult::new(Cell::new(x + 1, y, z), 1.0),
            Move::TraverseWest => MoveResult::new(Cell::new(x - 1, y, z), 1.0),
            _ => MoveResult::infeasible(),
        }
    }
}

/// Flat square grid where entering a column costs a per-column weight.
/// Only the four straight traverses are feasible.
struct WeightedGrid {
    half: i32,
    weights: Vec<f64>,
}

impl WeightedGrid {
    fn random(half: i32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let side = (2 * half + 1) as usize;
        let weights = (0..side * side)
            .map(|_| rng.random_range(1.0..10.0))
            .collect();
        Self { half, weights }
    }

    fn side(&self) -> usize {
        (2 * self.half + 1) as usize
    }

    fn index(&self, x: i32, z: i32) -> Option<usize> {
        if x.abs() > self.half || z.abs() > self.half {
            return None;
        }
        Some((x + self.half) as usize * self.side() + (z + self.half) as usize)
    }

    /// Cheapest cost from `from` to every column, by repeated sweeps
    fn brute_force_cost(&self, from: (i32, i32), to: (i32, i32)) -> f64 {
        let mut dist = vec![f64::INFINITY; self.side() * self.side()];
        if let Some(i) = self.index(from.0, from.1) {
            dist[i] = 0.0;
        }
        loop {
            let mut changed = false;
            for x in -self.half..=self.half {
                for z in -self.half..=self.half {
                    let Some(here) = self.index(x, z) else { continue };
                    if dist[here].is_infinite() {
                        continue;
                    }
                    for (dx, dz) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                        let Some(there) = self.index(x + dx, z + dz) else { continue };
                        let candidate = dist[here] + self.weights[there];
                        if candidate < dist[there] {
                            dist[there] = candidate;
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }
        self.index(to.0, to.1).map_or(f64::INFINITY, |i| dist[i])
    }
}

impl MoveModel for WeightedGrid {
    fn apply(&self, x: i32, y: i32, z: i32, movement: Move) -> MoveResult {
        let (dx, dz) = match movement {
            Move::TraverseEast => (1, 0),
            Move::TraverseWest => (-1, 0),
            Move::TraverseSouth => (0, 1),
            Move::TraverseNorth => (0, -1),
            _ => return MoveResult::infeasible(),
        };
        match self.index(x + dx, z + dz) {
            Some(i) => MoveResult::new(Cell::new(x + dx, y, z + dz), self.weights[i]),
            None => MoveResult::infeasible(),
        }
    }
}

/// Delays every query so searches run long enough to interrupt
struct SlowModel<M> {
    inner: M,
    delay: Duration,
}

impl<M: MoveModel> MoveModel for SlowModel<M> {
    fn apply(&self, x: i32, y: i32, z: i32, movement: Move) -> MoveResult {
        thread::sleep(self.delay);
        self.inner.apply(x, y, z, movement)
    }
}

/// Reports a free eastward step, which no real movement can be
struct FreeStepModel;

impl MoveModel for FreeStepModel {
    fn apply(&self, x: i32, y: i32, z: i32, movement: Move) -> MoveResult {
        match movement {
            Move::TraverseEast => MoveResult::new(Cell::new(x + 1, y, z), 0.0),
            _ => MoveResult::infeasible(),
        }
    }
}

fn search<M: MoveModel>(
    model: M,
    goal: Goal,
    bounds: WorldBounds,
    config: SearchConfig,
) -> SearchEngine<M> {
    SearchEngine::new(Cell::new(0, Y, 0), goal, Arc::new(model), bounds, config)
}

/// Walled course: a wall at x = 6 with a single gap at z = 4
fn walled_world() -> VoxelWorld {
    let mut world = VoxelWorld::flat(Y);
    for z in -8..=8 {
        if z != 4 {
            world.add_wall(6, z, 3);
        }
    }
    world
}

fn assert_contiguous(positions: &[Cell]) {
    for pair in positions.windows(2) {
        let step = pair[1] - pair[0];
        assert!(
            step.x.abs() <= 1 && step.z.abs() <= 1 && step.y <= 1,
            "{} -> {} is not a single movement",
            pair[0],
            pair[1]
        );
        assert_ne!(pair[0], pair[1], "route stands still at {}", pair[0]);
    }
}

// ============================================================================
// Optimality
// ============================================================================

#[test]
fn test_dijkstra_matches_brute_force() {
    for seed in [1, 7, 42] {
        let grid = WeightedGrid::random(5, seed);
        let expected = grid.brute_force_cost((0, 0), (4, -3));
        let config = SearchConfig {
            min_improvement: 0.0,
            ..SearchConfig::with_strategy(SearchStrategy::Dijkstra)
        };
        let engine = search(
            grid,
            Goal::Block(Cell::new(4, Y, -3)),
            WorldBounds::square(5),
            config,
        );
        let outcome = engine.calculate(LONG, LONG).unwrap();
        let SearchOutcome::ReachedGoal(path) = outcome else {
            panic!("seed {}: expected the goal to be reached", seed);
        };
        assert_relative_eq!(path.total_cost(), expected, epsilon = 1e-9);
    }
}

#[test]
fn test_dijkstra_never_worse_than_astar() {
    let goal = Goal::Block(Cell::new(14, Y, 0));
    let dijkstra = search(
        WalkingModel::new(walled_world()),
        goal.clone(),
        WorldBounds::square(20),
        SearchConfig::with_strategy(SearchStrategy::Dijkstra),
    )
    .calculate(LONG, LONG)
    .unwrap();
    let astar = search(
        WalkingModel::new(walled_world()),
        goal,
        WorldBounds::square(20),
        SearchConfig::with_strategy(SearchStrategy::AStar),
    )
    .calculate(LONG, LONG)
    .unwrap();

    let d = dijkstra.path().unwrap();
    let a = astar.path().unwrap();
    assert!(d.reaches_goal() && a.reaches_goal());
    // Each relaxation may skip up to min_improvement
    let slack = d.num_movements() as f64 * 0.01;
    assert!(d.total_cost() <= a.total_cost() + slack);
}

// ============================================================================
// Route Shape
// ============================================================================

#[test]
fn test_route_through_gap_is_contiguous() {
    for strategy in [
        SearchStrategy::AStar,
        SearchStrategy::Dijkstra,
        SearchStrategy::Relaxation,
    ] {
        let engine = search(
            WalkingModel::new(walled_world()),
            Goal::Block(Cell::new(12, Y, 0)),
            WorldBounds::square(20),
            SearchConfig::with_strategy(strategy),
        );
        let outcome = engine.calculate(LONG, LONG).unwrap();
        let path = outcome.path().unwrap();

        assert_eq!(path.src(), Cell::new(0, Y, 0));
        assert_eq!(path.dest(), Cell::new(12, Y, 0));
        assert_contiguous(path.positions());
        // Must cross the wall line through the gap or around an end
        let crossing = path.positions().iter().find(|c| c.x == 6).unwrap();
        assert!(
            crossing.z == 4 || crossing.z.abs() > 8,
            "{:?} walked through the wall at {}",
            strategy,
            crossing
        );
        if strategy != SearchStrategy::Relaxation {
            assert_eq!(crossing.z, 4);
        }
    }
}

#[test]
fn test_five_unit_steps() {
    let engine = search(
        LineModel,
        Goal::Block(Cell::new(5, Y, 0)),
        WorldBounds::default(),
        SearchConfig::default(),
    );
    let path = engine.calculate(LONG, LONG).unwrap().into_path().unwrap();

    let expected: Vec<Cell> = (0..=5).map(|x| Cell::new(x, Y, 0)).collect();
    assert_eq!(path.positions(), expected.as_slice());
    assert_relative_eq!(path.total_cost(), 5.0);
    for i in 1..=5 {
        assert_relative_eq!(path.step_cost(i), 1.0);
    }
}

#[test]
fn test_identical_inputs_identical_routes() {
    let run = || {
        search(
            WalkingModel::new(walled_world()),
            Goal::Block(Cell::new(10, Y, -5)),
            WorldBounds::square(20),
            SearchConfig::default(),
        )
        .calculate(LONG, LONG)
        .unwrap()
        .into_path()
        .unwrap()
    };
    let first = run();
    let second = run();
    assert_eq!(first.positions(), second.positions());
    assert_eq!(first.num_nodes_considered(), second.num_nodes_considered());
}

#[test]
fn test_start_in_goal() {
    let engine = search(
        LineModel,
        Goal::Block(Cell::new(0, Y, 0)),
        WorldBounds::default(),
        SearchConfig::default(),
    );
    let path = engine.calculate(LONG, LONG).unwrap().into_path().unwrap();
    assert_eq!(path.len(), 1);
    assert_eq!(path.num_movements(), 0);
}

// ============================================================================
// Interruption
// ============================================================================

#[test]
fn test_cancel_from_another_thread() {
    let engine = search(
        SlowModel {
            inner: WalkingModel::new(VoxelWorld::flat(Y)),
            delay: Duration::from_micros(200),
        },
        Goal::Block(Cell::new(5000, Y, 0)),
        WorldBounds::default(),
        SearchConfig {
            time_check_interval: 4,
            ..Default::default()
        },
    );
    let handle = engine.handle();
    let worker = thread::spawn(move || engine.calculate(LONG, LONG));

    // Wait for the first published best-so-far route
    let waited = Instant::now();
    while handle.best_path_so_far().is_none() {
        assert!(waited.elapsed() < Duration::from_secs(10), "nothing published");
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(handle.state(), SearchState::Running);
    let partial = handle.best_path_so_far().unwrap();
    assert_eq!(partial.src(), Cell::new(0, Y, 0));
    assert_contiguous(partial.positions());

    assert!(handle.cancel());
    let outcome = worker.join().unwrap().unwrap();
    assert!(outcome.is_cancelled());
    assert_eq!(handle.state(), SearchState::Cancelled);
}

#[test]
fn test_deadline_returns_best_effort() {
    let engine = search(
        SlowModel {
            inner: WalkingModel::new(VoxelWorld::flat(Y)),
            delay: Duration::from_micros(100),
        },
        Goal::Block(Cell::new(10_000, Y, 0)),
        WorldBounds::default(),
        SearchConfig {
            time_check_interval: 8,
            ..Default::default()
        },
    );
    let handle = engine.handle();
    let started = Instant::now();
    let outcome = engine
        .calculate(Duration::from_millis(100), Duration::from_millis(300))
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(handle.state(), SearchState::TimedOut);
    let SearchOutcome::BestEffort(path) = outcome else {
        panic!("expected a best-effort route");
    };
    assert_eq!(path.src(), Cell::new(0, Y, 0));
    assert!(path.dest().x > 0);
    assert!(!path.reaches_goal());
    assert_contiguous(path.positions());
}

#[test]
fn test_unreachable_goal_exhausts() {
    // Only eastward steps, goal to the west
    let engine = search(
        LineModel,
        Goal::Block(Cell::new(-4, Y, 0)),
        WorldBounds {
            min_x: 0,
            ..WorldBounds::square(6)
        },
        SearchConfig::default(),
    );
    let handle = engine.handle();
    let outcome = engine.calculate(LONG, LONG).unwrap();
    assert!(matches!(outcome, SearchOutcome::NoPath));
    assert_eq!(handle.state(), SearchState::Exhausted);
}

// ============================================================================
// Broken Models
// ============================================================================

#[test]
fn test_free_movement_aborts() {
    let engine = search(
        FreeStepModel,
        Goal::Block(Cell::new(5, Y, 0)),
        WorldBounds::default(),
        SearchConfig::default(),
    );
    let handle = engine.handle();
    match engine.calculate(LONG, LONG) {
        Err(SearchError::ImplausibleCost { movement, from, cost }) => {
            assert_eq!(movement, Move::TraverseEast);
            assert_eq!(from, Cell::new(0, Y, 0));
            assert_eq!(cost, 0.0);
        }
        other => panic!("expected an implausible cost error, got {:?}", other),
    }
    assert_eq!(handle.state(), SearchState::Failed);
}
