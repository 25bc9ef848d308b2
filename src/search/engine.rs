//! Deadline-bounded incremental search.
//!
//! The graph is never materialised: nodes appear in the [`NodeMap`] the
//! first time a move lands on them. Each run ends in one of four ways:
//! the goal is extracted, the frontier runs dry, a deadline passes, or the
//! search is cancelled through its [`SearchHandle`]. The first three
//! produce a path when one exists; cancellation never does.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::node_map::{NodeId, NodeMap};
use super::open_set::OpenSet;
use super::path::{Path, assemble};
use super::relaxation;
use super::types::{SearchConfig, SearchOutcome, SearchState, SearchStrategy};
use crate::core::{Cell, WorldBounds};
use crate::error::SearchError;
use crate::goal::Goal;
use crate::movement::{COST_INF, Move, MoveModel};

struct SharedSearch {
    start: Cell,
    cancel: AtomicBool,
    state: AtomicU8,
    best_so_far: Mutex<Option<Path>>,
}

/// Cross-thread view of one search.
///
/// Cheap to clone; every clone observes the same search.
#[derive(Clone)]
pub struct SearchHandle {
    shared: Arc<SharedSearch>,
}

impl SearchHandle {
    fn new(start: Cell) -> Self {
        Self {
            shared: Arc::new(SharedSearch {
                start,
                cancel: AtomicBool::new(false),
                state: AtomicU8::new(SearchState::Ready as u8),
                best_so_far: Mutex::new(None),
            }),
        }
    }

    /// Request cancellation. Returns true only for the call that set the flag.
    pub fn cancel(&self) -> bool {
        !self.shared.cancel.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SearchState {
        SearchState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Cell the search started from
    pub fn start(&self) -> Cell {
        self.shared.start
    }

    /// Latest published best-so-far route, if any
    pub fn best_path_so_far(&self) -> Option<Path> {
        self.shared.best_so_far.lock().clone()
    }

    /// Whether both handles observe the same search
    pub fn is_same_search(&self, other: &SearchHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn set_state(&self, state: SearchState) {
        self.shared.state.store(state as u8, Ordering::Release);
    }

    fn publish(&self, path: Path) {
        *self.shared.best_so_far.lock() = Some(path);
    }
}

impl std::fmt::Debug for SearchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchHandle")
            .field("start", &self.shared.start)
            .field("state", &self.state())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// One search from a start cell to a goal.
///
/// Consumed by [`SearchEngine::calculate`]; a new search needs a new engine.
pub struct SearchEngine<M: MoveModel + ?Sized> {
    start: Cell,
    goal: Goal,
    model: Arc<M>,
    bounds: WorldBounds,
    config: SearchConfig,
    handle: SearchHandle,
}

impl<M: MoveModel + ?Sized> SearchEngine<M> {
    pub fn new(
        start: Cell,
        goal: Goal,
        model: Arc<M>,
        bounds: WorldBounds,
        config: SearchConfig,
    ) -> Self {
        Self {
            start,
            goal,
            model,
            bounds,
            config,
            handle: SearchHandle::new(start),
        }
    }

    /// Handle for cancelling or observing this search from elsewhere
    pub fn handle(&self) -> SearchHandle {
        self.handle.clone()
    }

    pub fn start(&self) -> Cell {
        self.start
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    /// Run to completion.
    ///
    /// `primary` applies once the search is making headway; `failure` is
    /// the hard limit. Infeasible moves, deadlines and cancellation are
    /// reported through the outcome; only fatal defects are errors.
    pub fn calculate(
        self,
        primary: Duration,
        failure: Duration,
    ) -> Result<SearchOutcome, SearchError> {
        let handle = self.handle.clone();
        if handle.is_cancelled() {
            handle.set_state(SearchState::Cancelled);
            return Ok(SearchOutcome::Cancelled);
        }
        handle.set_state(SearchState::Running);

        let result = self.run(primary, failure.max(primary));
        let state = match &result {
            Ok((_, state)) => *state,
            Err(_) => SearchState::Failed,
        };
        handle.set_state(state);
        result.map(|(outcome, _)| outcome)
    }

    fn run(
        self,
        primary: Duration,
        failure: Duration,
    ) -> Result<(SearchOutcome, SearchState), SearchError> {
        let strategy = self.config.strategy;
        let mut session = Session::new(self, primary, failure)?;
        let (stop, frontier) = match strategy {
            SearchStrategy::AStar | SearchStrategy::Dijkstra => run_priority(&mut session)?,
            SearchStrategy::Relaxation => relaxation::run(&mut session)?,
        };
        session.log_stats(frontier);
        session.finish(stop)
    }
}

/// Why a search loop stopped
pub(super) enum Stop {
    Goal(NodeId),
    TimedOut,
    Exhausted,
    Cancelled,
}

/// A feasible, validated successor of an expanded node
pub(super) struct Successor {
    pub cell: Cell,
    pub cost: f64,
}

/// Mutable state of one running search, shared by both loop strategies.
pub(super) struct Session<M: MoveModel + ?Sized> {
    pub start: Cell,
    pub goal: Goal,
    model: Arc<M>,
    bounds: WorldBounds,
    pub config: SearchConfig,
    handle: SearchHandle,
    pub nodes: NodeMap,
    pub start_id: NodeId,
    best: NodeId,
    published_best: Option<NodeId>,
    started: Instant,
    primary: Duration,
    failure: Duration,
    expansions: u64,
    movements_considered: u64,
}

impl<M: MoveModel + ?Sized> Session<M> {
    fn new(
        engine: SearchEngine<M>,
        primary: Duration,
        failure: Duration,
    ) -> Result<Self, SearchError> {
        let mut nodes = NodeMap::new();
        let goal = engine.goal;
        let start_id = nodes.get_or_create(engine.start, |c| goal.heuristic(c))?;
        let start_node = &mut nodes[start_id];
        start_node.cost = 0.0;
        start_node.combined_cost = if engine.config.strategy.uses_heuristic() {
            start_node.estimated_cost_to_goal
        } else {
            0.0
        };
        Ok(Self {
            start: engine.start,
            goal,
            model: engine.model,
            bounds: engine.bounds,
            config: engine.config,
            handle: engine.handle,
            nodes,
            start_id,
            best: start_id,
            published_best: None,
            started: Instant::now(),
            primary,
            failure,
            expansions: 0,
            movements_considered: 0,
        })
    }

    #[inline]
    pub fn cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    /// Count an expansion; on every time-check interval publish the
    /// best-so-far route and report whether a deadline has passed.
    pub fn tick_expansion(&mut self) -> Result<bool, SearchError> {
        self.expansions += 1;
        let interval = u64::from(self.config.time_check_interval.max(1));
        if self.expansions % interval != 0 {
            return Ok(false);
        }
        self.publish_best()?;
        Ok(self.deadline_passed())
    }

    fn deadline_passed(&self) -> bool {
        let elapsed = self.started.elapsed();
        elapsed >= self.failure || (!self.is_failing() && elapsed >= self.primary)
    }

    /// True until the best node is more than `min_dist_path` from the start
    pub fn is_failing(&self) -> bool {
        let min = self.config.min_dist_path;
        self.start.distance_squared(&self.nodes[self.best].cell) <= min * min
    }

    fn publish_best(&mut self) -> Result<(), SearchError> {
        if self.best == self.start_id || self.published_best == Some(self.best) {
            return Ok(());
        }
        let path = assemble(
            &self.nodes,
            self.start_id,
            self.best,
            self.nodes.len(),
            &self.goal,
        )?;
        self.handle.publish(path);
        self.published_best = Some(self.best);
        Ok(())
    }

    /// Feasible successors of `from`, in move order.
    ///
    /// Moves whose nominal destination leaves the world are never offered
    /// to the model. Non-positive or NaN costs abort the search.
    pub fn successors(&mut self, from: Cell, out: &mut Vec<Successor>) -> Result<(), SearchError> {
        out.clear();
        for movement in Move::ALL {
            let nominal = movement.nominal_destination(from);
            if !self.bounds.contains(nominal.x, nominal.z) || !self.bounds.contains_y(nominal.y) {
                continue;
            }
            self.movements_considered += 1;
            let result = self.model.apply(from.x, from.y, from.z, movement);
            if result.cost >= COST_INF {
                continue;
            }
            if result.cost.is_nan() || result.cost <= 0.0 {
                return Err(SearchError::ImplausibleCost {
                    movement,
                    from,
                    cost: result.cost,
                });
            }
            let cell = result.destination();
            if !self.bounds.contains_cell(cell) {
                continue;
            }
            out.push(Successor {
                cell,
                cost: result.cost,
            });
        }
        Ok(())
    }

    /// Node for a successor cell, created on first visit
    pub fn node_for(&mut self, cell: Cell) -> Result<NodeId, SearchError> {
        let goal = &self.goal;
        self.nodes.get_or_create(cell, |c| goal.heuristic(c))
    }

    /// Apply a relaxation if it improves `to` by more than the threshold.
    ///
    /// Returns whether the node changed.
    pub fn relax(&mut self, from: NodeId, to: NodeId, move_cost: f64) -> bool {
        let tentative = self.nodes[from].cost + move_cost;
        let uses_heuristic = self.config.strategy.uses_heuristic();
        let best_h = self.nodes[self.best].estimated_cost_to_goal;
        let node = &mut self.nodes[to];
        if node.cost - tentative <= self.config.min_improvement {
            return false;
        }
        node.previous = Some(from);
        node.cost = tentative;
        node.combined_cost = if uses_heuristic {
            tentative + node.estimated_cost_to_goal
        } else {
            tentative
        };
        if node.estimated_cost_to_goal < best_h {
            self.best = to;
        }
        true
    }

    fn log_stats(&self, frontier: usize) {
        let elapsed = self.started.elapsed();
        let secs = elapsed.as_secs_f64().max(1e-6);
        debug!(
            "[Search] {} movements considered, open set size {}, node map size {}, {:.0} nodes per second",
            self.movements_considered,
            frontier,
            self.nodes.len(),
            self.nodes.len() as f64 / secs
        );
        trace!(
            "[Search] {} expansions in {}ms",
            self.expansions,
            elapsed.as_millis()
        );
    }

    fn finish(self, stop: Stop) -> Result<(SearchOutcome, SearchState), SearchError> {
        let visited = self.nodes.len();
        match stop {
            Stop::Cancelled => Ok((SearchOutcome::Cancelled, SearchState::Cancelled)),
            Stop::Goal(terminal) => {
                let path = assemble(&self.nodes, self.start_id, terminal, visited, &self.goal)?;
                debug!(
                    "[Search] goal reached in {}ms: {}",
                    self.started.elapsed().as_millis(),
                    path
                );
                Ok((SearchOutcome::ReachedGoal(path), SearchState::GoalReached))
            }
            Stop::TimedOut | Stop::Exhausted => {
                let state = if matches!(stop, Stop::TimedOut) {
                    SearchState::TimedOut
                } else {
                    SearchState::Exhausted
                };
                let start_h = self.nodes[self.start_id].estimated_cost_to_goal;
                if self.best == self.start_id
                    || self.nodes[self.best].estimated_cost_to_goal >= start_h
                {
                    debug!("[Search] {:?} with nothing better than the start", state);
                    return Ok((SearchOutcome::NoPath, state));
                }
                let path = assemble(&self.nodes, self.start_id, self.best, visited, &self.goal)?;
                debug!(
                    "[Search] {:?} after {}ms, best effort {}",
                    state,
                    self.started.elapsed().as_millis(),
                    path
                );
                Ok((SearchOutcome::BestEffort(path), state))
            }
        }
    }
}

/// Priority-ordered expansion (A* or Dijkstra keys).
///
/// Closed nodes are never reopened.
fn run_priority<M: MoveModel + ?Sized>(
    session: &mut Session<M>,
) -> Result<(Stop, usize), SearchError> {
    let mut open = OpenSet::new();
    open.insert(&mut session.nodes, session.start_id)?;
    let mut successors = Vec::with_capacity(Move::ALL.len());

    loop {
        if session.cancelled() {
            return Ok((Stop::Cancelled, open.len()));
        }
        if session.tick_expansion()? {
            return Ok((Stop::TimedOut, open.len()));
        }
        let Some(current) = open.remove_min(&mut session.nodes) else {
            return Ok((Stop::Exhausted, 0));
        };
        session.nodes[current].closed = true;

        let cell = session.nodes[current].cell;
        if session.goal.is_in_goal(cell) {
            return Ok((Stop::Goal(current), open.len()));
        }

        session.successors(cell, &mut successors)?;
        for succ in successors.iter() {
            let neighbor = session.node_for(succ.cell)?;
            if session.nodes[neighbor].closed {
                continue;
            }
            if session.relax(current, neighbor, succ.cost) {
                if open.is_open(&session.nodes, neighbor) {
                    open.update(&mut session.nodes, neighbor);
                } else {
                    open.insert(&mut session.nodes, neighbor)?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::{MoveResult, VoxelWorld, WalkingModel};
    use approx::assert_relative_eq;

    const LONG: Duration = Duration::from_secs(30);

    /// Unit-cost steps along x only
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

    fn engine<M: MoveModel>(model: M, goal: Goal, strategy: SearchStrategy) -> SearchEngine<M> {
        SearchEngine::new(
            Cell::new(0, 64, 0),
            goal,
            Arc::new(model),
            WorldBounds::default(),
            SearchConfig::with_strategy(strategy),
        )
    }

    #[test]
    fn test_straight_line() {
        let engine = engine(
            LineModel,
            Goal::Block(Cell::new(5, 64, 0)),
            SearchStrategy::AStar,
        );
        let handle = engine.handle();
        let outcome = engine.calculate(LONG, LONG).unwrap();
        let path = outcome.path().unwrap();
        assert!(matches!(outcome, SearchOutcome::ReachedGoal(_)));
        assert_eq!(path.num_movements(), 5);
        assert_relative_eq!(path.total_cost(), 5.0);
        assert_eq!(handle.state(), SearchState::GoalReached);
    }

    #[test]
    fn test_cancel_before_start() {
        let engine = engine(
            LineModel,
            Goal::Block(Cell::new(5, 64, 0)),
            SearchStrategy::AStar,
        );
        let handle = engine.handle();
        assert!(handle.cancel());
        assert!(!handle.cancel());
        let outcome = engine.calculate(LONG, LONG).unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(handle.state(), SearchState::Cancelled);
    }

    fn bounded_line(goal: Goal) -> SearchEngine<LineModel> {
        SearchEngine::new(
            Cell::new(0, 64, 0),
            goal,
            Arc::new(LineModel),
            WorldBounds::square(3),
            SearchConfig::default(),
        )
    }

    #[test]
    fn test_exhausted_returns_best_effort() {
        // Goal lies past the border; the closest reachable x is 3
        let engine = bounded_line(Goal::Block(Cell::new(10, 64, 0)));
        let handle = engine.handle();
        let outcome = engine.calculate(LONG, LONG).unwrap();
        match outcome {
            SearchOutcome::BestEffort(path) => assert_eq!(path.dest(), Cell::new(3, 64, 0)),
            other => panic!("expected best effort, got {:?}", other),
        }
        assert_eq!(handle.state(), SearchState::Exhausted);
    }

    #[test]
    fn test_nothing_better_than_start() {
        // Every reachable cell is farther from the goal than the start
        let engine = bounded_line(Goal::Block(Cell::new(0, 80, 0)));
        let handle = engine.handle();
        let outcome = engine.calculate(LONG, LONG).unwrap();
        assert!(matches!(outcome, SearchOutcome::NoPath));
        assert_eq!(handle.state(), SearchState::Exhausted);
        assert!(handle.best_path_so_far().is_none());
    }

    #[test]
    fn test_dijkstra_matches_astar_cost() {
        let mut world = VoxelWorld::flat(64);
        for z in -3..=3 {
            world.add_wall(3, z, 2);
        }
        let model = WalkingModel::new(world);
        let goal = Goal::Block(Cell::new(6, 64, 0));
        let a = engine(model.clone(), goal.clone(), SearchStrategy::AStar)
            .calculate(LONG, LONG)
            .unwrap();
        let d = engine(model, goal, SearchStrategy::Dijkstra)
            .calculate(LONG, LONG)
            .unwrap();
        let (a, d) = (a.path().unwrap(), d.path().unwrap());
        assert!(a.reaches_goal() && d.reaches_goal());
        assert_relative_eq!(a.total_cost(), d.total_cost(), epsilon = 0.05);
        assert!(d.num_nodes_considered() >= a.num_nodes_considered());
    }
}
