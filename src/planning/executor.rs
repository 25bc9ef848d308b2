//! Executor collaborators and a reference step executor.
//!
//! The coordinator never moves the agent itself. An [`Actuator`] turns a
//! [`Path`] into an [`Executor`], which is advanced once per tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::core::Cell;
use crate::search::Path;

/// Runs one path segment.
pub trait Executor: Send {
    /// Segment being executed
    fn path(&self) -> &Path;

    /// Advance by one tick. Returns whether stopping right now would leave
    /// movement in a consistent state.
    fn advance_one_step(&mut self) -> bool;

    fn has_failed(&self) -> bool;

    fn has_finished(&self) -> bool;

    /// Whether execution can jump onto `next` right now without losing
    /// progress. May trim `next` to start at the agent's position.
    fn can_splice_early(&self, next: &mut Self) -> bool
    where
        Self: Sized;

    /// Fold `next` into this segment when they join. Returns `self`
    /// unchanged when they do not.
    fn try_splice(self, next: Option<&Self>) -> Self
    where
        Self: Sized;

    /// Estimated ticks left after the movement in progress
    fn ticks_remaining(&self) -> f64;
}

/// Owns the agent's controls.
pub trait Actuator {
    type Executor: Executor;

    /// Start executing a segment
    fn execute(&mut self, path: Path) -> Self::Executor;

    /// Cell the agent's feet are in
    fn position(&self) -> Cell;

    /// Where a new segment should start. Differs from [`Self::position`]
    /// when the agent is mid-air or edging off a block.
    fn segment_start(&self) -> Cell {
        self.position()
    }

    /// Clear every control input
    fn release_controls(&mut self);
}

/// Lock-free agent position.
/// Packs the cell into one atomic u64.
#[derive(Debug)]
pub struct AgentPosition(AtomicU64);

impl AgentPosition {
    pub fn new(cell: Cell) -> Self {
        Self(AtomicU64::new(cell.to_packed()))
    }

    pub fn load(&self, order: Ordering) -> Cell {
        Cell::from_packed(self.0.load(order))
    }

    pub fn store(&self, cell: Cell, order: Ordering) {
        self.0.store(cell.to_packed(), order);
    }
}

/// Ticks needed to complete a movement of the given cost
#[inline]
fn movement_ticks(cost: f64) -> u32 {
    (cost.ceil() as u32).max(1)
}

/// Walks a path one movement at a time, taking `ceil(cost)` ticks per
/// movement. Fails as soon as the agent is not where the path expects.
#[derive(Debug)]
pub struct StepExecutor {
    path: Path,
    /// Index of the position the agent should be at
    position: usize,
    /// Ticks spent on the movement out of `position`
    ticks_into_movement: u32,
    agent: Arc<AgentPosition>,
    failed: bool,
    finished: bool,
}

impl StepExecutor {
    pub fn new(path: Path, agent: Arc<AgentPosition>) -> Self {
        let finished = path.len() <= 1;
        Self {
            path,
            position: 0,
            ticks_into_movement: 0,
            agent,
            failed: false,
            finished,
        }
    }

    /// Index of the position the agent is at along the path
    pub fn position_index(&self) -> usize {
        self.position
    }
}

impl Executor for StepExecutor {
    fn path(&self) -> &Path {
        &self.path
    }

    fn advance_one_step(&mut self) -> bool {
        if self.failed || self.finished {
            return true;
        }
        let expected = self.path.positions()[self.position];
        let actual = self.agent.load(Ordering::Acquire);
        if actual != expected {
            warn!(
                "[Executor] agent at {} but path expects {}, failing segment",
                actual, expected
            );
            self.failed = true;
            return true;
        }

        self.ticks_into_movement += 1;
        let needed = movement_ticks(self.path.step_cost(self.position + 1));
        if self.ticks_into_movement < needed {
            return false;
        }

        self.ticks_into_movement = 0;
        self.position += 1;
        self.agent
            .store(self.path.positions()[self.position], Ordering::Release);
        if self.position + 1 >= self.path.len() {
            self.finished = true;
        }
        true
    }

    fn has_failed(&self) -> bool {
        self.failed
    }

    fn has_finished(&self) -> bool {
        self.finished
    }

    fn can_splice_early(&self, next: &mut Self) -> bool {
        if self.ticks_into_movement != 0 {
            return false;
        }
        let here = self.agent.load(Ordering::Acquire);
        match next.path.index_of(here) {
            Some(index) => {
                next.position = index;
                next.ticks_into_movement = 0;
                next.finished = index + 1 >= next.path.len();
                true
            }
            None => false,
        }
    }

    fn try_splice(self, next: Option<&Self>) -> Self {
        let Some(next) = next else {
            return self;
        };
        let joins_ahead = self
            .path
            .index_of(next.path.src())
            .is_some_and(|join| join >= self.position);
        if !joins_ahead {
            return self;
        }
        let spliced = self.path.splice(&next.path);
        match spliced {
            Some(joined) => {
                debug!("[Executor] spliced next segment, now ending at {}", joined.dest());
                let finished = self.position + 1 >= joined.len();
                Self {
                    path: joined,
                    finished,
                    ..self
                }
            }
            None => self,
        }
    }

    fn ticks_remaining(&self) -> f64 {
        self.path
            .cost_between(self.position + 1, self.path.len().saturating_sub(1))
    }
}

/// Actuator driving [`StepExecutor`]s over a shared [`AgentPosition`].
#[derive(Debug)]
pub struct StepActuator {
    agent: Arc<AgentPosition>,
    releases: usize,
}

impl StepActuator {
    pub fn new(start: Cell) -> Self {
        Self {
            agent: Arc::new(AgentPosition::new(start)),
            releases: 0,
        }
    }

    /// Shared position the executors move
    pub fn agent(&self) -> Arc<AgentPosition> {
        Arc::clone(&self.agent)
    }

    /// Times controls were released
    pub fn releases(&self) -> usize {
        self.releases
    }
}

impl Actuator for StepActuator {
    type Executor = StepExecutor;

    fn execute(&mut self, path: Path) -> StepExecutor {
        StepExecutor::new(path, Arc::clone(&self.agent))
    }

    fn position(&self) -> Cell {
        self.agent.load(Ordering::Acquire)
    }

    fn release_controls(&mut self) {
        self.releases += 1;
        debug!("[Executor] controls released");
    }
}
