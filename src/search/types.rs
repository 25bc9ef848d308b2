//! Search configuration and result types.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::path::Path;

/// Order in which the frontier is expanded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    /// Priority = cost from start + heuristic
    #[default]
    AStar,
    /// Priority = cost from start
    Dijkstra,
    /// FIFO relaxation queue with a per-node relaxation cap. Not optimal,
    /// slower; a fallback only.
    Relaxation,
}

impl SearchStrategy {
    /// Whether the open-set key includes the goal heuristic
    pub fn uses_heuristic(self) -> bool {
        matches!(self, SearchStrategy::AStar)
    }
}

/// Search engine configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Expansion order
    #[serde(default)]
    pub strategy: SearchStrategy,

    /// Expansions between deadline checks (and best-so-far publication)
    #[serde(default = "default_time_check_interval")]
    pub time_check_interval: u32,

    /// Smallest cost decrease that counts as a relaxation
    #[serde(default = "default_min_improvement")]
    pub min_improvement: f64,

    /// The search counts as failing (only the failure timeout applies) until
    /// its best node is farther than this many blocks from the start
    #[serde(default = "default_min_dist_path")]
    pub min_dist_path: f64,
}

fn default_time_check_interval() -> u32 {
    256
}
fn default_min_improvement() -> f64 {
    0.01
}
fn default_min_dist_path() -> f64 {
    5.0
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::default(),
            time_check_interval: default_time_check_interval(),
            min_improvement: default_min_improvement(),
            min_dist_path: default_min_dist_path(),
        }
    }
}

impl SearchConfig {
    /// Config with a specific strategy and defaults elsewhere
    pub fn with_strategy(strategy: SearchStrategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }
}

/// Lifecycle of one search
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SearchState {
    Ready = 0,
    Running = 1,
    GoalReached = 2,
    TimedOut = 3,
    /// Frontier ran dry without reaching the goal
    Exhausted = 4,
    Cancelled = 5,
    /// Aborted by a fatal error
    Failed = 6,
}

impl SearchState {
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            0 => SearchState::Ready,
            1 => SearchState::Running,
            2 => SearchState::GoalReached,
            3 => SearchState::TimedOut,
            4 => SearchState::Exhausted,
            5 => SearchState::Cancelled,
            _ => SearchState::Failed,
        }
    }

    /// Whether the search has stopped
    pub fn is_terminal(self) -> bool {
        !matches!(self, SearchState::Ready | SearchState::Running)
    }
}

/// What a completed search produced.
#[derive(Clone, Debug)]
pub enum SearchOutcome {
    /// Path ending inside the goal
    ReachedGoal(Path),
    /// Deadline hit or frontier exhausted; path to the most goal-proximate node
    BestEffort(Path),
    /// Nothing improved on the start
    NoPath,
    /// Cancelled from outside; results discarded
    Cancelled,
}

impl SearchOutcome {
    /// The path, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            SearchOutcome::ReachedGoal(p) | SearchOutcome::BestEffort(p) => Some(p),
            SearchOutcome::NoPath | SearchOutcome::Cancelled => None,
        }
    }

    /// Take the path, if any
    pub fn into_path(self) -> Option<Path> {
        match self {
            SearchOutcome::ReachedGoal(p) | SearchOutcome::BestEffort(p) => Some(p),
            SearchOutcome::NoPath | SearchOutcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SearchOutcome::Cancelled)
    }
}
