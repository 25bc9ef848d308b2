//! Error types for marga

use thiserror::Error;

use crate::core::Cell;
use crate::movement::Move;

/// Fatal search errors.
///
/// Infeasible moves, deadlines and cancellation are not errors; they come
/// back as [`crate::search::SearchOutcome`] values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// Move model returned a finite non-sentinel cost that is not positive
    #[error("{movement:?} from {from} calculated implausible cost {cost}")]
    ImplausibleCost { movement: Move, from: Cell, cost: f64 },

    /// Relaxation kept improving a node past the expansion cap
    #[error("cost model is not well-founded: {cell} relaxed {relaxations} times with {visited} nodes visited")]
    NonConvergentCost {
        cell: Cell,
        relaxations: usize,
        visited: usize,
    },

    /// Predecessor chain revisits a node
    #[error("predecessor cycle through {cell} after {steps} steps")]
    PredecessorCycle { cell: Cell, steps: usize },

    /// Predecessor chain ends somewhere other than the start
    #[error("predecessor chain from {terminal} ends at {reached}, not the start")]
    DisconnectedChain { terminal: Cell, reached: Cell },

    /// Two distinct cells share a spatial key
    #[error("spatial key {key:#018x} collision between {existing} and {requested}")]
    HashCollision {
        key: u64,
        existing: Cell,
        requested: Cell,
    },

    /// Insert of a node that is already in the open set
    #[error("node {cell} is already open")]
    AlreadyOpen { cell: Cell },

    /// Move model panicked on the search thread
    #[error("search from {start} panicked: {message}")]
    WorkerPanicked { start: Cell, message: String },
}

/// Planning coordinator errors.
#[derive(Error, Debug)]
pub enum PlanningError {
    /// A second background search was requested while one is live
    #[error("a background search is already running")]
    SearchAlreadyRunning,

    /// Search worker thread could not be created
    #[error("failed to spawn search thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// No goal has been set
    #[error("no goal set")]
    NoGoal,
}

/// Top-level error type
#[derive(Error, Debug)]
pub enum MargaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),
}

impl From<toml::de::Error> for MargaError {
    fn from(e: toml::de::Error) -> Self {
        MargaError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MargaError>;
