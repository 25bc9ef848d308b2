//! Incremental shortest-path search.
//!
//! This module provides:
//! - [`NodeMap`]: lazily populated per-search node arena
//! - [`OpenSet`]: indexed binary heap with decrease-key
//! - [`SearchEngine`]: deadline-bounded search with cooperative cancellation
//! - [`Path`]: assembled route plus the [`assemble`] predecessor walk
//!
//! # Example
//!
//! ```rust,ignore
//! use marga::search::{SearchConfig, SearchEngine};
//!
//! let engine = SearchEngine::new(start, goal, model, bounds, SearchConfig::default());
//! let handle = engine.handle();
//! let outcome = engine.calculate(primary, failure)?;
//! ```

mod engine;
mod node_map;
mod open_set;
mod path;
mod relaxation;
mod types;

pub use engine::{SearchEngine, SearchHandle};
pub use node_map::{Node, NodeId, NodeMap};
pub use open_set::OpenSet;
pub use path::{Path, assemble};
pub use types::{SearchConfig, SearchOutcome, SearchState, SearchStrategy};
