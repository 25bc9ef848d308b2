//! # Marga: Time-Bounded Voxel Path Planning
//!
//! Finds routes through a large, lazily explored 3D grid world under a
//! wall-clock budget, and keeps re-planning while the route is walked.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use marga::core::{Cell, WorldBounds};
//! use marga::goal::Goal;
//! use marga::movement::{VoxelWorld, WalkingModel};
//! use marga::search::{SearchConfig, SearchEngine};
//!
//! let model = Arc::new(WalkingModel::new(VoxelWorld::flat(64)));
//! let engine = SearchEngine::new(
//!     Cell::new(0, 64, 0),
//!     Goal::Block(Cell::new(20, 64, 5)),
//!     model,
//!     WorldBounds::default(),
//!     SearchConfig::default(),
//! );
//! let outcome = engine
//!     .calculate(Duration::from_millis(500), Duration::from_millis(2000))
//!     .unwrap();
//! if let Some(path) = outcome.path() {
//!     println!("{}", path);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: grid cells and world bounds
//! - [`movement`]: candidate moves and the move model capability
//! - [`goal`]: goal kinds and their heuristics
//! - [`search`]: node arena, open set, search engine, path assembly
//! - [`planning`]: coordinator, executors, lifecycle events
//! - [`config`]: TOML configuration

pub mod config;
pub mod core;
pub mod error;
pub mod goal;
pub mod movement;
pub mod planning;
pub mod search;

pub use config::{MargaConfig, PlanningConfig};
pub use error::{MargaError, PlanningError, Result, SearchError};
pub use goal::Goal;
pub use planning::{PathEvent, PlanningCoordinator};
pub use search::{Path, SearchConfig, SearchEngine, SearchHandle, SearchOutcome, SearchStrategy};
