//! Configuration loading for marga

use crate::core::WorldBounds;
use crate::error::{MargaError, Result};
use crate::search::SearchConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MargaConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub planning: PlanningConfig,
    #[serde(default)]
    pub world: WorldBounds,
}

/// Planning coordinator settings
#[derive(Clone, Debug, Deserialize)]
pub struct PlanningConfig {
    /// Deadline for a fresh search once it is making progress (default: 500)
    #[serde(default = "default_primary_timeout")]
    pub primary_timeout_ms: u64,

    /// Hard deadline for a fresh search (default: 2000)
    #[serde(default = "default_failure_timeout")]
    pub failure_timeout_ms: u64,

    /// Primary deadline for look-ahead searches (default: 4000)
    #[serde(default = "default_plan_ahead_primary_timeout")]
    pub plan_ahead_primary_timeout_ms: u64,

    /// Hard deadline for look-ahead searches (default: 5000)
    #[serde(default = "default_plan_ahead_failure_timeout")]
    pub plan_ahead_failure_timeout_ms: u64,

    /// Start planning the next segment once the current one has fewer than
    /// this many estimated ticks left (default: 150)
    #[serde(default = "default_planning_tick_lookahead")]
    pub planning_tick_lookahead: f64,

    /// Let the executor splice the next segment onto the current one
    #[serde(default = "default_splice_path")]
    pub splice_path: bool,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            primary_timeout_ms: default_primary_timeout(),
            failure_timeout_ms: default_failure_timeout(),
            plan_ahead_primary_timeout_ms: default_plan_ahead_primary_timeout(),
            plan_ahead_failure_timeout_ms: default_plan_ahead_failure_timeout(),
            planning_tick_lookahead: default_planning_tick_lookahead(),
            splice_path: default_splice_path(),
        }
    }
}

impl PlanningConfig {
    /// (primary, failure) deadlines for a search; look-ahead searches get
    /// the longer pair
    pub fn timeouts(&self, plan_ahead: bool) -> (Duration, Duration) {
        let (primary, failure) = if plan_ahead {
            (
                self.plan_ahead_primary_timeout_ms,
                self.plan_ahead_failure_timeout_ms,
            )
        } else {
            (self.primary_timeout_ms, self.failure_timeout_ms)
        };
        (
            Duration::from_millis(primary),
            // failure timeout never undercuts the primary one
            Duration::from_millis(failure.max(primary)),
        )
    }
}

fn default_primary_timeout() -> u64 {
    500
}
fn default_failure_timeout() -> u64 {
    2000
}
fn default_plan_ahead_primary_timeout() -> u64 {
    4000
}
fn default_plan_ahead_failure_timeout() -> u64 {
    5000
}
fn default_planning_tick_lookahead() -> f64 {
    150.0
}
fn default_splice_path() -> bool {
    true
}

impl MargaConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MargaError::Config(format!("Failed to read config file: {}", e)))?;
        let config: MargaConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
