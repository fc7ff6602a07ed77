//! Engine configuration.
//!
//! Sandbox limits applied to every compiled script, loadable from JSON. Any
//! field left out takes its default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::script_log::DEFAULT_LOGS_PER_FRAME;

/// Stack every script thread gets before nesting is accounted for.
const BASE_STACK_SIZE: usize = 8 * 1024 * 1024;
/// Stack budgeted per call level or expression level. Unoptimized builds
/// need far more per Rhai frame than release builds.
const STACK_PER_LEVEL: usize = 256 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Maximum expression nesting depth, both at global level and in functions.
    pub max_expr_depth: usize,
    pub max_call_levels: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
    /// Operation budget per run. Zero means unlimited: a script that never
    /// yields is left running until it is replaced.
    pub max_operations: u64,
    pub log_limit_per_frame: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_expr_depth: 64,
            max_call_levels: 64,
            max_string_size: 10_000,
            max_array_size: 10_000,
            max_map_size: 500,
            max_operations: 0,
            log_limit_per_frame: DEFAULT_LOGS_PER_FRAME,
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_expr_depth == 0 {
            return Err(ConfigError::Invalid("maxExprDepth must be positive".into()));
        }
        if self.max_call_levels == 0 {
            return Err(ConfigError::Invalid("maxCallLevels must be positive".into()));
        }
        Ok(())
    }

    /// Stack for a script run's thread, sized so the deepest nesting the
    /// limits allow unwinds with an error instead of overflowing.
    pub fn thread_stack_size(&self) -> usize {
        let levels = self.max_call_levels.saturating_add(self.max_expr_depth);
        BASE_STACK_SIZE.saturating_add(levels.saturating_mul(STACK_PER_LEVEL))
    }

    /// Apply the limits to a Rhai engine.
    pub fn apply(&self, engine: &mut rhai::Engine) {
        engine.set_max_expr_depths(self.max_expr_depth, self.max_expr_depth);
        engine.set_max_call_levels(self.max_call_levels);
        engine.set_max_operations(self.max_operations);
        engine.set_max_string_size(self.max_string_size);
        engine.set_max_array_size(self.max_array_size);
        engine.set_max_map_size(self.max_map_size);
    }
}
