//! `config.toml` in the data directory. Every key is optional.
//!
//! ```toml
//! [recommender]
//! default_k = 5
//! w_shape = 1.0
//! w_ops = 2.0
//! w_magnitude = 1.0
//!
//! [evaluator]
//! max_dimension = 64
//! ```

use std::fs;
use std::path::Path;

use la_core::{DEFAULT_K, SimilarityWeights};
use serde::Deserialize;

use crate::error::{Result, StoreError};

pub const CONFIG_FILE: &str = "config.toml";

/// Largest literal vector or matrix side accepted before evaluation.
pub const DEFAULT_MAX_DIMENSION: usize = 64;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub recommender: RecommenderConfig,
    pub evaluator: EvaluatorConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecommenderConfig {
    pub default_k: usize,
    pub w_shape: f64,
    pub w_ops: f64,
    pub w_magnitude: f64,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        let w = SimilarityWeights::default();
        Self {
            default_k: DEFAULT_K,
            w_shape: w.shape,
            w_ops: w.ops,
            w_magnitude: w.magnitude,
        }
    }
}

impl RecommenderConfig {
    pub fn weights(&self) -> SimilarityWeights {
        SimilarityWeights {
            shape: self.w_shape,
            ops: self.w_ops,
            magnitude: self.w_magnitude,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluatorConfig {
    pub max_dimension: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| StoreError::InvalidData(format!("invalid {CONFIG_FILE}: {e}")))?;
        let w = config.recommender.weights();
        if [w.shape, w.ops, w.magnitude]
            .iter()
            .any(|x| !x.is_finite() || *x < 0.0)
        {
            return Err(StoreError::InvalidData(format!(
                "{CONFIG_FILE}: recommender weights must be finite and non-negative"
            )));
        }
        Ok(config)
    }

    /// Load `config.toml` from `dir`; a missing file means defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&content)?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
