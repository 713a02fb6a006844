use std::path::{Path, PathBuf};
use std::{env, fs};

use la_core::{
    ExprError, ExprId, ScoredExpression, StoredExpression, Value, check_literal_size,
    content_hash, evaluate, parse_str,
};

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::store::Store;

pub const DATA_DIR_ENV: &str = "LA_DATA_DIR";
pub const DB_FILE: &str = "expressions.db";

/// `$LA_DATA_DIR`, else `~/.linalg-expr`.
pub fn default_base_dir() -> PathBuf {
    if let Some(dir) = env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".linalg-expr")
}

/// Result of evaluating one expression through a workspace.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalOutcome {
    pub value: Value,
    pub canonical: String,
    /// Set when the expression was persisted.
    pub record: Option<StoredExpression>,
    pub cached: bool,
}

/// A data directory: the expression database plus its configuration.
///
/// ```text
/// <base>/
/// ├── expressions.db
/// └── config.toml      (optional)
/// ```
pub struct Workspace {
    store: Store,
    config: Config,
    base_dir: PathBuf,
}

impl Workspace {
    /// Open the workspace at `base_dir`, or at [`default_base_dir`].
    pub fn open(base_dir: Option<&Path>) -> Result<Self> {
        let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
        fs::create_dir_all(&base).map_err(|e| {
            StoreError::InvalidData(format!("failed to create {}: {e}", base.display()))
        })?;
        let config = Config::load(&base)?;
        let mut store = Store::open(&base.join(DB_FILE))?;
        store.set_max_dimension(config.evaluator.max_dimension);
        tracing::info!(dir = %base.display(), "workspace opened");
        Ok(Self {
            store,
            config,
            base_dir: base,
        })
    }

    pub fn open_in_memory(config: Config) -> Result<Self> {
        let mut store = Store::open_in_memory()?;
        store.set_max_dimension(config.evaluator.max_dimension);
        Ok(Self {
            store,
            config,
            base_dir: PathBuf::new(),
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Evaluate `source`, going through the cache, and persist it under
    /// `owner` when `persist` is set. Literals larger than the configured
    /// bound are rejected before any arithmetic runs.
    pub fn eval(&self, source: &str, owner: &str, persist: bool) -> Result<EvalOutcome> {
        let ast = parse_str(source)?;
        check_literal_size(&ast, self.store.max_dimension()).map_err(ExprError::from)?;

        let hash = content_hash(source);
        let (value, cached) = match self.store.cache_get(&hash)? {
            Some(value) => (value, true),
            None => {
                let value = evaluate(&ast).map_err(ExprError::from)?;
                self.store.cache_put(&hash, source, &value)?;
                (value, false)
            }
        };

        let record = if persist {
            let record = StoredExpression::new(source, &value, owner);
            self.store.insert(&record, &value)?;
            tracing::debug!(id = %record.id, "stored expression");
            Some(record)
        } else {
            None
        };

        Ok(EvalOutcome {
            canonical: value.to_string(),
            value,
            record,
            cached,
        })
    }

    /// Suggestions for `ids` using the configured weights; `k` defaults to
    /// the configured count.
    pub fn suggest(&self, ids: &[ExprId], k: Option<usize>) -> Result<Vec<ScoredExpression>> {
        let k = k.unwrap_or(self.config.recommender.default_k);
        self.store.suggest_for(ids, k, self.config.recommender.weights())
    }
}
