//! SQLite persistence for evaluated expressions and the evaluation cache,
//! plus the on-disk workspace (data directory and `config.toml`).

pub mod config;
pub mod error;
pub mod json_bridge;
pub mod schema;
pub mod store;
pub mod workspace;

pub use config::{Config, EvaluatorConfig, RecommenderConfig};
pub use error::{Result, StoreError};
pub use json_bridge::ImportSummary;
pub use store::Store;
pub use workspace::{DATA_DIR_ENV, EvalOutcome, Workspace, default_base_dir};
