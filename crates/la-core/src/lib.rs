//! Linear-algebra expression language.
//!
//! Text is tokenized, parsed into an immutable tree and evaluated to a
//! scalar, vector or matrix by a single post-order walk. Evaluated
//! expressions can be summarised as feature vectors and ranked against each
//! other for recommendations.
//!
//! Zero I/O: persistence, transport and logging belong to the callers.

pub mod ast;
pub mod builtins;
pub mod cache;
pub mod constants;
pub mod error;
pub mod features;
pub mod interpreter;
pub mod lexer;
pub mod linalg;
pub mod parser;
pub mod recommend;
pub mod record;
pub mod serde_compat;
pub mod time;
pub mod value;

pub use ast::{BinOp, Expr, UnOp};
pub use builtins::Builtin;
pub use cache::{EvalCache, MemoryCache, cached_evaluate, content_hash};
pub use constants::{APPROX_EPSILON, DEFAULT_K, MAX_DEPTH, MAX_NESTING, SINGULAR_EPSILON};
pub use error::{ErrorKind, EvalError, ExprError, LexError, ParseError};
pub use features::{FEATURE_DIM, FeatureVector, OpKind};
pub use interpreter::{Evaluation, check_literal_size, evaluate, evaluate_str, run, run_within};
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::{parse, parse_str};
pub use recommend::{
    CandidateSource, IndexedExpression, LinearScan, Recommender, ScoredExpression,
    SimilarityWeights, index_corpus, index_corpus_within, similarity,
};
pub use record::{ExprId, StoredExpression};
pub use serde_compat::{CURRENT_VERSION, export_json, import_json};
pub use value::{Matrix, Shape, Value};
