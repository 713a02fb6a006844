/// Determinant magnitude below which a matrix is treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-10;

/// Tolerance used by `Value::approx_eq` callers that want a sensible default.
pub const APPROX_EPSILON: f64 = 1e-9;

/// Lowest decade a non-zero result can fall into (10^-12).
pub const MAGNITUDE_MIN: i32 = -12;

/// Highest decade a result can fall into (10^12).
pub const MAGNITUDE_MAX: i32 = 12;

/// Bucket reserved for all-zero and empty results.
pub const ZERO_MAGNITUDE: i32 = MAGNITUDE_MIN - 1;

/// Default recommender weight for matching result shape.
pub const DEFAULT_SHAPE_WEIGHT: f64 = 1.0;

/// Default recommender weight for operator-set Jaccard similarity.
pub const DEFAULT_OPS_WEIGHT: f64 = 2.0;

/// Default recommender weight for magnitude-bucket proximity.
pub const DEFAULT_MAGNITUDE_WEIGHT: f64 = 1.0;

/// Number of suggestions returned when the caller does not ask for a count.
pub const DEFAULT_K: usize = 5;

/// Deepest run of nested parentheses, brackets, calls and prefix minus the
/// parser descends into.
pub const MAX_NESTING: usize = 64;

/// Tallest expression tree the parser builds. Long operator chains and
/// repeated transposes grow the tree without nesting in the source.
pub const MAX_DEPTH: usize = 256;
