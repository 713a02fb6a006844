use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::now_unix_secs;
use crate::value::Value;

pub type ExprId = Uuid;

/// An evaluated expression as kept by a persistence collaborator. Created
/// once, never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredExpression {
    pub id: ExprId,
    pub source: String,
    /// Canonical text of the value the source evaluated to.
    pub canonical: String,
    /// Unix seconds.
    pub created_at: u64,
    /// Opaque reference to the owning user; never dereferenced here.
    pub owner: String,
}

impl StoredExpression {
    /// Fresh record for `source`, which evaluated to `value`.
    pub fn new(source: &str, value: &Value, owner: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.to_string(),
            canonical: value.to_string(),
            created_at: now_unix_secs(),
            owner: owner.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record() {
        let value = Value::Vector(vec![2.0, 4.0, 6.0]);
        let a = StoredExpression::new("2 * [1,2,3]", &value, "alice");
        let b = StoredExpression::new("2 * [1,2,3]", &value, "alice");
        assert_eq!(a.canonical, "[2 4 6]");
        assert_eq!(a.owner, "alice");
        assert_ne!(a.id, b.id);
        assert!(a.created_at > 0);
    }
}
