//! Content-addressed memoisation of evaluation results.
//!
//! Evaluation is pure, so a value can be keyed by a hash of its source text.
//! The cache lives with the caller; nothing here holds state between calls.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::error::ExprError;
use crate::interpreter::evaluate_str;
use crate::value::Value;

/// Lowercase hex SHA-256 of the raw source text.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

pub trait EvalCache {
    fn get(&mut self, hash: &str) -> Option<Value>;
    fn put(&mut self, hash: &str, source: &str, value: &Value);
}

/// Evaluate `text`, consulting `cache` first. Only successes are cached.
pub fn cached_evaluate(text: &str, cache: &mut impl EvalCache) -> Result<Value, ExprError> {
    let hash = content_hash(text);
    if let Some(value) = cache.get(&hash) {
        return Ok(value);
    }
    let value = evaluate_str(text)?;
    cache.put(&hash, text, &value);
    Ok(value)
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, Value>,
    hits: u64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }
}

impl EvalCache for MemoryCache {
    fn get(&mut self, hash: &str) -> Option<Value> {
        let value = self.entries.get(hash).cloned();
        if value.is_some() {
            self.hits += 1;
        }
        value
    }

    fn put(&mut self, hash: &str, _source: &str, value: &Value) {
        self.entries.insert(hash.to_string(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_known_vector() {
        assert_eq!(
            content_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(content_hash("1+1").len(), 64);
        assert_ne!(content_hash("1+1"), content_hash("1 + 1"));
    }

    #[test]
    fn test_cached_evaluate_hits() {
        let mut cache = MemoryCache::new();
        let a = cached_evaluate("2 * [1,2,3]", &mut cache).unwrap();
        let b = cached_evaluate("2 * [1,2,3]", &mut cache).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn test_errors_not_cached() {
        let mut cache = MemoryCache::new();
        assert!(cached_evaluate("Inv([[1,2],[2,4]])", &mut cache).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_is_trusted() {
        let mut cache = MemoryCache::new();
        cache.put(&content_hash("1 + 1"), "1 + 1", &Value::Scalar(3.0));
        assert_eq!(
            cached_evaluate("1 + 1", &mut cache).unwrap(),
            Value::Scalar(3.0)
        );
    }
}
