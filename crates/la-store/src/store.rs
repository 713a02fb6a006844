use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use la_core::{
    EvalCache, ExprId, LinearScan, Recommender, ScoredExpression, SimilarityWeights,
    StoredExpression, Value, index_corpus_within, run_within,
};

use crate::config::DEFAULT_MAX_DIMENSION;
use crate::error::{Result, StoreError};
use crate::schema;

const RECORD_COLUMNS: &str = "id, source, canonical, created_at, owner";

/// Append-only expression table plus the content-addressed evaluation cache.
pub struct Store {
    conn: Connection,
    /// Literal size bound applied whenever a stored source is evaluated.
    max_dimension: usize,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn,
            max_dimension: DEFAULT_MAX_DIMENSION,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn,
            max_dimension: DEFAULT_MAX_DIMENSION,
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn max_dimension(&self) -> usize {
        self.max_dimension
    }

    pub fn set_max_dimension(&mut self, limit: usize) {
        self.max_dimension = limit;
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Expressions ---

    /// Evaluate `source` and persist it on success. Evaluation failures come
    /// back as `StoreError::Expression` and nothing is written, as do
    /// literals larger than [`Store::max_dimension`].
    pub fn append(&self, source: &str, owner: &str) -> Result<StoredExpression> {
        let evaluation = run_within(source, self.max_dimension)?;
        let record = StoredExpression::new(source, &evaluation.value, owner);
        self.insert(&record, &evaluation.value)?;
        Ok(record)
    }

    /// Persist an already evaluated record.
    pub fn insert(&self, record: &StoredExpression, value: &Value) -> Result<()> {
        self.conn.execute(
            "INSERT INTO expressions (id, source, canonical, value_json, created_at, owner)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.to_string(),
                record.source,
                record.canonical,
                value_to_json(value)?,
                record.created_at as i64,
                record.owner,
            ],
        )?;
        Ok(())
    }

    pub fn contains(&self, id: ExprId) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM expressions WHERE id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get(&self, id: ExprId) -> Result<StoredExpression> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM expressions WHERE id = ?1"),
                [id.to_string()],
                read_record_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))?;
        record_from_row(row)
    }

    /// Stored value of `id`, as evaluated when it was appended.
    pub fn value_of(&self, id: ExprId) -> Result<Value> {
        let json: String = self
            .conn
            .query_row(
                "SELECT value_json FROM expressions WHERE id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))?;
        value_from_json(&json)
    }

    /// Newest first.
    pub fn list(&self, limit: usize) -> Result<Vec<StoredExpression>> {
        self.query_records(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM expressions
                 ORDER BY created_at DESC, rowid DESC LIMIT ?1"
            ),
            [limit as i64],
        )
    }

    /// Every record in insertion order. A snapshot: later appends are not
    /// reflected in the returned vector.
    pub fn all(&self) -> Result<Vec<StoredExpression>> {
        self.query_records(
            &format!("SELECT {RECORD_COLUMNS} FROM expressions ORDER BY rowid"),
            [],
        )
    }

    pub fn by_owner(&self, owner: &str) -> Result<Vec<StoredExpression>> {
        self.query_records(
            &format!("SELECT {RECORD_COLUMNS} FROM expressions WHERE owner = ?1 ORDER BY rowid"),
            [owner],
        )
    }

    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM expressions", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    fn query_records<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<StoredExpression>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows: Vec<RecordRow> = stmt
            .query_map(params, read_record_row)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().map(record_from_row).collect()
    }

    // --- Recommendations ---

    /// Rank the current corpus against the stored expressions `ids`. Records
    /// whose source no longer evaluates within the size bound are skipped
    /// with a warning.
    pub fn suggest_for(
        &self,
        ids: &[ExprId],
        k: usize,
        weights: SimilarityWeights,
    ) -> Result<Vec<ScoredExpression>> {
        for id in ids {
            if !self.contains(*id)? {
                return Err(StoreError::NotFound(*id));
            }
        }

        let (indexed, rejected) = index_corpus_within(self.all()?, self.max_dimension);
        for (record, err) in &rejected {
            tracing::warn!(id = %record.id, error = %err, "skipping unindexable expression");
        }
        let scan = LinearScan::new(indexed);

        let mut targets = Vec::with_capacity(ids.len());
        for id in ids {
            let target = scan.find(*id).ok_or_else(|| {
                StoreError::InvalidData(format!("expression {id} no longer evaluates"))
            })?;
            targets.push(target);
        }

        let scored = Recommender::new(weights).suggest_scored(&scan, &targets, k);
        tracing::debug!(
            targets = ids.len(),
            corpus = scan.len(),
            returned = scored.len(),
            "suggest"
        );
        Ok(scored)
    }

    // --- Evaluation cache ---

    pub fn cache_get(&self, hash: &str) -> Result<Option<Value>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT value_json FROM eval_cache WHERE hash = ?1",
                [hash],
                |row| row.get(0),
            )
            .optional()?;
        let Some(json) = json else {
            return Ok(None);
        };
        self.conn.execute(
            "UPDATE eval_cache SET hits = hits + 1 WHERE hash = ?1",
            [hash],
        )?;
        tracing::debug!(hash, "evaluation cache hit");
        value_from_json(&json).map(Some)
    }

    pub fn cache_put(&self, hash: &str, source: &str, value: &Value) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO eval_cache (hash, source, value_json) VALUES (?1, ?2, ?3)",
            params![hash, source, value_to_json(value)?],
        )?;
        Ok(())
    }

    /// (entries, total hits)
    pub fn cache_stats(&self) -> Result<(u64, u64)> {
        let (entries, hits): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(hits), 0) FROM eval_cache",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((entries as u64, hits as u64))
    }

    pub fn cache_hits(&self, hash: &str) -> Result<Option<u64>> {
        let hits: Option<i64> = self
            .conn
            .query_row(
                "SELECT hits FROM eval_cache WHERE hash = ?1",
                [hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hits.map(|h| h as u64))
    }

    pub fn cache_clear(&self) -> Result<u64> {
        let removed = self.conn.execute("DELETE FROM eval_cache", [])?;
        Ok(removed as u64)
    }
}

/// Cache failures degrade to misses; evaluation never depends on the cache.
impl EvalCache for Store {
    fn get(&mut self, hash: &str) -> Option<Value> {
        self.cache_get(hash).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "evaluation cache read failed");
            None
        })
    }

    fn put(&mut self, hash: &str, source: &str, value: &Value) {
        if let Err(e) = self.cache_put(hash, source, value) {
            tracing::warn!(error = %e, "evaluation cache write failed");
        }
    }
}

type RecordRow = (String, String, String, i64, String);

fn read_record_row(row: &Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn record_from_row((id, source, canonical, created_at, owner): RecordRow) -> Result<StoredExpression> {
    Ok(StoredExpression {
        id: parse_uuid(&id)?,
        source,
        canonical,
        created_at: u64::try_from(created_at).map_err(|_| {
            StoreError::InvalidData(format!("negative created_at on expression {id}"))
        })?,
        owner,
    })
}

fn value_to_json(value: &Value) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| StoreError::InvalidData(format!("cannot encode value: {e}")))
}

fn value_from_json(json: &str) -> Result<Value> {
    serde_json::from_str(json)
        .map_err(|e| StoreError::InvalidData(format!("corrupt stored value: {e}")))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("invalid UUID '{s}': {e}")))
}
