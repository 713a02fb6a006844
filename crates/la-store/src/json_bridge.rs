use std::fs;
use std::path::Path;

use la_core::{export_json, import_json, run_within};

use crate::error::{Result, StoreError};
use crate::store::Store;

/// Outcome of importing a corpus file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    /// Ids already present in the store.
    pub skipped: usize,
    /// Sources that no longer evaluate within the size bound, so no value
    /// could be stored.
    pub rejected: usize,
}

impl Store {
    /// Import a corpus JSON file into this store.
    pub fn import_json_file(&self, path: &Path) -> Result<ImportSummary> {
        let json = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        self.import_json_str(&json)
    }

    /// Import a corpus JSON string. Existing ids are left untouched. Each new
    /// record's source is evaluated once, within the store's literal size
    /// bound, to obtain the value column.
    pub fn import_json_str(&self, json: &str) -> Result<ImportSummary> {
        let records =
            import_json(json).map_err(|e| StoreError::InvalidData(format!("invalid JSON: {e}")))?;

        let mut summary = ImportSummary::default();
        let tx = self.conn().unchecked_transaction()?;
        for mut record in records {
            if self.contains(record.id)? {
                summary.skipped += 1;
                continue;
            }
            let value = match run_within(&record.source, self.max_dimension()) {
                Ok(evaluation) => evaluation.value,
                Err(e) => {
                    tracing::warn!(id = %record.id, error = %e, "rejecting imported expression");
                    summary.rejected += 1;
                    continue;
                }
            };
            if record.canonical.is_empty() {
                record.canonical = value.to_string();
            }
            self.insert(&record, &value)?;
            summary.imported += 1;
        }
        tx.commit()?;

        tracing::info!(
            imported = summary.imported,
            skipped = summary.skipped,
            rejected = summary.rejected,
            "corpus import complete"
        );
        Ok(summary)
    }

    /// Export every stored expression to a corpus JSON file.
    pub fn export_json_file(&self, path: &Path) -> Result<()> {
        let json = self.export_json_string()?;
        fs::write(path, json).map_err(|e| {
            StoreError::InvalidData(format!("failed to write {}: {e}", path.display()))
        })
    }

    /// Export every stored expression, in insertion order, as JSON.
    pub fn export_json_string(&self) -> Result<String> {
        let records = self.all()?;
        export_json(&records)
            .map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))
    }
}
