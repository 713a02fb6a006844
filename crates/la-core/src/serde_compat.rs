//! JSON corpus wire format, version 1.
//!
//! Field names are camelCase and timestamps are ISO-8601 UTC strings. Records
//! are trusted as written: import checks ids and timestamps but does not
//! re-evaluate sources.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::StoredExpression;
use crate::time::{iso8601_to_unix, now_iso8601, unix_to_iso8601};

pub const CURRENT_VERSION: &str = "1";

#[derive(Serialize, Deserialize, Debug)]
pub struct WireCorpus {
    pub version: String,
    #[serde(rename = "exportedAt", default)]
    pub exported_at: String,
    pub expressions: Vec<WireExpression>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WireExpression {
    pub id: Uuid,
    pub source: String,
    #[serde(default)]
    pub canonical: String,
    #[serde(rename = "createdAt", with = "iso_seconds")]
    pub created_at: u64,
    #[serde(default)]
    pub owner: String,
}

mod iso_seconds {
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::{iso8601_to_unix, unix_to_iso8601};

    pub fn serialize<S: Serializer>(secs: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&unix_to_iso8601(*secs))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let text = String::deserialize(d)?;
        iso8601_to_unix(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{text}'")))
    }
}

impl From<&StoredExpression> for WireExpression {
    fn from(record: &StoredExpression) -> Self {
        Self {
            id: record.id,
            source: record.source.clone(),
            canonical: record.canonical.clone(),
            created_at: record.created_at,
            owner: record.owner.clone(),
        }
    }
}

impl From<WireExpression> for StoredExpression {
    fn from(wire: WireExpression) -> Self {
        Self {
            id: wire.id,
            source: wire.source,
            canonical: wire.canonical,
            created_at: wire.created_at,
            owner: wire.owner,
        }
    }
}

/// Serialize records, in the order given, to pretty-printed JSON.
pub fn export_json<'a>(
    records: impl IntoIterator<Item = &'a StoredExpression>,
) -> Result<String, serde_json::Error> {
    let wire = WireCorpus {
        version: CURRENT_VERSION.to_string(),
        exported_at: now_iso8601(),
        expressions: records.into_iter().map(WireExpression::from).collect(),
    };
    serde_json::to_string_pretty(&wire)
}

/// Parse a corpus export back into records.
pub fn import_json(json: &str) -> Result<Vec<StoredExpression>, serde_json::Error> {
    let wire: WireCorpus = serde_json::from_str(json)?;
    Ok(wire
        .expressions
        .into_iter()
        .map(StoredExpression::from)
        .collect())
}
