//! Persisted lock records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Free-form fields attached to a record
pub type Fields = Map<String, JsonValue>;

/// One held lock as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Unique across the store
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
    /// Hard ceiling on the lock's lifetime
    pub expires_at: DateTime<Utc>,
    /// Heartbeat horizon, pushed forward by `alive`
    pub ttl_at: DateTime<Utc>,
    /// Caller-supplied fields
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub fields: Fields,
    /// Fields of a structured key, when the lock mirrors them
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Fields,
}

impl LockRecord {
    /// Both horizons are still ahead of `now`
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now && self.ttl_at > now
    }

    /// Either horizon has passed; `clean` may delete it
    pub fn is_abandoned(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now || self.ttl_at < now
    }

    pub(crate) fn apply(&mut self, patch: RecordPatch) {
        if let Some(ttl_at) = patch.ttl_at {
            self.ttl_at = ttl_at;
        }
        self.fields.extend(patch.fields);
    }
}

/// Changes applied to an existing record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub ttl_at: Option<DateTime<Utc>>,
    /// Merged into the record's fields, replacing same-named entries
    pub fields: Fields,
}

impl RecordPatch {
    pub fn ttl(ttl_at: DateTime<Utc>) -> Self {
        Self {
            ttl_at: Some(ttl_at),
            fields: Fields::new(),
        }
    }

    pub fn fields(fields: Fields) -> Self {
        Self {
            ttl_at: None,
            fields,
        }
    }
}

/// Current time at the millisecond precision every store keeps
pub(crate) fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
