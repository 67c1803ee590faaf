//! Lock keys and their hashes

use keystone_codec::Document;
use keystone_core::Result;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::record::Fields;

/// What a caller locks on
///
/// Text keys are stored as-is. Structured keys are stored as the SHA-256
/// digest of their symmetric encoding, so two structurally equal keys lock
/// the same record whatever their field order.
#[derive(Debug, Clone, PartialEq)]
pub enum LockKey {
    Text(String),
    Structured(Document),
}

impl LockKey {
    /// Lock on any serializable value
    pub fn structured<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(LockKey::Structured(Document::from_serialize(value)?))
    }

    /// The value stored in the record's unique `key_hash` column
    pub fn hash(&self) -> Result<String> {
        match self {
            LockKey::Text(text) => Ok(text.clone()),
            LockKey::Structured(document) => document.digest(),
        }
    }

    /// Fields of a structured object key, for mirroring into the record
    pub(crate) fn fields(&self) -> Option<Fields> {
        let LockKey::Structured(document) = self else {
            return None;
        };
        match document.to_json() {
            Ok(JsonValue::Object(fields)) => Some(fields),
            _ => None,
        }
    }
}

impl From<&str> for LockKey {
    fn from(text: &str) -> Self {
        LockKey::Text(text.to_string())
    }
}

impl From<String> for LockKey {
    fn from(text: String) -> Self {
        LockKey::Text(text)
    }
}

impl From<&String> for LockKey {
    fn from(text: &String) -> Self {
        LockKey::Text(text.clone())
    }
}

impl From<Document> for LockKey {
    fn from(document: Document) -> Self {
        LockKey::Structured(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_key_hashes_to_itself() {
        assert_eq!(LockKey::from("jobs/nightly").hash().unwrap(), "jobs/nightly");
        assert!(LockKey::from("jobs/nightly").fields().is_none());
    }

    #[test]
    fn test_structured_key_ignores_field_order() {
        let a = LockKey::from(Document::from(json!({"user": 7, "task": "sync"})));
        let b = LockKey::from(Document::from(json!({"task": "sync", "user": 7})));
        let hash = a.hash().unwrap();

        assert_eq!(hash, b.hash().unwrap());
        assert_eq!(hash.len(), 64);
        assert_ne!(
            hash,
            LockKey::from(Document::from(json!({"task": "sync", "user": 8})))
                .hash()
                .unwrap()
        );
    }

    #[test]
    fn test_structured_fields() {
        #[derive(Serialize)]
        struct Job<'a> {
            id: u32,
            queue: &'a str,
        }

        let key = LockKey::structured(&Job { id: 3, queue: "mail" }).unwrap();
        let fields = key.fields().unwrap();
        assert_eq!(fields.get("id"), Some(&json!(3)));
        assert_eq!(fields.get("queue"), Some(&json!("mail")));

        let scalar = LockKey::from(Document::from(42));
        assert!(scalar.fields().is_none());
    }
}
