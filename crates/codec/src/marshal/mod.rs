//! Lossless JSON encoding of [`Document`]s
//!
//! Values JSON cannot express are written as tagged objects:
//!
//! | Value                          | Encoding                                              |
//! |--------------------------------|-------------------------------------------------------|
//! | `NaN`, `+inf`, `-inf`          | `{"$type": "nan"}`, `{"$type": "inf"}`, `{"$type": "-inf"}` |
//! | date                           | `{"$type": "date", "value": "<rfc3339>"}`             |
//! | pattern                        | `{"$type": "regex", "value": {"flags": .., "source": ..}}` |
//! | set                            | `{"$type": "set", "value": [..]}`                     |
//! | repeated node                  | `{"$type": "ref", "value": <index>}`                  |
//! | object with its own `$type` key| `{"$type": "object", "value": {..}}`                  |
//!
//! Compound nodes are numbered in the order they are first written
//! (pre-order), and a back-reference names that number, so the encoding of
//! a given graph never depends on where its nodes happen to sit in memory.

mod decode;
mod encode;

use crate::document::Document;
use keystone_core::{Result, SerializationResultExt};
use sha2::{Digest, Sha256};
use std::fmt;

pub(crate) const TYPE_KEY: &str = "$type";
pub(crate) const VALUE_KEY: &str = "value";

/// Encoding options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarshalOptions {
    /// Sort object keys and set members so deeply equal values encode
    /// identically
    pub symmetric: bool,
    /// Write repeated nodes as back-references; when off, shared nodes are
    /// written out again and a cycle is an error
    pub circular: bool,
}

impl Default for MarshalOptions {
    fn default() -> Self {
        Self {
            symmetric: false,
            circular: true,
        }
    }
}

impl MarshalOptions {
    /// Canonical form used for hashing
    pub const fn symmetric() -> Self {
        Self {
            symmetric: true,
            circular: true,
        }
    }
}

/// Encode a document as JSON text
pub fn serialize(document: &Document, options: &MarshalOptions) -> Result<String> {
    let json = encode::Encoder::new(document, *options).encode()?;
    serde_json::to_string(&json).serialization_context("marshal")
}

/// Decode JSON text produced by [`serialize`]
pub fn deserialize(text: &str) -> Result<Document> {
    let json: serde_json::Value = serde_json::from_str(text).serialization_context("unmarshal")?;
    decode::Decoder::default().decode(json)
}

/// SHA-256 hex digest of the symmetric encoding
pub fn digest(document: &Document) -> Result<String> {
    let canonical = serialize(document, &MarshalOptions::symmetric())?;
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

impl Document {
    /// See [`digest`]
    pub fn digest(&self) -> Result<String> {
        digest(self)
    }
}

/// Turns documents into stored bytes and back
pub trait Codec: Send + Sync + fmt::Debug {
    /// Short name used in logs
    fn id(&self) -> &str;

    fn encode(&self, document: &Document) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Document>;
}

/// The default codec: [`serialize`] / [`deserialize`] as UTF-8
#[derive(Debug, Clone, Default)]
pub struct Marshal {
    options: MarshalOptions,
}

impl Marshal {
    pub fn new(options: MarshalOptions) -> Self {
        Self { options }
    }
}

impl Codec for Marshal {
    fn id(&self) -> &str {
        "marshal"
    }

    fn encode(&self, document: &Document) -> Result<Vec<u8>> {
        serialize(document, &self.options).map(String::into_bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Document> {
        let text = std::str::from_utf8(bytes).serialization_context("unmarshal")?;
        deserialize(text)
    }
}
