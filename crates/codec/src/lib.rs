//! Value graph model and serialization codec for keystone
//!
//! A [`Document`] holds an arbitrary value: JSON-like scalars plus dates,
//! regular-expression patterns, non-finite numbers and sets, arranged in a
//! graph whose compound nodes may be shared or cyclic. The [`marshal`]
//! module turns a document into JSON text and back without losing any of
//! that, and can sort object keys so that structurally equal documents
//! always produce byte-identical output.
//!
//! ```
//! use keystone_codec::{deserialize, serialize, Document, MarshalOptions, Node};
//!
//! let mut doc = Document::new();
//! let id = doc.alloc(Node::object());
//! doc.insert(id, "self", id.into());
//! doc.set_root(id.into());
//!
//! let text = serialize(&doc, &MarshalOptions::default()).unwrap();
//! assert_eq!(deserialize(&text).unwrap(), doc);
//! ```

mod document;
mod equality;
mod json;
pub mod marshal;

pub use document::{Document, Node, NodeId, Pattern, Value};
pub use marshal::{deserialize, digest, serialize, Codec, Marshal, MarshalOptions};
