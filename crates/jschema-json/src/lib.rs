//! # jschema-json
//!
//! Immutable JSON values that know where they live.
//!
//! This crate provides `JsonValue`, a JSON tree in which every node carries
//! the JSON Pointer that addresses it from the document root. Parsing is
//! delegated to `serde_json` (with insertion order preserved); this crate
//! only adds the location tracking and the equality/ordering semantics
//! needed for schema evaluation.
//!
//! ## Design
//!
//! Each node owns its children and its own location. The per-node pointer
//! costs memory proportional to depth, but evaluation can report an
//! instance location without threading a path through every call.
//!
//! ## Example
//!
//! ```rust
//! use jschema_json::JsonValue;
//!
//! let doc = JsonValue::parse(r#"{"tags": ["a", "b"]}"#).unwrap();
//! let second = doc.get("tags").and_then(|tags| tags.get_index(1)).unwrap();
//! assert_eq!(second.as_str(), Some("b"));
//! assert_eq!(second.pointer().to_string(), "/tags/1");
//! ```

mod error;
mod number;
mod pointer;
mod value;

pub use error::{Error, JsonPointerError, Result};
pub use number::Number;
pub use pointer::JsonPointer;
pub use value::{JsonKind, JsonType, JsonValue};
