//! Deterministic JSON serialization for stored files.
//!
//! Output uses 2-space indentation and a trailing newline; key order comes
//! from the source types (`BTreeMap` for maps).

mod json;

pub use json::{SerializationError, from_json_bytes, to_json_stable, to_json_stable_bytes};
