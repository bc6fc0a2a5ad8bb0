//! JSON encoding of full store snapshots.

use crate::error::{kind_of, Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Indentation used for human-readable dumps.
const PRETTY_INDENT: &[u8] = b"    ";

/// Converts the entry map to/from the on-disk JSON document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Compact JSON (single line, no extra whitespace).
    pub fn compact() -> Self {
        Self::default()
    }

    /// Pretty-printed JSON, four-space indentation.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Whether this serializer indents its output.
    pub fn is_pretty(&self) -> bool {
        self.pretty
    }

    /// Encode the entries as a top-level JSON object.
    pub fn serialize(&self, entries: &Map<String, Value>) -> Result<Vec<u8>> {
        if !self.pretty {
            return serde_json::to_vec(entries).map_err(|e| Error::Serialize(e.to_string()));
        }
        let mut out = Vec::with_capacity(128);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(PRETTY_INDENT);
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        entries
            .serialize(&mut ser)
            .map_err(|e| Error::Serialize(e.to_string()))?;
        Ok(out)
    }

    /// Decode a document. The top level has to be an object.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Map<String, Value>> {
        let doc: Value =
            serde_json::from_slice(bytes).map_err(|e| Error::CorruptStore(e.to_string()))?;
        match doc {
            Value::Object(map) => Ok(map),
            other => Err(Error::CorruptStore(format!(
                "top level must be an object, found {}",
                kind_of(&other)
            ))),
        }
    }
}
