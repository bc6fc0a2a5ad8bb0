//! Unified error type for all store operations.

/// Things that can go wrong when using the store.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// File system problem (read, write, rename, truncate).
    Io(String),
    /// Failed to serialize the entries to bytes.
    Serialize(String),
    /// The backing file is not valid JSON, or its top level is not an object.
    /// Terminal for that store: repair or delete the file.
    CorruptStore(String),
    /// The operation needs the key to be present and it isn't.
    KeyNotFound(String),
    /// The value at `key` has the wrong shape for the operation.
    TypeMismatch {
        /// Key whose value was inspected.
        key: String,
        /// What the operation needed, e.g. `"object"`.
        expected: &'static str,
        /// What was actually stored.
        found: &'static str,
    },
    /// A caller-supplied projection rejected the stored value.
    Projection(String),
    /// A caller-supplied query predicate failed; the query was aborted.
    Predicate(String),
    /// Bad configuration (invalid path, etc.).
    Config(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(msg) => write!(f, "i/o error: {msg}"),
            Error::Serialize(msg) => write!(f, "serialization error: {msg}"),
            Error::CorruptStore(msg) => write!(f, "corrupt store: {msg}"),
            Error::KeyNotFound(key) => write!(f, "key not found: {key:?}"),
            Error::TypeMismatch {
                key,
                expected,
                found,
            } => write!(f, "type mismatch at {key:?}: expected {expected}, found {found}"),
            Error::Projection(msg) => write!(f, "projection error: {msg}"),
            Error::Predicate(msg) => write!(f, "predicate error: {msg}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Name of a JSON value's variant, for [`Error::TypeMismatch`] messages.
pub(crate) fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Result alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
