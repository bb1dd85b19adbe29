use thiserror::Error;

#[derive(Error, Debug)]
pub enum RestimingError {
    /// A trie key contained the reserved `|` separator.
    #[error("trie key contains reserved character '|': {0}")]
    ReservedKey(String),

    /// The same key was inserted into a trie twice.
    #[error("duplicate trie key: {0}")]
    DuplicateKey(String),

    /// Propagated I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON input or output serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
