use thiserror::Error;

/// Core error type shared across boilingseed crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema snapshot violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// The schema snapshot was produced for an incompatible contract.
    #[error("unsupported schema version '{found}' (expected {expected})")]
    UnsupportedVersion { found: String, expected: String },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results returned by boilingseed crates.
pub type Result<T> = std::result::Result<T, Error>;
