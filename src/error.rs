//! Error types for schema compilation

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Defects in a schema document.
///
/// These abort validation entirely. Problems with the *data* are never
/// reported through this type; they come back as [`crate::Violation`]s.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("Unresolved reference {reference} at {location}")]
    UnresolvedRef { reference: String, location: String },

    #[error("Unsupported reference form {reference} at {location} (expected #, #/definitions/<name> or #/$defs/<name>)")]
    UnsupportedRef { reference: String, location: String },

    #[error("Unknown definition {name:?}")]
    UnknownDefinition { name: String },

    #[error("Empty {keyword} at {location}")]
    EmptyComposition { keyword: &'static str, location: String },

    #[error("Invalid {keyword} at {location}: {reason}")]
    InvalidKeyword {
        keyword: &'static str,
        location: String,
        reason: String,
    },

    #[error("Cyclic reference with no base case: {}", cycle.join(" -> "))]
    CyclicRef { cycle: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
