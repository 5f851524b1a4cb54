//! Error types for kb-tool.
//!
//! Taxonomy:
//! - Bad input: malformed triples, unknown labels, invalid parameters
//! - Infrastructure: filesystem failures
//! - Invariant violations: bugs, should not happen

use thiserror::Error;

/// Top-level error type for kb-tool.
#[derive(Debug, Error)]
pub enum KbToolError {
    // ═══════════════════════════════════════════════════════════════════
    // BAD INPUT — expected failures
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Knowledge graph is empty")]
    EmptyGraph,

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Unknown relation: {0}")]
    UnknownRelation(String),

    // ═══════════════════════════════════════════════════════════════════
    // INFRASTRUCTURE
    // ═══════════════════════════════════════════════════════════════════

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker {worker} failed: {message}")]
    WorkerFailed { worker: usize, message: String },

    // ═══════════════════════════════════════════════════════════════════
    // INVARIANT VIOLATED — bug
    // ═══════════════════════════════════════════════════════════════════

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KbToolError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a parse error for a 1-based line number.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }
}

/// Result type alias for kb-tool.
pub type Result<T> = std::result::Result<T, KbToolError>;
