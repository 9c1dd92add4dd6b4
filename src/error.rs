//! Error types for the `ragdoc` crate.
//!
//! The taxonomy mirrors how the pipeline reacts to each failure: extraction
//! errors are tolerated per file during ingestion, search and upsert errors
//! are kept distinct because the query path fails the request while the
//! ingestion path decides whether to abort, and generation errors are only
//! raised after a backend's retry policy is exhausted.

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Text extraction failed for a single source file.
    ///
    /// Tolerated during ingestion: the file is logged and skipped.
    #[error("Extraction error ({file}): {message}")]
    Extraction {
        /// The file that failed to parse.
        file: String,
        /// A description of the failure.
        message: String,
    },

    /// Splitting a document batch into passages failed.
    ///
    /// Batch-fatal: the whole ingestion call aborts.
    #[error("Split error: {0}")]
    Split(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A similarity search against the vector store failed.
    #[error("Search error ({backend}): {message}")]
    Search {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An upsert into the vector store failed.
    #[error("Upsert error ({backend}): {message}")]
    Upsert {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during answer generation.
    ///
    /// Raised only after the backend's retry policy (if any) is exhausted.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An orchestration failure, wrapping the underlying error with the
    /// phase that failed.
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
