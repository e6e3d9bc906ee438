//! Error types for the scoring pipeline.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DockQError>;

/// All fatal conditions a scoring attempt can run into.
///
/// Every variant aborts the current attempt: a score computed over
/// mismatched atom sets would be meaningless, so there is no partial or
/// best-effort result.
#[derive(Debug, Error)]
pub enum DockQError {
    /// Chain grouping is missing, empty or inconsistent.
    #[error("Invalid chain grouping: {0}")]
    Configuration(String),

    /// A structural invariant required by the metrics does not hold.
    #[error("Structural precondition violated: {0}")]
    StructuralPrecondition(String),

    /// Sequence alignment between a model chain and its native counterpart
    /// could not produce a usable residue mapping.
    #[error("Alignment of model chain {model_chain} against native chain {native_chain} failed: {message}")]
    Alignment {
        /// Model chain id.
        model_chain: String,
        /// Native chain id.
        native_chain: String,
        /// What went wrong.
        message: String,
    },

    /// The structure file could not be read or parsed.
    #[error("Failed to load structure from {path}: {message}")]
    StructureLoad {
        /// Input path as given on the command line.
        path: String,
        /// Parser diagnostics.
        message: String,
    },
}
