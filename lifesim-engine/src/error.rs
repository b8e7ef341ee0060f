//! Engine error types.

use lifesim_core::CoreError;
use lifesim_llm::OracleError;
use thiserror::Error;

/// Errors surfaced by orchestration. Oracle misbehaviour during a turn is
/// never one of them; it degrades to fallback text instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Storage, lookup, phase or serialisation failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The oracle client could not be constructed.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// A caller-supplied argument is out of range.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, EngineError>;
