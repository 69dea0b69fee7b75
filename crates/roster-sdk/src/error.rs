//! SDK error types

use roster_engine::EngineError;
use roster_store::StoreError;
use thiserror::Error;

/// SDK error
#[derive(Error, Debug)]
pub enum SdkError {
    /// Engine-level failure, including integrity violations on the
    /// save path.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
