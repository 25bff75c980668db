//! Error types for sheba-chat

use thiserror::Error;

/// Result type alias using sheba-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the conversation layer
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the provider layer
    #[error(transparent)]
    Ai(#[from] sheba_ai::Error),

    /// Reading or writing the thread store failed
    #[error("Store I/O error: {0}")]
    StoreIo(#[from] std::io::Error),

    /// The thread store contents could not be encoded or decoded
    #[error("Store format error: {0}")]
    StoreFormat(#[from] serde_json::Error),

    /// No thread with this id exists
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),
}
