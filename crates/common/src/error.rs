//! Error taxonomy for mount operations.

use gateway::GatewayError;

/// A failed mount operation.
///
/// The transport layer maps `NotFound` to a missing-entry reply,
/// `Interrupted` to a cancelled request, and everything else to a generic
/// I/O failure. Gateway errors pass through unchanged and nothing is
/// retried; a failed multi-page listing yields an error, never a truncated
/// entry set.
#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("no such entry: {0:?}")]
    NotFound(String),
    #[error("not a directory: {0:?}")]
    NotADirectory(String),
    #[error("not a file: {0:?}")]
    NotAFile(String),
    #[error("no readable body for object {0:?}")]
    MissingBody(String),
    #[error("operation interrupted")]
    Interrupted,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl MountError {
    /// True when the error surfaces as a missing entry rather than an I/O
    /// failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
