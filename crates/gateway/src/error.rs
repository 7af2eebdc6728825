//! Gateway error type.

/// Boxed source error from the underlying client.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failed object-store call.
///
/// One variant per primitive, each carrying the key or prefix it was issued
/// against. No transient/permanent distinction is made and nothing retries:
/// a single failure fails the filesystem operation that triggered it.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("failed to fetch object {key:?}")]
    Get {
        key: String,
        #[source]
        source: BoxError,
    },
    #[error("failed to store object {key:?}")]
    Put {
        key: String,
        #[source]
        source: BoxError,
    },
    #[error("failed to delete object {key:?}")]
    Delete {
        key: String,
        #[source]
        source: BoxError,
    },
    #[error("failed to list prefix {prefix:?}")]
    List {
        prefix: String,
        #[source]
        source: BoxError,
    },
    #[error("failed to read body of object {key:?}")]
    Body {
        key: String,
        #[source]
        source: BoxError,
    },
}
