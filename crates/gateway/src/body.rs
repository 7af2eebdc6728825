//! Open object bodies.

use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;

use crate::error::GatewayError;

/// A readable object body bound to one get-object response.
///
/// Consumed exactly once by [`read_to_end`](Self::read_to_end); dropping an
/// unread body releases the underlying connection, so the handle is closed
/// on every exit path without explicit cleanup.
pub struct ObjectBody {
    key: String,
    inner: Inner,
}

enum Inner {
    Stream(ByteStream),
    Bytes(Bytes),
}

impl ObjectBody {
    /// Body backed by owned bytes (in-memory gateway).
    pub fn from_bytes(key: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            inner: Inner::Bytes(data.into()),
        }
    }

    /// Body backed by an S3 response stream.
    pub(crate) fn from_stream(key: impl Into<String>, stream: ByteStream) -> Self {
        Self {
            key: key.into(),
            inner: Inner::Stream(stream),
        }
    }

    /// Key of the object this body was fetched from.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the body to exhaustion.
    pub async fn read_to_end(self) -> Result<Vec<u8>, GatewayError> {
        match self.inner {
            Inner::Bytes(data) => Ok(data.to_vec()),
            Inner::Stream(stream) => {
                let aggregated = stream.collect().await.map_err(|err| GatewayError::Body {
                    key: self.key,
                    source: Box::new(err),
                })?;
                Ok(aggregated.to_vec())
            }
        }
    }
}

impl std::fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectBody")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
