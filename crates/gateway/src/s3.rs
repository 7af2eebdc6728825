//! S3 gateway backend.

use aws_sdk_s3::config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use crate::body::ObjectBody;
use crate::error::GatewayError;
use crate::{Gateway, ListPage};

/// Gateway backed by one S3 bucket.
///
/// The client and bucket name are set once at construction and read-only
/// afterwards. Credentials and region come from the ambient environment
/// (the SDK's default provider chain).
#[derive(Debug, Clone)]
pub struct S3Gateway {
    client: Client,
    bucket: String,
}

impl S3Gateway {
    /// Build a gateway from ambient environment configuration.
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), bucket)
    }

    /// Build a gateway from an existing client.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// The bucket this gateway operates on.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait::async_trait]
impl Gateway for S3Gateway {
    async fn get(&self, key: &str) -> Result<Option<(u64, ObjectBody)>, GatewayError> {
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => {
                let size = output.content_length().unwrap_or(0).max(0) as u64;
                debug!(key = %key, size, "fetched object");
                Ok(Some((size, ObjectBody::from_stream(key, output.body))))
            }
            Err(err) => match err.as_service_error() {
                Some(service) if service.is_no_such_key() => {
                    debug!(key = %key, "object does not exist");
                    Ok(None)
                }
                _ => Err(GatewayError::Get {
                    key: key.to_owned(),
                    source: Box::new(err),
                }),
            },
        }
    }

    async fn list(
        &self,
        prefix: &str,
        delimiter: &str,
        marker: Option<String>,
    ) -> Result<ListPage, GatewayError> {
        let mut request = self
            .client
            .list_objects()
            .bucket(&self.bucket)
            .prefix(prefix)
            .delimiter(delimiter);
        if let Some(marker) = marker {
            request = request.marker(marker);
        }

        let output = request.send().await.map_err(|err| GatewayError::List {
            prefix: prefix.to_owned(),
            source: Box::new(err),
        })?;

        let page = ListPage {
            objects: output
                .contents()
                .iter()
                .filter_map(|object| object.key().map(str::to_owned))
                .collect(),
            common_prefixes: output
                .common_prefixes()
                .iter()
                .filter_map(|common| common.prefix().map(str::to_owned))
                .collect(),
            is_truncated: output.is_truncated().unwrap_or(false),
            next_marker: output.next_marker().map(str::to_owned),
        };
        debug!(
            prefix = %prefix,
            objects = page.objects.len(),
            prefixes = page.common_prefixes.len(),
            truncated = page.is_truncated,
            "listed page"
        );
        Ok(page)
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<(), GatewayError> {
        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| GatewayError::Put {
                key: key.to_owned(),
                source: Box::new(err),
            })?;
        debug!(key = %key, size, "stored object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| GatewayError::Delete {
                key: key.to_owned(),
                source: Box::new(err),
            })?;
        debug!(key = %key, "deleted object");
        Ok(())
    }
}
