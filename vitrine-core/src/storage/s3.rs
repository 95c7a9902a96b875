use std::fmt;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use tracing::{debug, warn};

use super::{ObjectAcl, ObjectStore, ObjectStoreError, PutObjectRequest};

/// Connection settings for an S3-compatible endpoint (AWS, MinIO, Spaces, ...).
#[derive(Clone)]
pub struct S3Options {
    /// Custom endpoint; `None` resolves the AWS endpoint for `region`.
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Public origin objects are served from, usually a CDN in front of the bucket.
    pub cdn_base_url: String,
    pub force_path_style: bool,
}

impl fmt::Debug for S3Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Options")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("cdn_base_url", &self.cdn_base_url)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

/// [`ObjectStore`] over the AWS S3 API.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    cdn_base_url: String,
}

impl fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3ObjectStore")
            .field("cdn_base_url", &self.cdn_base_url)
            .finish_non_exhaustive()
    }
}

impl S3ObjectStore {
    pub fn new(options: S3Options) -> Self {
        let credentials = Credentials::new(
            options.access_key,
            options.secret_key,
            None,
            None,
            "vitrine",
        );

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(options.region))
            .credentials_provider(credentials)
            .force_path_style(options.force_path_style);
        if let Some(endpoint) = options.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self::with_client(Client::from_conf(builder.build()), options.cdn_base_url)
    }

    pub fn with_client(client: Client, cdn_base_url: impl Into<String>) -> Self {
        let cdn_base_url = cdn_base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            cdn_base_url,
        }
    }

    /// Public URL for an object key.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.cdn_base_url, key)
    }
}

fn canned_acl(acl: ObjectAcl) -> ObjectCannedAcl {
    match acl {
        ObjectAcl::Private => ObjectCannedAcl::Private,
        ObjectAcl::PublicRead => ObjectCannedAcl::PublicRead,
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        request: PutObjectRequest,
    ) -> Result<String, ObjectStoreError> {
        let size = request.body.len();

        self.client
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .body(ByteStream::from(request.body))
            .content_type(request.content_type)
            .cache_control(request.cache_control)
            .acl(canned_acl(request.acl))
            .send()
            .await
            .map_err(|e| {
                let reason = DisplayErrorContext(&e).to_string();
                warn!(
                    bucket = %request.bucket,
                    key = %request.key,
                    error = %reason,
                    "S3 put_object failed"
                );
                ObjectStoreError::Backend(reason)
            })?;

        debug!(
            bucket = %request.bucket,
            key = %request.key,
            size,
            "uploaded object to S3"
        );

        Ok(self.public_url(&request.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> S3Options {
        S3Options {
            endpoint: Some("http://127.0.0.1:9000".into()),
            region: "us-east-1".into(),
            access_key: "minio".into(),
            secret_key: "minio-secret".into(),
            cdn_base_url: "https://cdn.example.com/".into(),
            force_path_style: true,
        }
    }

    #[tokio::test]
    async fn public_url_joins_cdn_and_key() {
        let store = S3ObjectStore::new(options());
        assert_eq!(
            store.public_url("products/shirt-42-og.jpg"),
            "https://cdn.example.com/products/shirt-42-og.jpg"
        );
    }

    #[test]
    fn debug_output_hides_credentials() {
        let rendered = format!("{:?}", options());
        assert!(!rendered.contains("minio-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn acl_maps_to_canned_values() {
        assert_eq!(canned_acl(ObjectAcl::PublicRead), ObjectCannedAcl::PublicRead);
        assert_eq!(canned_acl(ObjectAcl::Private), ObjectCannedAcl::Private);
    }
}
