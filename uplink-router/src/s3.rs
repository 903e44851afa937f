//! S3-compatible object store: presigned PUT grants and existence checks.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::presigning::PresigningConfig;
use tracing::debug;

use uplink_core::{UploadError, UploadResult};

use crate::store::{ObjectStore, SignedPut};

/// Connection settings for an S3-compatible endpoint.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Required by most non-AWS S3 implementations (MinIO, R2, ...).
    pub force_path_style: bool,
    /// Base for public URLs; defaults to the virtual-hosted bucket URL.
    pub public_base_url: Option<String>,
}

impl S3Config {
    pub fn new<B: Into<String>>(bucket: B) -> Self {
        Self {
            bucket: bucket.into(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
            public_base_url: None,
        }
    }

    /// Build from environment variables.
    ///
    /// `UPLINK_S3_BUCKET` is required; `AWS_REGION`,
    /// `AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY`,
    /// `UPLINK_S3_ENDPOINT`, `UPLINK_S3_FORCE_PATH_STYLE`, and
    /// `UPLINK_S3_PUBLIC_URL` are optional. A missing bucket is a fatal
    /// configuration error, surfaced at construction rather than per call.
    pub fn from_env() -> UploadResult<Self> {
        let bucket = std::env::var("UPLINK_S3_BUCKET")
            .map_err(|_| UploadError::configuration("UPLINK_S3_BUCKET is not set"))?;

        Ok(Self {
            bucket,
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint_url: std::env::var("UPLINK_S3_ENDPOINT").ok(),
            access_key_id: std::env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
            force_path_style: std::env::var("UPLINK_S3_FORCE_PATH_STYLE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            public_base_url: std::env::var("UPLINK_S3_PUBLIC_URL").ok(),
        })
    }

    pub fn with_region<S: Into<String>>(mut self, region: S) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint_url = Some(endpoint.into());
        self
    }

    pub fn with_credentials<A, K>(mut self, access_key_id: A, secret_access_key: K) -> Self
    where
        A: Into<String>,
        K: Into<String>,
    {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    pub fn with_path_style(mut self) -> Self {
        self.force_path_style = true;
        self
    }

    pub fn with_public_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.public_base_url = Some(url.into());
        self
    }
}

/// [`ObjectStore`] backed by an S3-compatible service.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
    public_base_url: Option<String>,
}

impl S3ObjectStore {
    pub async fn new(config: S3Config) -> UploadResult<Self> {
        if config.bucket.is_empty() {
            return Err(UploadError::configuration("S3 bucket name is empty"));
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(config.region.clone()));

        match (&config.access_key_id, &config.secret_access_key) {
            (Some(access), Some(secret)) => {
                loader = loader.credentials_provider(aws_credential_types::Credentials::new(
                    access.clone(),
                    secret.clone(),
                    None,
                    None,
                    "uplink-static",
                ));
            }
            (None, None) => {}
            _ => {
                return Err(UploadError::configuration(
                    "Both AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together",
                ));
            }
        }

        let base = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&base);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint.clone());
        }
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.bucket,
            region: config.region,
            endpoint_url: config.endpoint_url,
            public_base_url: config.public_base_url,
        })
    }

    /// Build a store from environment configuration.
    pub async fn from_env() -> UploadResult<Self> {
        Self::new(S3Config::from_env()?).await
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn sign_put(
        &self,
        key: &str,
        content_type: &str,
        content_length: u64,
        expires_in_secs: u64,
    ) -> UploadResult<SignedPut> {
        let presigning = PresigningConfig::builder()
            .expires_in(Duration::from_secs(expires_in_secs))
            .build()
            .map_err(|e| UploadError::transfer(format!("Invalid presign window: {e}")))?;

        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .content_length(content_length as i64)
            .presigned(presigning)
            .await
            .map_err(|e| UploadError::transfer(format!("Failed to presign PUT: {e}")))?;

        debug!(bucket = %self.bucket, key, "presigned upload URL");
        Ok(SignedPut {
            url: presigned.uri().to_string(),
            key: key.to_string(),
        })
    }

    fn public_url(&self, key: &str) -> String {
        if let Some(base) = &self.public_base_url {
            return format!("{}/{key}", base.trim_end_matches('/'));
        }
        if let Some(endpoint) = &self.endpoint_url {
            return format!("{}/{}/{key}", endpoint.trim_end_matches('/'), self.bucket);
        }
        format!(
            "https://{}.s3.{}.amazonaws.com/{key}",
            self.bucket, self.region
        )
    }

    async fn exists(&self, key: &str) -> UploadResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match &e {
                SdkError::ServiceError(service_err) => match service_err.err() {
                    HeadObjectError::NotFound(_) => Ok(false),
                    _ => Err(UploadError::transfer(e.to_string())),
                },
                _ => Err(UploadError::transfer(e.to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_bucket_is_a_fatal_configuration_error() {
        std::env::remove_var("UPLINK_S3_BUCKET");
        let err = S3Config::from_env().unwrap_err();
        assert!(matches!(err, UploadError::Configuration { .. }));
        assert!(!err.retryable());
    }

    #[test]
    fn public_urls_prefer_the_configured_base() {
        let config = S3Config::new("media").with_public_base_url("https://cdn.example.com/");
        assert_eq!(config.public_base_url.as_deref(), Some("https://cdn.example.com/"));
    }
}
