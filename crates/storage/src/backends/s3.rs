//! S3-compatible storage backend using AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::ObjectStore;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::future::ProvideCredentials as ProvideCredentialsFuture;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::types::{GlacierJobParameters, RestoreRequest, Tier as S3Tier};
use aws_smithy_http_client::Builder as SmithyHttpClientBuilder;
use std::time::Duration;
use thaw_core::{HeadMetadata, Tier};
use tokio::sync::OnceCell;
use tracing::instrument;

/// Marker included in lazy-credentials initialization errors so we can map them
/// to actionable storage config errors instead of generic S3 transport failures.
const CREDENTIALS_INIT_ERROR_MARKER: &str = "thaw-s3-lazy-credentials-init";
const CREDENTIALS_RESOLVE_ERROR_MARKER: &str = "thaw-s3-lazy-credentials-resolve";

/// HTTP status S3 returns for `RestoreAlreadyInProgress`.
const STATUS_CONFLICT: u16 = 409;

/// Lazily initializes the AWS default credentials chain on first signed request.
///
/// This avoids constructor-time side effects (notably TLS/native-root initialization)
/// in environments where no root certificates are available.
#[derive(Debug)]
struct LazyDefaultCredentialsProvider {
    region: String,
    chain: OnceCell<aws_config::default_provider::credentials::DefaultCredentialsChain>,
}

impl LazyDefaultCredentialsProvider {
    fn new(region: String) -> Self {
        Self {
            region,
            chain: OnceCell::new(),
        }
    }

    async fn build_chain(
        &self,
    ) -> Result<aws_config::default_provider::credentials::DefaultCredentialsChain, CredentialsError>
    {
        let region = aws_config::Region::new(self.region.clone());

        tokio::task::spawn(async move {
            aws_config::default_provider::credentials::DefaultCredentialsChain::builder()
                .region(region)
                .build()
                .await
        })
        .await
        .map_err(|join_err| {
            CredentialsError::provider_error(format!(
                "{CREDENTIALS_INIT_ERROR_MARKER}: failed to initialize AWS default credential chain: {join_err}"
            ))
        })
    }

    async fn chain(
        &self,
    ) -> Result<&aws_config::default_provider::credentials::DefaultCredentialsChain, CredentialsError>
    {
        self.chain
            .get_or_try_init(|| async { self.build_chain().await })
            .await
    }

    async fn credentials(&self) -> aws_credential_types::provider::Result {
        let chain = self.chain().await?;
        chain.provide_credentials().await.map_err(|err| {
            CredentialsError::provider_error(format!(
                "{CREDENTIALS_RESOLVE_ERROR_MARKER}: default AWS credentials resolution failed: {err}"
            ))
        })
    }
}

impl ProvideCredentials for LazyDefaultCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> ProvideCredentialsFuture<'a>
    where
        Self: 'a,
    {
        ProvideCredentialsFuture::new(self.credentials())
    }
}

fn map_s3_operation_error<E>(err: aws_sdk_s3::error::SdkError<E>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let err_text = err.to_string();
    if err_text.contains(CREDENTIALS_INIT_ERROR_MARKER)
        || err_text.contains(CREDENTIALS_RESOLVE_ERROR_MARKER)
    {
        return StorageError::Config(
            "S3 credential initialization failed. Configure AWS credentials explicitly or ensure ambient AWS credentials and trust roots are available."
                .to_string(),
        );
    }

    StorageError::S3(Box::new(err))
}

fn to_s3_tier(tier: Tier) -> S3Tier {
    match tier {
        Tier::Standard => S3Tier::Standard,
        Tier::Bulk => S3Tier::Bulk,
    }
}

/// Connection settings for [`S3Backend`].
#[derive(Clone, Debug)]
pub struct S3Settings {
    pub bucket: String,
    /// Custom endpoint; bare `host:port` values are treated as `http://`.
    pub endpoint: Option<String>,
    /// Region (default: us-east-1).
    pub region: Option<String>,
    /// Key prefix prepended to every object key.
    pub prefix: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Use path-style URLs (`endpoint/bucket/key`). Required for MinIO.
    pub force_path_style: bool,
    /// Timeout for one operation including SDK retries.
    pub operation_timeout: Duration,
    /// Attempts per operation for transient errors (1 = no retries).
    pub max_attempts: u32,
}

impl S3Settings {
    /// Settings for a bucket with default transport options.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            endpoint: None,
            region: None,
            prefix: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
            operation_timeout: Duration::from_secs(30),
            max_attempts: 3,
        }
    }
}

/// S3-compatible object store using AWS SDK.
pub struct S3Backend {
    client: Client,
    bucket: String,
    prefix: Option<String>,
    /// Normalized endpoint, for diagnostics.
    endpoint: String,
    region: String,
    operation_timeout: Duration,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl S3Backend {
    /// Create a new S3 backend.
    ///
    /// Retries of transient errors are handled by the SDK's standard retry
    /// strategy, bounded by `max_attempts`; `operation_timeout` caps the whole
    /// operation including those retries.
    pub async fn new(settings: S3Settings) -> StorageResult<Self> {
        let S3Settings {
            bucket,
            endpoint,
            region,
            prefix,
            access_key_id,
            secret_access_key,
            force_path_style,
            operation_timeout,
            max_attempts,
        } = settings;

        if access_key_id.is_some() ^ secret_access_key.is_some() {
            return Err(StorageError::Config(
                "s3 config requires both access_key_id and secret_access_key when either is set"
                    .to_string(),
            ));
        }
        if max_attempts == 0 {
            return Err(StorageError::Config(
                "s3 max_attempts must be at least 1".to_string(),
            ));
        }

        let resolved_region = region.unwrap_or_else(|| "us-east-1".to_string());
        let mut s3_config_builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(aws_config::Region::new(resolved_region.clone()))
            .retry_config(RetryConfig::standard().with_max_attempts(max_attempts))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(operation_timeout)
                    .build(),
            );

        // Apply credentials: explicit config or ambient AWS credential chain
        if let (Some(key_id), Some(secret)) = (access_key_id, secret_access_key) {
            let credentials = aws_sdk_s3::config::Credentials::new(
                key_id,
                secret,
                None, // session token
                None, // expiration
                "thaw-config",
            );
            s3_config_builder = s3_config_builder.credentials_provider(credentials);
        } else {
            s3_config_builder = s3_config_builder
                .credentials_provider(LazyDefaultCredentialsProvider::new(resolved_region.clone()));
        }

        let normalized_endpoint = endpoint.as_ref().map(|endpoint_url| {
            // Handle bare host:port endpoints (e.g., "minio:9000") by prepending http://
            let endpoint_lower = endpoint_url.to_lowercase();
            if endpoint_lower.starts_with("http://") || endpoint_lower.starts_with("https://") {
                endpoint_url.clone()
            } else {
                format!("http://{}", endpoint_url)
            }
        });

        if let Some(endpoint_url) = &normalized_endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);

            // Plain HTTP endpoints don't need native trust roots.
            if endpoint_url.to_ascii_lowercase().starts_with("http://") {
                s3_config_builder =
                    s3_config_builder.http_client(SmithyHttpClientBuilder::new().build_http());
            }
        }

        if force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        let stored_endpoint = match &normalized_endpoint {
            Some(url) => url.clone(),
            None => format!("s3.{}.amazonaws.com", resolved_region),
        };

        // Normalize prefix: strip trailing slashes to avoid double-slash keys like "prefix//key"
        let normalized_prefix = prefix
            .map(|p| p.trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty());

        Ok(Self {
            client,
            bucket,
            prefix: normalized_prefix,
            endpoint: stored_endpoint,
            region: resolved_region,
            operation_timeout,
        })
    }

    /// Normalized endpoint this backend talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the full object key for a key (applies prefix if configured).
    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix, key),
            None => key.to_string(),
        }
    }

    /// Convert an AWS SDK error to StorageError, mapping NotFound appropriately.
    fn map_sdk_error<E>(err: aws_sdk_s3::error::SdkError<E>, key: &str) -> StorageError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        if let aws_sdk_s3::error::SdkError::ServiceError(ref service_err) = err {
            let raw = service_err.raw();
            if raw.status().as_u16() == 404 {
                return StorageError::NotFound(key.to_string());
            }
        }
        map_s3_operation_error(err)
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    #[instrument(skip(self), fields(backend = "s3"))]
    async fn head(&self, key: &str) -> StorageResult<HeadMetadata> {
        let full_key = self.full_key(key);
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key))?;

        let content_length = output.content_length().unwrap_or(0);
        let size = u64::try_from(content_length).map_err(|_| StorageError::InvalidMetadata {
            key: key.to_string(),
            reason: format!("negative content length {content_length}"),
        })?;

        Ok(HeadMetadata {
            size,
            storage_class: output.storage_class().map(|class| class.as_str().to_string()),
            restore: output.restore().map(str::to_string),
        })
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn restore(&self, key: &str, days: u32, tier: Tier) -> StorageResult<()> {
        let full_key = self.full_key(key);
        let job_parameters = GlacierJobParameters::builder()
            .tier(to_s3_tier(tier))
            .build()
            .map_err(|e| StorageError::S3(Box::new(e)))?;
        let request = RestoreRequest::builder()
            .days(i32::try_from(days).unwrap_or(i32::MAX))
            .glacier_job_parameters(job_parameters)
            .build();

        match self
            .client
            .restore_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .restore_request(request)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                if let aws_sdk_s3::error::SdkError::ServiceError(ref service_err) = err
                    && service_err.raw().status().as_u16() == STATUS_CONFLICT
                {
                    tracing::debug!(key = %key, "Restore already in progress");
                    return Ok(());
                }
                Err(Self::map_sdk_error(err, key))
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn health_check(&self) -> StorageResult<()> {
        let check = self.client.head_bucket().bucket(&self.bucket).send();

        tokio::time::timeout(self.operation_timeout, check)
            .await
            .map_err(|_| StorageError::Timeout(self.operation_timeout))?
            .map_err(map_s3_operation_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(prefix: Option<&str>) -> S3Settings {
        S3Settings {
            endpoint: Some("s3.test".to_string()),
            region: Some("us-east-1".to_string()),
            prefix: prefix.map(str::to_string),
            access_key_id: Some("access".to_string()),
            secret_access_key: Some("secret".to_string()),
            force_path_style: true,
            ..S3Settings::new("test-bucket")
        }
    }

    #[tokio::test]
    async fn test_full_key_applies_prefix() {
        let backend = S3Backend::new(settings(Some("loki/"))).await.unwrap();
        assert_eq!(
            backend.full_key("acme/000000000000abcd/1:2:3"),
            "loki/acme/000000000000abcd/1:2:3"
        );

        let backend = S3Backend::new(settings(None)).await.unwrap();
        assert_eq!(backend.full_key("acme/x"), "acme/x");
    }

    #[tokio::test]
    async fn test_empty_prefix_is_ignored() {
        let backend = S3Backend::new(settings(Some("/"))).await.unwrap();
        assert_eq!(backend.full_key("acme/x"), "acme/x");
    }

    #[tokio::test]
    async fn test_s3_new_requires_complete_credentials() {
        let err = S3Backend::new(S3Settings {
            access_key_id: Some("access".to_string()),
            ..S3Settings::new("bucket")
        })
        .await
        .unwrap_err();

        assert!(matches!(err, StorageError::Config(_)));
    }

    #[tokio::test]
    async fn test_s3_new_rejects_zero_attempts() {
        let err = S3Backend::new(S3Settings {
            max_attempts: 0,
            ..S3Settings::new("bucket")
        })
        .await
        .unwrap_err();

        assert!(matches!(err, StorageError::Config(_)));
    }

    #[tokio::test]
    async fn test_s3_new_normalizes_endpoint() {
        let backend = S3Backend::new(S3Settings {
            endpoint: Some("minio:9000".to_string()),
            force_path_style: true,
            ..S3Settings::new("bucket")
        })
        .await
        .unwrap();
        assert_eq!(backend.endpoint(), "http://minio:9000");
        assert_eq!(backend.region, "us-east-1");

        let backend = S3Backend::new(S3Settings {
            region: Some("eu-west-1".to_string()),
            ..S3Settings::new("bucket")
        })
        .await
        .unwrap();
        assert_eq!(backend.endpoint(), "s3.eu-west-1.amazonaws.com");
    }

    #[test]
    fn test_tier_mapping() {
        assert_eq!(to_s3_tier(Tier::Standard), S3Tier::Standard);
        assert_eq!(to_s3_tier(Tier::Bulk), S3Tier::Bulk);
    }
}
