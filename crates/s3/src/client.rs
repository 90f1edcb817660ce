//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the S3Handle trait from rft-core.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use jiff::Timestamp;
use rft_core::protocol::s3::{DEFAULT_REGION, S3Handle};
use rft_core::{
    Acl, ObjectMetadata, ObjectPage, ObjectRecord, Principal, Region, Role, WireError, WireResult,
};
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

/// Regions offered for region hints in addition to the configured one
const KNOWN_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ca-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "eu-north-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-south-1",
    "sa-east-1",
];

/// Connection settings of an S3 client
#[derive(Debug, Clone)]
pub struct S3Options {
    /// Custom endpoint for S3 compatible services; `None` for AWS
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Path style addressing instead of virtual hosted buckets
    pub path_style: bool,
}

impl S3Options {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            endpoint: None,
            region: DEFAULT_REGION.to_string(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            path_style: false,
        }
    }
}

/// S3 client wrapper with one SDK client per region
pub struct S3Client {
    base: aws_sdk_s3::Config,
    options: S3Options,
    clients: RwLock<HashMap<String, aws_sdk_s3::Client>>,
}

impl S3Client {
    /// Create a new S3 client from connection settings
    pub async fn new(options: S3Options) -> Self {
        let credentials = aws_credential_types::Credentials::new(
            options.access_key.clone(),
            options.secret_key.clone(),
            None,
            None,
            "rft-static-credentials",
        );

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(options.region.clone()));
        if let Some(endpoint) = &options.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;

        let base = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(options.path_style)
            .build();

        Self {
            base,
            options,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// SDK client addressing `region`
    async fn client(&self, region: &Region) -> aws_sdk_s3::Client {
        if let Some(client) = self.clients.read().await.get(&region.name) {
            return client.clone();
        }
        let config = self
            .base
            .to_builder()
            .region(aws_sdk_s3::config::Region::new(region.name.clone()))
            .build();
        let client = aws_sdk_s3::Client::from_conf(config);
        self.clients
            .write()
            .await
            .insert(region.name.clone(), client.clone());
        debug!(region = %region, "Created S3 client for region");
        client
    }

    /// Client of the configured region, used for account wide calls
    async fn default_client(&self) -> aws_sdk_s3::Client {
        self.client(&Region::new(self.options.region.clone())).await
    }
}

/// Classify an SDK error as a wire fault
pub(crate) fn wire_error<E>(error: SdkError<E, HttpResponse>) -> WireError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    match &error {
        SdkError::ServiceError(service_err) => {
            let status = service_err.raw().status().as_u16();
            let err = service_err.err();
            let message = err
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Service error: {err}"));
            match err.code() {
                Some(code) => WireError::http_code(status, code, message),
                None => WireError::http(status, message),
            }
        }
        SdkError::TimeoutError(_) => WireError::transport("Request timeout"),
        SdkError::DispatchFailure(err) => {
            WireError::transport(format!("Network dispatch error: {err:?}"))
        }
        SdkError::ResponseError(err) => WireError::transport(format!("Response error: {err:?}")),
        SdkError::ConstructionFailure(err) => {
            WireError::transport(format!("Request construction failed: {err:?}"))
        }
        _ => WireError::transport(error.to_string()),
    }
}

fn timestamp(value: Option<&aws_smithy_types::DateTime>) -> Option<Timestamp> {
    value.and_then(|dt| Timestamp::from_second(dt.secs()).ok())
}

fn etag(value: Option<&str>) -> Option<String> {
    value.map(|etag| etag.trim_matches('"').to_string())
}

/// Canned ACL closest to the grants
///
/// Only the everyone and authenticated-users groups can be expressed; other
/// grantees are dropped.
pub(crate) fn canned_acl(acl: &Acl) -> ObjectCannedAcl {
    if acl.contains(&Principal::Everyone, Role::Write) {
        ObjectCannedAcl::PublicReadWrite
    } else if acl.contains(&Principal::Everyone, Role::Read) {
        ObjectCannedAcl::PublicRead
    } else if acl.contains(&Principal::Authenticated, Role::Read) {
        ObjectCannedAcl::AuthenticatedRead
    } else {
        ObjectCannedAcl::Private
    }
}

#[async_trait]
impl S3Handle for S3Client {
    fn regions(&self) -> Vec<Region> {
        let mut regions: Vec<Region> = KNOWN_REGIONS.iter().map(|name| Region::new(*name)).collect();
        if !KNOWN_REGIONS.contains(&self.options.region.as_str()) {
            regions.push(Region::new(self.options.region.clone()));
        }
        regions
    }

    async fn bucket_location(&self, bucket: &str) -> WireResult<Option<String>> {
        let response = self
            .default_client()
            .await
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(wire_error)?;
        Ok(response
            .location_constraint()
            .map(|constraint| constraint.as_str().to_string()))
    }

    async fn list_buckets(&self) -> WireResult<Vec<String>> {
        let response = self
            .default_client()
            .await
            .list_buckets()
            .send()
            .await
            .map_err(wire_error)?;
        Ok(response
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }

    async fn head_bucket(&self, region: &Region, bucket: &str) -> WireResult<()> {
        self.client(region)
            .await
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(wire_error)?;
        Ok(())
    }

    async fn delete_bucket(&self, region: &Region, bucket: &str) -> WireResult<()> {
        self.client(region)
            .await
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(wire_error)?;
        Ok(())
    }

    async fn head_object(
        &self,
        region: &Region,
        bucket: &str,
        key: &str,
    ) -> WireResult<ObjectMetadata> {
        let response = self
            .client(region)
            .await
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(wire_error)?;

        Ok(ObjectMetadata {
            size: response
                .content_length()
                .and_then(|len| u64::try_from(len).ok())
                .unwrap_or(0),
            etag: etag(response.e_tag()),
            content_type: response.content_type().map(str::to_string),
            modified: timestamp(response.last_modified()),
            storage_class: response.storage_class().map(|sc| sc.as_str().to_string()),
            ..Default::default()
        })
    }

    async fn delete_object(&self, region: &Region, bucket: &str, key: &str) -> WireResult<()> {
        self.client(region)
            .await
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(wire_error)?;
        Ok(())
    }

    async fn copy_object(
        &self,
        region: &Region,
        source_bucket: &str,
        source_key: &str,
        target_bucket: &str,
        target_key: &str,
    ) -> WireResult<()> {
        let copy_source = format!("{source_bucket}/{}", urlencoding::encode(source_key));
        self.client(region)
            .await
            .copy_object()
            .copy_source(copy_source)
            .bucket(target_bucket)
            .key(target_key)
            .send()
            .await
            .map_err(wire_error)?;
        Ok(())
    }

    async fn list_objects(
        &self,
        region: &Region,
        bucket: &str,
        prefix: &str,
        delimiter: Option<char>,
        continuation: Option<&str>,
        limit: usize,
    ) -> WireResult<ObjectPage> {
        let mut request = self
            .client(region)
            .await
            .list_objects_v2()
            .bucket(bucket)
            .max_keys(i32::try_from(limit).unwrap_or(i32::MAX));
        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }
        if let Some(delimiter) = delimiter {
            request = request.delimiter(delimiter.to_string());
        }
        if let Some(token) = continuation {
            request = request.continuation_token(token);
        }
        let response = request.send().await.map_err(wire_error)?;

        let mut records: Vec<ObjectRecord> = response
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix())
            .map(ObjectRecord::prefix)
            .collect();
        for object in response.contents() {
            let Some(key) = object.key() else { continue };
            records.push(ObjectRecord {
                modified: timestamp(object.last_modified()),
                etag: etag(object.e_tag()),
                storage_class: object.storage_class().map(|sc| sc.as_str().to_string()),
                ..ObjectRecord::object(
                    key,
                    object.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0),
                )
            });
        }

        let next = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };
        Ok(ObjectPage { records, next })
    }

    async fn put_object_acl(
        &self,
        region: &Region,
        bucket: &str,
        key: &str,
        acl: &Acl,
    ) -> WireResult<()> {
        let canned = canned_acl(acl);
        debug!(bucket, key, acl = canned.as_str(), "Put object ACL");
        self.client(region)
            .await
            .put_object_acl()
            .bucket(bucket)
            .key(key)
            .acl(canned)
            .send()
            .await
            .map_err(wire_error)?;
        Ok(())
    }

    async fn presign_get(
        &self,
        region: &Region,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> WireResult<Url> {
        let config = aws_sdk_s3::presigning::PresigningConfig::expires_in(expiry)
            .map_err(|e| WireError::transport(format!("presign_get config: {e}")))?;
        let request = self
            .client(region)
            .await
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(wire_error)?;
        Url::parse(request.uri()).map_err(|e| WireError::transport(format!("presign_get: {e}")))
    }
}
