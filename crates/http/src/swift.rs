//! OpenStack Swift client

use std::collections::HashMap;

use async_trait::async_trait;
use http::Method;
use jiff::Timestamp;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use rft_core::protocol::swift::SwiftHandle;
use rft_core::{ObjectMetadata, ObjectPage, ObjectRecord, Region, WireError, WireResult};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::response::{OBJECT_MANIFEST, check, encode_path, metadata, transport};

const AUTH_TOKEN: &str = "X-Auth-Token";
const AUTH_USER: &str = "X-Auth-User";
const AUTH_KEY: &str = "X-Auth-Key";
const STORAGE_URL: &str = "X-Storage-Url";
const COPY_FROM: &str = "X-Copy-From";

/// Containers requested per account listing page
const CONTAINER_PAGE: usize = 10_000;

/// Credentials for TempAuth style (v1.0) authentication
#[derive(Debug, Clone)]
pub struct SwiftAuth {
    pub auth_url: Url,
    pub user: String,
    pub key: String,
    /// Name given to the single region of a v1.0 account
    pub region: String,
}

/// Authenticated Swift client over `reqwest`
pub struct SwiftClient {
    client: Client,
    token: String,
    regions: Vec<Region>,
}

impl SwiftClient {
    /// Client for a token and region catalog obtained elsewhere
    pub fn new(client: Client, token: impl Into<String>, regions: Vec<Region>) -> Self {
        Self {
            client,
            token: token.into(),
            regions,
        }
    }

    /// Authenticate against a v1.0 auth endpoint
    pub async fn authenticate(auth: &SwiftAuth) -> WireResult<Self> {
        let client = Client::new();
        let response = client
            .get(auth.auth_url.clone())
            .header(AUTH_USER, &auth.user)
            .header(AUTH_KEY, &auth.key)
            .send()
            .await
            .map_err(transport)?;
        let response = check(response).await?;

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| {
                    WireError::http(
                        response.status().as_u16(),
                        format!("Missing {name} in authentication response"),
                    )
                })
        };
        let token = header(AUTH_TOKEN)?;
        let storage_url = header(STORAGE_URL)?;
        let storage_url = Url::parse(&storage_url)
            .map_err(|e| WireError::transport(format!("Invalid storage URL {storage_url}: {e}")))?;
        debug!(user = %auth.user, storage = %storage_url, "Authenticated");

        let region = Region::new(auth.region.clone())
            .with_storage_url(storage_url)
            .with_default(true);
        Ok(Self::new(client, token, vec![region]))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(AUTH_TOKEN, &self.token)
    }

    async fn send(&self, request: RequestBuilder) -> WireResult<reqwest::Response> {
        check(request.send().await.map_err(transport)?).await
    }
}

fn storage_url(region: &Region) -> WireResult<String> {
    let url = region.storage_url.as_ref().ok_or_else(|| {
        WireError::transport(format!("Region {} has no storage endpoint", region.name))
    })?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn container_url(region: &Region, container: &str) -> WireResult<String> {
    Ok(format!(
        "{}/{}",
        storage_url(region)?,
        urlencoding::encode(container)
    ))
}

fn object_url(region: &Region, container: &str, key: &str) -> WireResult<String> {
    Ok(format!("{}/{}", container_url(region, container)?, encode_path(key)))
}

/// One record of a JSON container listing
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listed {
    Prefix {
        subdir: String,
    },
    Object {
        name: String,
        #[serde(default)]
        bytes: u64,
        hash: Option<String>,
        content_type: Option<String>,
        last_modified: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct ListedContainer {
    name: String,
}

/// Listing timestamps are UTC without an offset, e.g. `2024-03-01T12:00:00.123456`
fn listing_time(value: &str) -> Option<Timestamp> {
    let datetime: DateTime = value.parse().ok()?;
    datetime
        .to_zoned(TimeZone::UTC)
        .ok()
        .map(|zoned| zoned.timestamp())
}

/// Parse a JSON object listing; a full page carries the marker of the next one
fn parse_listing(body: &str, limit: usize) -> WireResult<ObjectPage> {
    if body.trim().is_empty() {
        return Ok(ObjectPage::default());
    }
    let listed: Vec<Listed> = serde_json::from_str(body)
        .map_err(|e| WireError::http(StatusCode::OK.as_u16(), format!("Invalid listing: {e}")))?;
    let full = listed.len() >= limit;
    let records: Vec<ObjectRecord> = listed
        .into_iter()
        .map(|record| match record {
            Listed::Prefix { subdir } => ObjectRecord::prefix(subdir),
            Listed::Object {
                name,
                bytes,
                hash,
                content_type,
                last_modified,
            } => ObjectRecord {
                etag: hash,
                content_type,
                modified: last_modified.as_deref().and_then(listing_time),
                ..ObjectRecord::object(name, bytes)
            },
        })
        .collect();
    let next = if full {
        records.last().map(|record| record.key.clone())
    } else {
        None
    };
    Ok(ObjectPage { records, next })
}

#[derive(Debug, Deserialize)]
struct BulkDeleteReply {
    #[serde(rename = "Response Status")]
    status: String,
    #[serde(rename = "Errors", default)]
    errors: Vec<(String, String)>,
}

fn status_code(status: &str) -> u16 {
    status
        .split_whitespace()
        .next()
        .and_then(|code| code.parse().ok())
        .unwrap_or(500)
}

/// Failed keys of a bulk delete reply
///
/// Error names are `/{container}/{encoded key}`; keys already gone are
/// counted as not found by the server and never reported here.
fn parse_bulk_delete(body: &str, container: &str) -> WireResult<Vec<(String, WireError)>> {
    let reply: BulkDeleteReply = serde_json::from_str(body).map_err(|e| {
        WireError::http(StatusCode::OK.as_u16(), format!("Invalid bulk delete reply: {e}"))
    })?;
    let prefix = format!("/{}/", urlencoding::encode(container));
    let failures: Vec<(String, WireError)> = reply
        .errors
        .into_iter()
        .map(|(name, status)| {
            let encoded = name.strip_prefix(&prefix).unwrap_or(&name);
            let key = urlencoding::decode(encoded)
                .map(|key| key.into_owned())
                .unwrap_or_else(|_| encoded.to_string());
            (key, WireError::http(status_code(&status), status))
        })
        .collect();

    let code = status_code(&reply.status);
    if failures.is_empty() && !(200..300).contains(&code) {
        return Err(WireError::http(code, reply.status));
    }
    Ok(failures)
}

#[async_trait]
impl SwiftHandle for SwiftClient {
    fn regions(&self) -> Vec<Region> {
        self.regions.clone()
    }

    async fn list_containers(&self, region: &Region) -> WireResult<Vec<String>> {
        let url = storage_url(region)?;
        let mut containers = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let mut request = self
                .request(Method::GET, &url)
                .query(&[("format", "json"), ("limit", CONTAINER_PAGE.to_string().as_str())]);
            if let Some(marker) = &marker {
                request = request.query(&[("marker", marker)]);
            }
            let body = self.send(request).await?.text().await.map_err(transport)?;
            if body.trim().is_empty() {
                break;
            }
            let page: Vec<ListedContainer> = serde_json::from_str(&body).map_err(|e| {
                WireError::http(StatusCode::OK.as_u16(), format!("Invalid listing: {e}"))
            })?;
            let full = page.len() >= CONTAINER_PAGE;
            marker = page.last().map(|c| c.name.clone());
            containers.extend(page.into_iter().map(|c| c.name));
            if !full {
                break;
            }
        }
        Ok(containers)
    }

    async fn head_container(&self, region: &Region, container: &str) -> WireResult<()> {
        let url = container_url(region, container)?;
        self.send(self.request(Method::HEAD, &url)).await?;
        Ok(())
    }

    async fn delete_container(&self, region: &Region, container: &str) -> WireResult<()> {
        let url = container_url(region, container)?;
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    async fn head_object(
        &self,
        region: &Region,
        container: &str,
        key: &str,
    ) -> WireResult<ObjectMetadata> {
        let url = object_url(region, container, key)?;
        let response = self.send(self.request(Method::HEAD, &url)).await?;
        Ok(metadata(response.headers()))
    }

    async fn delete_object(&self, region: &Region, container: &str, key: &str) -> WireResult<()> {
        let url = object_url(region, container, key)?;
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    async fn bulk_delete(
        &self,
        region: &Region,
        container: &str,
        keys: &[String],
    ) -> WireResult<Vec<(String, WireError)>> {
        let url = format!("{}?bulk-delete", storage_url(region)?);
        let body: String = keys
            .iter()
            .map(|key| format!("/{}/{}\n", urlencoding::encode(container), encode_path(key)))
            .collect();
        let request = self
            .request(Method::POST, &url)
            .header(CONTENT_TYPE, "text/plain")
            .header(ACCEPT, "application/json")
            .body(body);
        let reply = self.send(request).await?.text().await.map_err(transport)?;
        parse_bulk_delete(&reply, container)
    }

    async fn copy_object(
        &self,
        region: &Region,
        source_container: &str,
        source_key: &str,
        target_container: &str,
        target_key: &str,
    ) -> WireResult<()> {
        let url = object_url(region, target_container, target_key)?;
        let request = self
            .request(Method::PUT, &url)
            .header(COPY_FROM, copy_source(source_container, source_key))
            .header(CONTENT_LENGTH, "0");
        self.send(request).await?;
        Ok(())
    }

    async fn copy_manifest(
        &self,
        region: &Region,
        source_container: &str,
        source_key: &str,
        target_container: &str,
        target_key: &str,
        manifest: &ObjectMetadata,
    ) -> WireResult<()> {
        let url = object_url(region, target_container, target_key)?;
        let (url, header, value) =
            manifest_copy(url, copy_source(source_container, source_key), manifest);
        debug!(url = %url, header, "Copy large object manifest");
        let request = self
            .request(Method::PUT, &url)
            .header(header, value)
            .header(CONTENT_LENGTH, "0");
        self.send(request).await?;
        Ok(())
    }

    async fn list_objects(
        &self,
        region: &Region,
        container: &str,
        prefix: &str,
        delimiter: Option<char>,
        marker: Option<&str>,
        limit: usize,
    ) -> WireResult<ObjectPage> {
        let url = container_url(region, container)?;
        let mut request = self
            .request(Method::GET, &url)
            .query(&[("format", "json"), ("limit", limit.to_string().as_str())]);
        if !prefix.is_empty() {
            request = request.query(&[("prefix", prefix)]);
        }
        if let Some(delimiter) = delimiter {
            request = request.query(&[("delimiter", delimiter.to_string())]);
        }
        if let Some(marker) = marker {
            request = request.query(&[("marker", marker)]);
        }
        let body = self.send(request).await?.text().await.map_err(transport)?;
        parse_listing(&body, limit)
    }

    async fn account_metadata(&self, region: &Region) -> WireResult<HashMap<String, String>> {
        let url = storage_url(region)?;
        let response = self.send(self.request(Method::HEAD, &url)).await?;
        Ok(response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect())
    }
}

/// `X-Copy-From` value naming an object
fn copy_source(container: &str, key: &str) -> String {
    format!("/{}/{}", urlencoding::encode(container), encode_path(key))
}

/// Request URL and header writing a copy of a large object manifest
///
/// A dynamic manifest is recreated with the same segment prefix. A static
/// manifest is copied as stored with `multipart-manifest=get`.
fn manifest_copy(
    url: String,
    source: String,
    manifest: &ObjectMetadata,
) -> (String, &'static str, String) {
    match &manifest.manifest {
        Some(prefix) => (url, OBJECT_MANIFEST, prefix.clone()),
        None => (format!("{url}?multipart-manifest=get"), COPY_FROM, source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> Region {
        Region::new("DFW").with_storage_url(
            "https://storage101.dfw1.example.net/v1/MossoCloudFS_acct/"
                .parse()
                .unwrap(),
        )
    }

    #[test]
    fn test_object_url_encoding() {
        assert_eq!(
            object_url(&region(), "my files", "dir/a b.txt").unwrap(),
            "https://storage101.dfw1.example.net/v1/MossoCloudFS_acct/my%20files/dir/a%20b.txt"
        );
        assert!(object_url(&Region::new("ORD"), "c", "k").is_err());
    }

    #[test]
    fn test_parse_listing_records() {
        let body = r#"[
            {"subdir": "photos/2024/"},
            {"name": "photos/a.jpg", "bytes": 12, "hash": "abc",
             "content_type": "image/jpeg", "last_modified": "2009-02-13T23:31:30.000000"},
            {"name": "photos/dir", "bytes": 0, "content_type": "application/directory"}
        ]"#;
        let page = parse_listing(body, 100).unwrap();
        assert_eq!(page.next, None);
        assert_eq!(page.records.len(), 3);
        assert!(page.records[0].prefix);
        assert_eq!(page.records[0].key, "photos/2024/");
        assert_eq!(page.records[1].size, 12);
        assert_eq!(page.records[1].etag.as_deref(), Some("abc"));
        assert_eq!(
            page.records[1].modified.map(|t| t.as_second()),
            Some(1_234_567_890)
        );
        assert_eq!(
            page.records[2].content_type.as_deref(),
            Some("application/directory")
        );
    }

    #[test]
    fn test_full_page_has_marker() {
        let body = r#"[{"name": "a", "bytes": 1}, {"name": "b", "bytes": 2}]"#;
        let page = parse_listing(body, 2).unwrap();
        assert_eq!(page.next.as_deref(), Some("b"));
        assert_eq!(parse_listing("", 2).unwrap(), ObjectPage::default());
        assert!(parse_listing("not json", 2).is_err());
    }

    #[test]
    fn test_parse_bulk_delete_failures() {
        let body = r#"{
            "Number Not Found": 1,
            "Response Status": "400 Bad Request",
            "Errors": [["/my%20files/seg/00000001", "403 Forbidden"]],
            "Number Deleted": 2,
            "Response Body": ""
        }"#;
        let failures = parse_bulk_delete(body, "my files").unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "seg/00000001");
        assert_eq!(failures[0].1, WireError::http(403, "403 Forbidden"));
    }

    #[test]
    fn test_parse_bulk_delete_status() {
        let ok = r#"{"Response Status": "200 OK", "Errors": []}"#;
        assert!(parse_bulk_delete(ok, "c").unwrap().is_empty());

        let denied = r#"{"Response Status": "401 Unauthorized", "Errors": []}"#;
        let err = parse_bulk_delete(denied, "c").unwrap_err();
        assert_eq!(err, WireError::http(401, "401 Unauthorized"));
    }

    #[test]
    fn test_copy_source_encoding() {
        assert_eq!(copy_source("my files", "dir/a b.txt"), "/my%20files/dir/a%20b.txt");
    }

    #[test]
    fn test_manifest_copy_keeps_segments() {
        let dlo = ObjectMetadata {
            manifest: Some("c/video.mp4/".to_string()),
            ..Default::default()
        };
        let (url, header, value) =
            manifest_copy("https://h/v1/a/c/b".to_string(), "/c/a".to_string(), &dlo);
        assert_eq!(url, "https://h/v1/a/c/b");
        assert_eq!(header, OBJECT_MANIFEST);
        assert_eq!(value, "c/video.mp4/");

        let slo = ObjectMetadata {
            static_large_object: true,
            ..Default::default()
        };
        let (url, header, value) =
            manifest_copy("https://h/v1/a/c/b".to_string(), "/c/a".to_string(), &slo);
        assert_eq!(url, "https://h/v1/a/c/b?multipart-manifest=get");
        assert_eq!(header, COPY_FROM);
        assert_eq!(value, "/c/a");
    }
}
