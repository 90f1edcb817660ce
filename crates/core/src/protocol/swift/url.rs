use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use jiff::Timestamp;
use sha1::Sha1;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

use super::SwiftHandle;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::features::{SignedUrl, UrlFeature};
use crate::region::{Region, RegionResolver};
use crate::session::Session;

type HmacSha1 = Hmac<Sha1>;

/// Account metadata header holding the temporary URL secret
pub const TEMP_URL_KEY_HEADER: &str = "X-Account-Meta-Temp-URL-Key";

/// Computes Swift temporary URLs locally
#[derive(Debug, Clone, Copy, Default)]
pub struct TempUrlSigner;

impl TempUrlSigner {
    /// Signed GET URL for `entry` in `region`, valid for `expiry` from now
    pub fn create(region: &Region, secret: &str, entry: &Entry, expiry: Duration) -> Result<SignedUrl> {
        Self::create_at(region, secret, entry, expiry, Timestamp::now())
    }

    pub fn create_at(
        region: &Region,
        secret: &str,
        entry: &Entry,
        expiry: Duration,
        now: Timestamp,
    ) -> Result<SignedUrl> {
        let storage = region.storage_url()?;
        let host = storage
            .host_str()
            .ok_or_else(|| Error::Config(format!("Storage URL {storage} has no host")))?;
        let expires = now.as_second() + i64::try_from(expiry.as_secs()).unwrap_or(i64::MAX / 2);
        let path = object_path(storage, entry);

        let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
            .map_err(|e| Error::Config(format!("Invalid temporary URL key: {e}")))?;
        mac.update(format!("GET\n{expires}\n{path}").as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        let url = Url::parse(&format!(
            "https://{host}{path}?temp_url_sig={signature}&temp_url_expires={expires}"
        ))
        .map_err(|e| Error::Protocol {
            message: format!("Invalid temporary URL: {e}"),
            status: None,
        })?;
        let expires = Timestamp::from_second(expires).map_err(|e| Error::Protocol {
            message: format!("Invalid expiry: {e}"),
            status: None,
        })?;
        Ok(SignedUrl { url, expires })
    }
}

/// Storage path of an object: endpoint path, container and key, percent-encoded
fn object_path(storage: &Url, entry: &Entry) -> String {
    let mut path = storage.path().trim_end_matches('/').to_string();
    for segment in entry.path().segments() {
        path.push('/');
        path.push_str(&urlencoding::encode(segment));
    }
    path
}

/// Temporary URL secrets per region, fetched once from the account metadata
#[derive(Debug, Default)]
pub struct TempUrlKeys {
    keys: RwLock<HashMap<String, Option<String>>>,
}

impl TempUrlKeys {
    pub async fn get(&self, region: &str) -> Option<Option<String>> {
        self.keys.read().await.get(region).cloned()
    }

    pub async fn insert(&self, region: &str, key: Option<String>) {
        self.keys.write().await.insert(region.to_string(), key);
    }
}

/// Temporary URLs for Swift objects
pub struct SwiftUrl<H> {
    session: Session<H>,
    regions: RegionResolver,
    keys: Arc<TempUrlKeys>,
}

impl<H: SwiftHandle + 'static> SwiftUrl<H> {
    pub fn new(session: Session<H>, regions: RegionResolver, keys: Arc<TempUrlKeys>) -> Self {
        Self {
            session,
            regions,
            keys,
        }
    }

    async fn secret(&self, region: &Region) -> Option<String> {
        if let Some(cached) = self.keys.get(&region.name).await {
            return cached;
        }
        let result = self.session.lock().await.account_metadata(region).await;
        match result {
            Ok(headers) => {
                let key = headers
                    .into_iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(TEMP_URL_KEY_HEADER))
                    .map(|(_, value)| value)
                    .filter(|value| !value.is_empty());
                debug!(region = %region, present = key.is_some(), "Fetched temporary URL key");
                self.keys.insert(&region.name, key.clone()).await;
                key
            }
            Err(e) => {
                warn!(region = %region, error = %e, "Cannot read account metadata");
                None
            }
        }
    }
}

#[async_trait]
impl<H: SwiftHandle + 'static> UrlFeature for SwiftUrl<H> {
    async fn signed_url(&self, entry: &Entry, expiry: Duration) -> Result<Option<SignedUrl>> {
        if !entry.is_file() {
            return Ok(None);
        }
        let region = self.regions.resolve(entry).await?;
        match self.secret(&region).await {
            Some(secret) => TempUrlSigner::create(&region, &secret, entry, expiry).map(Some),
            None => {
                debug!(region = %region, "No temporary URL key for region");
                Ok(None)
            }
        }
    }
}
