//! Container to region resolution
//!
//! Object stores place every container in exactly one region. The mapping is
//! looked up lazily through a [`RegionLookup`] and memoized in a shared
//! [`RegionCache`], which is invalidated when a container is deleted.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use crate::entry::Entry;
use crate::error::{Error, Result};

/// Storage region of an object store account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Region identifier, e.g. `DFW` or `eu-west-1`
    pub name: String,
    /// Base storage endpoint of the region, when the protocol has one per region
    pub storage_url: Option<Url>,
    pub cdn_url: Option<Url>,
    /// Region the account authenticated against
    pub default: bool,
}

impl Region {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage_url: None,
            cdn_url: None,
            default: false,
        }
    }

    pub fn with_storage_url(mut self, url: Url) -> Self {
        self.storage_url = Some(url);
        self
    }

    pub fn with_default(mut self, default: bool) -> Self {
        self.default = default;
        self
    }

    /// Storage endpoint, failing for regions without one
    pub fn storage_url(&self) -> Result<&Url> {
        self.storage_url
            .as_ref()
            .ok_or_else(|| Error::Config(format!("Region {} has no storage endpoint", self.name)))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Cache key: one container of one account
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerKey {
    pub account: String,
    pub container: String,
}

impl ContainerKey {
    pub fn new(account: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            container: container.into(),
        }
    }
}

/// Read-mostly container to region cache
#[derive(Debug, Default)]
pub struct RegionCache {
    regions: RwLock<HashMap<ContainerKey, Region>>,
}

impl RegionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process wide cache shared by every session
    pub fn global() -> Arc<RegionCache> {
        static GLOBAL: OnceLock<Arc<RegionCache>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(RegionCache::new())))
    }

    pub async fn get(&self, key: &ContainerKey) -> Option<Region> {
        self.regions.read().await.get(key).cloned()
    }

    pub async fn insert(&self, key: ContainerKey, region: Region) {
        self.regions.write().await.insert(key, region);
    }

    /// Forget the region of a container; returns the evicted mapping
    pub async fn invalidate(&self, key: &ContainerKey) -> Option<Region> {
        self.regions.write().await.remove(key)
    }

    pub async fn len(&self) -> usize {
        self.regions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.regions.read().await.is_empty()
    }
}

/// Backend side of region resolution
#[async_trait]
pub trait RegionLookup: Send + Sync {
    /// Regions available to the account
    async fn catalog(&self) -> Result<Vec<Region>>;

    /// Ask the backend which region holds `container`
    async fn locate(&self, container: &Entry) -> Result<Region>;
}

/// Resolves the region of an entry's container, caching lookups
#[derive(Clone)]
pub struct RegionResolver {
    account: String,
    cache: Arc<RegionCache>,
    lookup: Arc<dyn RegionLookup>,
}

impl RegionResolver {
    pub fn new(
        account: impl Into<String>,
        cache: Arc<RegionCache>,
        lookup: Arc<dyn RegionLookup>,
    ) -> Self {
        Self {
            account: account.into(),
            cache,
            lookup,
        }
    }

    pub fn cache(&self) -> &Arc<RegionCache> {
        &self.cache
    }

    fn key(&self, container: &Entry) -> ContainerKey {
        ContainerKey::new(&self.account, container.name())
    }

    /// Region of the container holding `entry`
    ///
    /// A region hint on the entry wins when it names a known region. Otherwise
    /// the cache is consulted and a miss is resolved by the backend and stored.
    pub async fn resolve(&self, entry: &Entry) -> Result<Region> {
        let container = entry.container().ok_or_else(|| {
            Error::Unsupported(format!("{} is not inside a container", entry.path()))
        })?;

        if let Some(hint) = &container.attributes().region {
            let catalog = self.lookup.catalog().await?;
            if let Some(region) = catalog.into_iter().find(|r| &r.name == hint) {
                return Ok(region);
            }
            debug!(container = %container.path(), region = %hint, "Unknown region hint");
        }

        let key = self.key(&container);
        if let Some(region) = self.cache.get(&key).await {
            return Ok(region);
        }

        let region = self.lookup.locate(&container).await?;
        debug!(container = %container.path(), region = %region, "Resolved container region");
        self.cache.insert(key, region.clone()).await;
        Ok(region)
    }

    /// Drop the cached region of the container holding `entry`
    pub async fn invalidate(&self, entry: &Entry) {
        if let Some(container) = entry.container() {
            self.cache.invalidate(&self.key(&container)).await;
        }
    }
}

impl fmt::Debug for RegionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionResolver")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}
