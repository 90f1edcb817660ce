use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{SwiftHandle, container_and_key};
use crate::entry::{Entry, EntryPath};
use crate::error::{Degradation, Result};
use crate::features::SegmentFeature;
use crate::mapping::{map, map_for};
use crate::protocol::LISTING_CHUNK_SIZE;
use crate::region::{Region, RegionResolver};
use crate::session::Session;

/// Segments of Swift large objects
///
/// A dynamic large object names its segment prefix in the manifest header;
/// otherwise segments are expected under `{manifest key}/` in the same
/// container, named by their numeric index.
pub struct SwiftSegments<H> {
    session: Session<H>,
    regions: RegionResolver,
}

impl<H: SwiftHandle + 'static> SwiftSegments<H> {
    pub fn new(session: Session<H>, regions: RegionResolver) -> Self {
        Self { session, regions }
    }

    /// Segments of `manifest` in `region`, ordered by index
    pub async fn list(&self, region: &Region, manifest: &Entry) -> Result<Vec<Entry>> {
        let (container, key) = container_and_key(manifest)?;
        let metadata = self
            .session
            .lock()
            .await
            .head_object(region, container, &key)
            .await
            .map_err(|e| map_for("Cannot read segments of", &e, manifest))?;
        if !metadata.is_manifest() {
            return Ok(Vec::new());
        }

        let (segment_container, prefix) = match metadata.manifest.as_deref() {
            Some(header) => parse_manifest_header(header, container),
            None => (container.to_string(), format!("{key}/")),
        };

        let mut keys: Vec<(String, u64)> = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let page = self
                .session
                .lock()
                .await
                .list_objects(
                    region,
                    &segment_container,
                    &prefix,
                    None,
                    marker.as_deref(),
                    LISTING_CHUNK_SIZE,
                )
                .await
                .map_err(|e| map_for("Cannot read segments of", &e, manifest))?;
            keys.extend(
                page.records
                    .into_iter()
                    .filter(|r| !r.prefix)
                    .filter(|r| !(segment_container == container && r.key == key))
                    .map(|r| (r.key, r.size)),
            );
            match page.next {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        keys.sort_by(|(a, _), (b, _)| {
            segment_index(a)
                .cmp(&segment_index(b))
                .then_with(|| a.cmp(b))
        });
        debug!(manifest = %manifest.path(), segments = keys.len(), "Found segments");

        Ok(keys
            .into_iter()
            .map(|(key, size)| {
                let mut segment =
                    Entry::file(EntryPath::from_segments([segment_container.as_str()]).child(&key));
                segment.set_size(size);
                segment.set_region(region.name.clone());
                segment
            })
            .collect())
    }

    /// Bulk delete segments, tolerating segments that are already gone
    ///
    /// Every other failure is returned as a degradation of `manifest`'s
    /// deletion.
    pub async fn delete(
        &self,
        region: &Region,
        manifest: &Entry,
        segments: &[Entry],
    ) -> Vec<Degradation> {
        let mut by_container: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for segment in segments {
            if let Some(container) = segment.container_name() {
                by_container
                    .entry(container)
                    .or_default()
                    .push(segment.key());
            }
        }

        let mut degradations = Vec::new();
        for (container, keys) in by_container {
            let result = self
                .session
                .lock()
                .await
                .bulk_delete(region, container, &keys)
                .await;
            match result {
                Ok(failures) => {
                    for (key, err) in failures {
                        let path = EntryPath::from_segments([container]).child(&key).to_string();
                        if err.is_not_found() {
                            debug!(segment = %path, "Segment already deleted");
                            continue;
                        }
                        warn!(segment = %path, error = %err, "Failed to delete segment");
                        degradations.push(Degradation::new(path, "segment", map(&err)));
                    }
                }
                Err(err) if err.is_not_found() => {
                    debug!(container, "Segments already deleted");
                }
                Err(err) => {
                    warn!(manifest = %manifest.path(), error = %err, "Failed to delete segments");
                    degradations.push(Degradation::new(
                        manifest.path().to_string(),
                        "segment",
                        map_for("Cannot delete segments of", &err, manifest),
                    ));
                }
            }
        }
        degradations
    }
}

#[async_trait]
impl<H: SwiftHandle + 'static> SegmentFeature for SwiftSegments<H> {
    async fn segments(&self, manifest: &Entry) -> Result<Vec<Entry>> {
        let region = self.regions.resolve(manifest).await?;
        self.list(&region, manifest).await
    }
}

/// Split an `X-Object-Manifest` value into container and prefix
fn parse_manifest_header(header: &str, default_container: &str) -> (String, String) {
    let decoded = urlencoding::decode(header)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| header.to_string());
    match decoded.trim_start_matches('/').split_once('/') {
        Some((container, prefix)) => (container.to_string(), prefix.to_string()),
        None => (default_container.to_string(), decoded),
    }
}

/// Numeric index suffix of a segment key
fn segment_index(key: &str) -> u64 {
    key.rsplit('/')
        .next()
        .and_then(|index| index.parse().ok())
        .unwrap_or(u64::MAX)
}
