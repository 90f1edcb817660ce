//! Upload filter pipeline
//!
//! Every unit moves strictly through [`UploadFilter::accept`],
//! [`UploadFilter::prepare`], the external byte transfer and
//! [`UploadFilter::complete`]. Completion renames a provisionally named
//! upload to its final name and then restores metadata best-effort.

use std::sync::Arc;

use futures::stream::{self, TryStreamExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::callback::{CancelCallback, ProgressListener};
use crate::config::UploadOptions;
use crate::entry::{Acl, Entry, Permission};
use crate::error::{Completion, Degradation, Error, Result};
use crate::features::{
    AclFeature, AttributesFeature, Capabilities, FindFeature, MoveFeature, TimestampFeature,
    Timestamps, UnixPermissionFeature,
};
use crate::transfer::local::{LocalFile, LocalKind};
use crate::transfer::symlink::SymlinkPolicy;
use crate::transfer::unit::TransferUnit;

/// Upload pipeline bound to the capabilities of one session
#[derive(Clone)]
pub struct UploadFilter {
    options: UploadOptions,
    symlinks: Arc<dyn SymlinkPolicy>,
    find: Arc<dyn FindFeature>,
    attributes: Arc<dyn AttributesFeature>,
    rename: Arc<dyn MoveFeature>,
    unix_permission: Option<Arc<dyn UnixPermissionFeature>>,
    acl: Option<Arc<dyn AclFeature>>,
    timestamp: Option<Arc<dyn TimestampFeature>>,
}

impl UploadFilter {
    pub fn new(
        options: UploadOptions,
        symlinks: Arc<dyn SymlinkPolicy>,
        find: Arc<dyn FindFeature>,
        attributes: Arc<dyn AttributesFeature>,
        rename: Arc<dyn MoveFeature>,
    ) -> Self {
        Self {
            options,
            symlinks,
            find,
            attributes,
            rename,
            unix_permission: None,
            acl: None,
            timestamp: None,
        }
    }

    /// Pipeline using every capability the session offers
    pub fn from_capabilities(
        capabilities: &Capabilities,
        options: UploadOptions,
        symlinks: Arc<dyn SymlinkPolicy>,
    ) -> Self {
        let mut filter = Self::new(
            options,
            symlinks,
            Arc::clone(&capabilities.find),
            Arc::clone(&capabilities.attributes),
            Arc::clone(&capabilities.rename),
        );
        filter.unix_permission = capabilities.unix_permission.clone();
        filter.acl = capabilities.acl.clone();
        filter.timestamp = capabilities.timestamp.clone();
        filter
    }

    pub fn with_unix_permission(mut self, feature: Arc<dyn UnixPermissionFeature>) -> Self {
        self.unix_permission = Some(feature);
        self
    }

    pub fn with_acl(mut self, feature: Arc<dyn AclFeature>) -> Self {
        self.acl = Some(feature);
        self
    }

    pub fn with_timestamp(mut self, feature: Arc<dyn TimestampFeature>) -> Self {
        self.timestamp = Some(feature);
        self
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Decide whether `local` takes part in the upload
    ///
    /// Fails with `NotFound` when the local file is gone. A link that is not
    /// dereferenced is only uploaded when the symlink policy includes it.
    pub async fn accept(&self, entry: &Entry, local: &LocalFile) -> Result<bool> {
        let attributes = local.attributes().await?;
        if entry.is_file() && attributes.kind == LocalKind::Symlink {
            let target = local.link_target().await?;
            if !self.symlinks.dereference(local, &target) {
                return Ok(self.symlinks.include(local, &target));
            }
        }
        Ok(true)
    }

    /// Build the transfer unit of an accepted file
    ///
    /// `parent_exists` tells whether the remote parent directory exists, in
    /// which case the target is probed and its attributes refreshed.
    pub async fn prepare(
        &self,
        entry: Entry,
        local: LocalFile,
        parent_exists: bool,
    ) -> Result<TransferUnit> {
        let mut unit = TransferUnit::new(entry, local);
        if unit.entry.is_file() {
            let attributes = unit.local.attributes().await?;
            unit.length = if attributes.kind == LocalKind::Symlink {
                let target = unit.local.link_target().await?;
                if self.symlinks.dereference(&unit.local, &target) {
                    unit.local.target_attributes().await?.size
                } else {
                    0
                }
            } else {
                attributes.size
            };
            if self.options.temporary {
                let name = self.provisional_name(unit.entry.name());
                debug!(entry = %unit.entry.path(), provisional = %name, "Upload under provisional name");
                unit.renamed = Some(unit.entry.renamed(&name));
            }
        }
        if parent_exists && self.find.find(&unit.entry).await? {
            unit.exists = true;
            let attributes = self.attributes.attributes(&unit.entry).await?;
            unit.entry.set_attributes(attributes);
        }
        Ok(unit)
    }

    fn provisional_name(&self, name: &str) -> String {
        self.options
            .temporary_format
            .replace("{name}", name)
            .replace("{uuid}", &Uuid::new_v4().to_string())
    }

    /// Accept and prepare many units with bounded concurrency
    ///
    /// Units the filter does not accept are left out. Cancellation is checked
    /// before each unit is started. The first error aborts the batch: units in
    /// flight are dropped and no further unit is started.
    pub async fn plan(
        &self,
        items: Vec<(Entry, LocalFile)>,
        parent_exists: bool,
        cancel: &dyn CancelCallback,
    ) -> Result<Vec<TransferUnit>> {
        let parallel = self.options.parallel.max(1);
        let planned: Vec<Option<TransferUnit>> =
            stream::iter(items.into_iter().map(Ok::<_, Error>))
                .map_ok(|(entry, local)| self.plan_unit(entry, local, parent_exists, cancel))
                .try_buffer_unordered(parallel)
                .try_collect()
                .await?;
        Ok(planned.into_iter().flatten().collect())
    }

    async fn plan_unit(
        &self,
        entry: Entry,
        local: LocalFile,
        parent_exists: bool,
        cancel: &dyn CancelCallback,
    ) -> Result<Option<TransferUnit>> {
        cancel.verify()?;
        if !self.accept(&entry, &local).await? {
            debug!(local = %local, "Skip local file");
            return Ok(None);
        }
        self.prepare(entry, local, parent_exists).await.map(Some)
    }

    /// Post-transfer reconciliation
    ///
    /// Runs once per unit and only after the transfer phase marked it
    /// complete; later calls are no-ops. A provisional upload is renamed to
    /// its final name first, and a failed rename fails the unit before any
    /// metadata is touched. Permission, ACL and timestamp are then restored
    /// on the final entry; their failures are returned as degradations.
    pub async fn complete(
        &self,
        unit: &mut TransferUnit,
        listener: &dyn ProgressListener,
    ) -> Result<Completion> {
        if !unit.complete || unit.finalized {
            debug!(entry = %unit.entry.path(), complete = unit.complete, "Skip completion");
            return Ok(Completion::Full);
        }

        if let Some(renamed) = &unit.renamed {
            listener.message(&format!("Renaming {} to {}", renamed.name(), unit.entry.name()));
            self.rename
                .rename(renamed, &unit.entry, unit.exists, listener)
                .await
                .map_err(|e| e.for_entry("Cannot rename", renamed.path().to_string()))?;
            unit.renamed = None;
        }

        let target = unit.entry.clone();
        let mut degradations = Vec::new();

        if self.options.permissions || self.options.acl {
            match self.permission(unit).await {
                Ok(permission) => {
                    if self.options.permissions {
                        self.restore_permission(&target, &permission, listener, &mut degradations)
                            .await;
                    }
                    if self.options.acl {
                        self.restore_acl(&target, &permission, listener, &mut degradations)
                            .await;
                    }
                }
                Err(e) => {
                    warn!(entry = %target.path(), error = %e, "Cannot determine permission");
                    degradations.push(Degradation::new(target.path().to_string(), "permission", e));
                }
            }
        }

        if self.options.timestamp
            && let Some(feature) = &self.timestamp
        {
            match unit.local.target_attributes().await {
                Ok(local) => {
                    if let Some(modified) = local.modified {
                        listener.message(&format!(
                            "Changing timestamp of {} to {}",
                            target.name(),
                            modified.strftime("%Y-%m-%d %H:%M")
                        ));
                    }
                    let times = Timestamps {
                        created: local.created,
                        modified: local.modified,
                        accessed: local.accessed,
                    };
                    if let Err(e) = feature.set_timestamp(&target, &times).await {
                        warn!(entry = %target.path(), error = %e, "Failed to restore timestamp");
                        degradations.push(Degradation::new(target.path().to_string(), "timestamp", e));
                    }
                }
                Err(e) => {
                    warn!(local = %unit.local, error = %e, "Cannot read local timestamps");
                    degradations.push(Degradation::new(target.path().to_string(), "timestamp", e));
                }
            }
        }

        unit.finalized = true;
        Ok(Completion::from_degradations(degradations))
    }

    async fn permission(&self, unit: &TransferUnit) -> Result<Permission> {
        if self.options.use_default_permissions {
            return if unit.entry.is_file() {
                self.options.default_file_permission()
            } else {
                self.options.default_directory_permission()
            };
        }
        let local = unit.local.target_attributes().await?;
        Ok(local.mode.map(Permission::from_mode).unwrap_or(Permission::EMPTY))
    }

    async fn restore_permission(
        &self,
        target: &Entry,
        permission: &Permission,
        listener: &dyn ProgressListener,
        degradations: &mut Vec<Degradation>,
    ) {
        let Some(feature) = &self.unix_permission else {
            return;
        };
        if permission.is_empty() {
            return;
        }
        listener.message(&format!(
            "Changing permission of {} to {}",
            target.name(),
            permission.octal()
        ));
        if let Err(e) = feature.set_permission(target, permission).await {
            warn!(entry = %target.path(), error = %e, "Failed to restore permission");
            degradations.push(Degradation::new(target.path().to_string(), "permission", e));
        }
    }

    async fn restore_acl(
        &self,
        target: &Entry,
        permission: &Permission,
        listener: &dyn ProgressListener,
        degradations: &mut Vec<Degradation>,
    ) {
        let Some(feature) = &self.acl else {
            return;
        };
        let acl = Acl::from_permission(permission);
        if acl.is_empty() {
            return;
        }
        listener.message(&format!(
            "Changing permission of {} to {}",
            target.name(),
            permission.octal()
        ));
        if let Err(e) = feature.set_acl(target, &acl).await {
            warn!(entry = %target.path(), error = %e, "Failed to restore ACL");
            degradations.push(Degradation::new(target.path().to_string(), "acl", e));
        }
    }
}
