//! Per-file state of the upload pipeline

use crate::entry::Entry;
use crate::transfer::local::LocalFile;

/// One local file or directory moving through accept, prepare, transfer
/// and complete
#[derive(Debug, Clone, PartialEq)]
pub struct TransferUnit {
    /// Final remote entry
    pub entry: Entry,
    pub local: LocalFile,
    /// Provisional remote entry the bytes are written to, when staging
    pub renamed: Option<Entry>,
    /// Number of bytes the transfer phase will send
    pub length: u64,
    /// The final entry already exists remotely
    pub exists: bool,
    /// Set by the transfer phase once the bytes are written
    pub complete: bool,
    /// Set once post-transfer reconciliation ran
    pub finalized: bool,
}

impl TransferUnit {
    pub fn new(entry: Entry, local: LocalFile) -> Self {
        Self {
            entry,
            local,
            renamed: None,
            length: 0,
            exists: false,
            complete: false,
            finalized: false,
        }
    }

    /// Remote entry the transfer phase writes to
    pub fn target(&self) -> &Entry {
        self.renamed.as_ref().unwrap_or(&self.entry)
    }

    /// Called by the transfer phase after the last byte was written
    pub fn mark_complete(&mut self) {
        self.complete = true;
    }
}
