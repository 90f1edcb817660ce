//! upload-plan command - Dry run of the upload filter pipeline
//!
//! Runs acceptance and preparation for every local file and prints the
//! resulting transfer units. No bytes are sent.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, ValueEnum};
use rft_core::{
    Entry, EntryType, LocalFile, SymlinkMode, SymlinkPolicy, TransferUnit, UploadFilter,
    WithinRoot,
};
use serde::Serialize;

use super::{Context, fail, parse_remote};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Handling of local symbolic links
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SymlinkArg {
    /// Upload the link target contents
    Follow,
    /// Upload links as links
    Preserve,
    /// Leave links out
    Skip,
    /// Keep links inside the uploaded tree, follow the others
    Within,
}

/// Show how local files would be uploaded
#[derive(Args, Debug)]
pub struct UploadPlanArgs {
    /// Local file or directory
    pub local: PathBuf,

    /// Remote target directory (host:/path/)
    pub target: String,

    /// Upload under provisional names regardless of the configuration
    #[arg(long)]
    pub temporary: bool,

    /// Symbolic link handling
    #[arg(long, value_enum, default_value = "within")]
    pub symlinks: SymlinkArg,
}

#[derive(Debug, Serialize)]
struct UnitOutput {
    local: String,
    remote: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    provisional: Option<String>,
    length: u64,
    exists: bool,
}

impl From<&TransferUnit> for UnitOutput {
    fn from(unit: &TransferUnit) -> Self {
        Self {
            local: unit.local.path().display().to_string(),
            remote: unit.entry.path().to_string(),
            provisional: unit.renamed.as_ref().map(|r| r.path().to_string()),
            length: unit.length,
            exists: unit.exists,
        }
    }
}

fn symlink_policy(arg: SymlinkArg, root: &Path) -> Arc<dyn SymlinkPolicy> {
    match arg {
        SymlinkArg::Follow => Arc::new(SymlinkMode::Follow),
        SymlinkArg::Preserve => Arc::new(SymlinkMode::Preserve),
        SymlinkArg::Skip => Arc::new(SymlinkMode::Skip),
        SymlinkArg::Within => Arc::new(WithinRoot::new(root)),
    }
}

/// Pair every local entry below `local` with its remote entry under `target`
///
/// Directories precede their contents.
async fn collect(local: &Path, target: &Entry) -> std::io::Result<Vec<(Entry, LocalFile)>> {
    let mut items = Vec::new();
    let mut pending = vec![(local.to_path_buf(), target.clone())];
    while let Some((path, parent)) = pending.pop() {
        let metadata = tokio::fs::symlink_metadata(&path).await?;
        let name = LocalFile::new(&path).name();
        if metadata.is_dir() {
            let remote = parent.child(&name, EntryType::Directory);
            let mut children = Vec::new();
            let mut dir = tokio::fs::read_dir(&path).await?;
            while let Some(child) = dir.next_entry().await? {
                children.push(child.path());
            }
            children.sort();
            pending.extend(children.into_iter().rev().map(|c| (c, remote.clone())));
            items.push((remote, LocalFile::new(path)));
        } else {
            items.push((parent.child(&name, EntryType::File), LocalFile::new(path)));
        }
    }
    Ok(items)
}

fn print_units(formatter: &Formatter, units: &[TransferUnit]) {
    for unit in units {
        let size = humansize::format_size(unit.length, humansize::BINARY);
        let action = if unit.exists { "overwrite" } else { "create" };
        let mut line = format!(
            "{} {} -> {} ({})",
            formatter.style_key(&format!("{action:<9}")),
            unit.local,
            formatter.style_entry(&unit.entry),
            formatter.style_size(&size)
        );
        if let Some(renamed) = &unit.renamed {
            line.push_str(&format!(" via {}", renamed.name()));
        }
        formatter.println(&line);
    }
}

/// Execute the upload-plan command
pub async fn execute(args: UploadPlanArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();

    let target = match parse_remote(&args.target, &formatter) {
        Ok(t) => t.as_directory(),
        Err(code) => return code,
    };
    let config = match ctx.load_config() {
        Ok(c) => c,
        Err(e) => return fail(&formatter, &e),
    };
    let mut options = config.upload.clone();
    options.temporary |= args.temporary;
    if let Err(e) = options.validate() {
        return fail(&formatter, &e);
    }

    let items = match collect(&args.local, &target.entry()).await {
        Ok(items) => items,
        Err(e) => {
            formatter.error(&format!("Cannot read {}: {e}", args.local.display()));
            return ExitCode::NotFound;
        }
    };

    let connection = match ctx.open(&target.host, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };
    let capabilities = &connection.capabilities;
    let parent_exists = match capabilities.find.find(&target.entry()).await {
        Ok(exists) => exists,
        Err(e) => return fail(&formatter, &e),
    };

    let root = args.local.parent().unwrap_or(&args.local).to_path_buf();
    let filter = UploadFilter::from_capabilities(
        capabilities,
        options,
        symlink_policy(args.symlinks, &root),
    );
    let units = match filter.plan(items, parent_exists, &ctx.cancel).await {
        Ok(units) => units,
        Err(e) => return fail(&formatter, &e),
    };

    if formatter.is_json() {
        let output: Vec<UnitOutput> = units.iter().map(UnitOutput::from).collect();
        formatter.json(&output);
    } else {
        print_units(&formatter, &units);
    }
    ExitCode::Success
}
