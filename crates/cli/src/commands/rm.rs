//! rm command - Delete remote entries
//!
//! Directories are expanded through the listing capability when the
//! protocol has one; otherwise the server removes the contents.

use clap::Args;
use rft_core::{
    Completion, DisabledLoginCallback, Entry, ListFeature, ProgressListener, Result,
};
use serde::Serialize;

use super::{Context, fail, parse_remote};
use crate::connect::same_host;
use crate::exit_code::ExitCode;
use crate::output::SpinnerListener;

/// Delete remote files and directories
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Remote paths (host:/path), directories end with '/'
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Delete directories with their contents
    #[arg(short, long)]
    pub recursive: bool,

    /// Ignore entries that do not exist
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    deleted: Vec<String>,
    degraded: usize,
}

/// Entries under `directory` in deletion order, children before parents
async fn expand(
    list: &dyn ListFeature,
    directory: Entry,
    listener: &dyn ProgressListener,
) -> Result<Vec<Entry>> {
    let mut files = Vec::new();
    let mut directories = Vec::new();
    let mut pending = vec![directory];
    while let Some(current) = pending.pop() {
        for child in list.list(&current, listener).await? {
            if child.is_directory() {
                pending.push(child);
            } else {
                files.push(child);
            }
        }
        directories.push(current);
    }
    directories.reverse();
    files.extend(directories);
    Ok(files)
}

/// Execute the rm command
pub async fn execute(args: RmArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();

    let mut remotes = Vec::with_capacity(args.paths.len());
    for path in &args.paths {
        match parse_remote(path, &formatter) {
            Ok(remote) => remotes.push(remote),
            Err(code) => return code,
        }
    }
    let host = remotes[0].host.clone();
    for remote in &remotes {
        if let Err(e) = same_host(&host, &remote.host) {
            return fail(&formatter, &e);
        }
        if remote.directory && !args.recursive {
            formatter.error(&format!("{remote} is a directory, use --recursive"));
            return ExitCode::UsageError;
        }
    }

    let connection = match ctx.open(&host, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };
    let capabilities = &connection.capabilities;
    let listener = SpinnerListener::new(&formatter);

    let mut deleted = Vec::new();
    let mut completion = Completion::Full;
    for remote in &remotes {
        let entry = remote.entry();
        let entries = match capabilities.list() {
            Ok(list) if remote.directory => {
                match expand(&**list, entry, &listener).await {
                    Ok(entries) => entries,
                    Err(e) if args.force && e.is_not_found() => continue,
                    Err(e) => return fail(&formatter, &e),
                }
            }
            _ => vec![entry],
        };

        match capabilities
            .delete
            .delete(&entries, &DisabledLoginCallback, &listener, &ctx.cancel)
            .await
        {
            Ok(result) => {
                completion = completion.merge(result);
                deleted.push(remote.to_string());
            }
            Err(e) if args.force && e.is_not_found() => {}
            Err(e) => return fail(&formatter, &e),
        }
    }
    listener.finish();

    formatter.degradations(&completion);
    if formatter.is_json() {
        formatter.json(&RmOutput {
            degraded: completion.degradations().len(),
            deleted,
        });
    } else {
        for path in &deleted {
            formatter.success(&format!("Removed {path}"));
        }
    }

    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use rft_core::{AttributedList, DisabledProgressListener, EntryPath, Error};

    use super::*;

    struct TreeList {
        children: HashMap<String, Vec<Entry>>,
    }

    #[async_trait]
    impl ListFeature for TreeList {
        async fn list(
            &self,
            directory: &Entry,
            _listener: &dyn ProgressListener,
        ) -> Result<AttributedList> {
            self.children
                .get(&directory.path().to_string())
                .map(|children| children.iter().cloned().collect())
                .ok_or_else(|| Error::NotFound(directory.path().to_string()))
        }
    }

    fn file(path: &str) -> Entry {
        Entry::file(EntryPath::parse(path))
    }

    fn dir(path: &str) -> Entry {
        Entry::directory(EntryPath::parse(path))
    }

    #[tokio::test]
    async fn test_expand_children_before_parents() {
        let list = TreeList {
            children: HashMap::from([
                ("/c/d".to_string(), vec![file("/c/d/a"), dir("/c/d/sub")]),
                ("/c/d/sub".to_string(), vec![file("/c/d/sub/b")]),
            ]),
        };
        let entries = expand(&list, dir("/c/d"), &DisabledProgressListener)
            .await
            .unwrap();
        let paths: Vec<String> = entries.iter().map(|e| e.path().to_string()).collect();
        assert_eq!(paths, vec!["/c/d/a", "/c/d/sub/b", "/c/d/sub", "/c/d"]);
    }

    #[tokio::test]
    async fn test_expand_missing_directory() {
        let list = TreeList {
            children: HashMap::new(),
        };
        let err = expand(&list, dir("/c/none"), &DisabledProgressListener)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
