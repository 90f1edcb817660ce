//! cp command - Server side copy within one host

use clap::Args;
use rft_core::Entry;
use serde::Serialize;

use super::{Context, fail, parse_remote};
use crate::connect::same_host;
use crate::exit_code::ExitCode;
use crate::remote::RemoteArg;

/// Copy a remote entry without downloading it
#[derive(Args, Debug)]
pub struct CpArgs {
    /// Source path (host:/path)
    pub source: String,

    /// Target path (host:/path); a trailing '/' copies into the directory
    pub target: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TransferOutput {
    pub source: String,
    pub target: String,
}

/// Target entry of a copy or move
///
/// A directory target receives the source under its own name.
pub(crate) fn target_entry(source: &Entry, target: &RemoteArg) -> Entry {
    if target.directory {
        Entry::new(target.path.child(source.name()), source.kind())
    } else {
        Entry::new(target.path.clone(), source.kind())
    }
}

/// Execute the cp command
pub async fn execute(args: CpArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();

    let (source, target) = match (
        parse_remote(&args.source, &formatter),
        parse_remote(&args.target, &formatter),
    ) {
        (Ok(s), Ok(t)) => (s, t),
        (Err(code), _) | (_, Err(code)) => return code,
    };
    if let Err(e) = same_host(&source.host, &target.host) {
        return fail(&formatter, &e);
    }

    let connection = match ctx.open(&source.host, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };
    let copy = match connection.capabilities.copy() {
        Ok(copy) => copy,
        Err(e) => return fail(&formatter, &e),
    };

    let from = source.entry();
    let to = target_entry(&from, &target);
    if let Err(e) = copy.copy(&from, &to).await {
        return fail(&formatter, &e);
    }

    let output = TransferOutput {
        source: source.to_string(),
        target: format!("{}:{}", connection.name, to.path()),
    };
    if formatter.is_json() {
        formatter.json(&output);
    } else {
        formatter.success(&format!("Copied {} to {}", output.source, output.target));
    }
    ExitCode::Success
}
