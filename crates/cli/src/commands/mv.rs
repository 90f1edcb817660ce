//! mv command - Rename a remote entry

use clap::Args;
use rft_core::Error;

use super::cp::{TransferOutput, target_entry};
use super::{Context, fail, parse_remote};
use crate::connect::same_host;
use crate::exit_code::ExitCode;
use crate::output::SpinnerListener;

/// Move or rename a remote entry
#[derive(Args, Debug)]
pub struct MvArgs {
    /// Source path (host:/path)
    pub source: String,

    /// Target path (host:/path); a trailing '/' moves into the directory
    pub target: String,

    /// Replace an existing target
    #[arg(short, long)]
    pub force: bool,
}

/// Execute the mv command
pub async fn execute(args: MvArgs, ctx: &Context) -> ExitCode {
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
    let capabilities = &connection.capabilities;

    let from = source.entry();
    let to = target_entry(&from, &target);
    if !args.force {
        match capabilities.find.find(&to).await {
            Ok(true) => {
                let e = Error::Conflict(format!("{} exists, use --force to replace it", to.path()));
                return fail(&formatter, &e);
            }
            Ok(false) => {}
            Err(e) => return fail(&formatter, &e),
        }
    }

    let listener = SpinnerListener::new(&formatter);
    let result = capabilities
        .rename
        .rename(&from, &to, args.force, &listener)
        .await;
    listener.finish();
    if let Err(e) = result {
        return fail(&formatter, &e);
    }

    let output = TransferOutput {
        source: source.to_string(),
        target: format!("{}:{}", connection.name, to.path()),
    };
    if formatter.is_json() {
        formatter.json(&output);
    } else {
        formatter.success(&format!("Moved {} to {}", output.source, output.target));
    }
    ExitCode::Success
}
