//! rft - Remote file operations across FTP, SFTP, S3, Swift and WebDAV
//!
//! Every command resolves a named host from the configuration, builds the
//! capability set of its protocol and drives one operation through it.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use rft_core::{CancelCallback, CancelFlag};
use tracing_subscriber::EnvFilter;

mod commands;
mod connect;
mod exit_code;
mod output;
mod remote;

use commands::{Commands, Context};
use exit_code::ExitCode;
use output::OutputConfig;

#[derive(Parser, Debug)]
#[command(name = "rft", version, about, propagate_version = true)]
struct Cli {
    /// Output JSON instead of human readable text
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Suppress everything but errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file
    #[arg(long, global = true, env = "RFT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Log filter for the verbosity flag; RUST_LOG takes precedence
fn log_filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_logging(verbose: u8) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install log subscriber: {e}"))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("{e}");
    }

    let ctx = Context {
        output: OutputConfig {
            json: cli.json,
            no_color: cli.no_color,
            quiet: cli.quiet,
        },
        config_path: cli.config,
        cancel: CancelFlag::default(),
    };

    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, stopping after the current step");
            cancel.cancel();
        }
    });

    let mut code = commands::execute(cli.command, &ctx).await;
    if ctx.cancel.is_canceled() && code != ExitCode::Success {
        code = ExitCode::Interrupted;
    }
    std::process::exit(code.as_i32());
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["rft", "ls", "aws:/bucket/", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Ls(_)));
    }

    #[test]
    fn test_upload_plan_name() {
        let cli = Cli::try_parse_from([
            "rft",
            "upload-plan",
            "./site",
            "aws:/bucket/www/",
            "--symlinks",
            "skip",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::UploadPlan(_)));
    }

    #[test]
    fn test_missing_subcommand() {
        assert!(Cli::try_parse_from(["rft"]).is_err());
    }
}
