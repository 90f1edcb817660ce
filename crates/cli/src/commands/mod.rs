//! Command implementations
//!
//! Each command parses its arguments, connects to the named host and drives
//! one capability of the session.

mod cp;
mod ls;
mod mv;
mod rm;
mod share;
mod stat;
mod upload_plan;

use std::path::PathBuf;

use clap::Subcommand;
use rft_core::{CancelFlag, Config, ConfigManager, Error};

use crate::connect::{Connection, connect};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};
use crate::remote::RemoteArg;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Delete remote files and directories
    Rm(rm::RmArgs),

    /// Copy a remote entry server side
    Cp(cp::CpArgs),

    /// Move or rename a remote entry
    Mv(mv::MvArgs),

    /// Show the attributes of a remote entry
    Stat(stat::StatArgs),

    /// Create a time-limited download URL
    Share(share::ShareArgs),

    /// List a remote directory
    Ls(ls::LsArgs),

    /// Show how local files would be uploaded
    #[command(name = "upload-plan")]
    UploadPlan(upload_plan::UploadPlanArgs),
}

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    pub output: OutputConfig,
    /// Configuration file overriding the default location
    pub config_path: Option<PathBuf>,
    /// Set on Ctrl-C
    pub cancel: CancelFlag,
}

impl Context {
    pub fn formatter(&self) -> Formatter {
        Formatter::new(self.output)
    }

    pub fn load_config(&self) -> rft_core::Result<Config> {
        let manager = match &self.config_path {
            Some(path) => ConfigManager::with_path(path),
            None => ConfigManager::new()?,
        };
        manager.load()
    }

    /// Connect to `host`, reporting failures through `formatter`
    pub async fn open(&self, host: &str, formatter: &Formatter) -> Result<Connection, ExitCode> {
        let config = self.load_config().map_err(|e| fail(formatter, &e))?;
        let profile = config.host(host).map_err(|e| fail(formatter, &e))?;
        connect(host, profile).await.map_err(|e| fail(formatter, &e))
    }
}

/// Report a failed operation and pick its exit code
pub(crate) fn fail(formatter: &Formatter, error: &Error) -> ExitCode {
    formatter.error(&error.to_string());
    ExitCode::from_error(error)
}

pub(crate) fn parse_remote(arg: &str, formatter: &Formatter) -> Result<RemoteArg, ExitCode> {
    RemoteArg::parse(arg).map_err(|e| {
        formatter.error(&e);
        ExitCode::UsageError
    })
}

/// Execute a command
pub async fn execute(command: Commands, ctx: &Context) -> ExitCode {
    match command {
        Commands::Rm(args) => rm::execute(args, ctx).await,
        Commands::Cp(args) => cp::execute(args, ctx).await,
        Commands::Mv(args) => mv::execute(args, ctx).await,
        Commands::Stat(args) => stat::execute(args, ctx).await,
        Commands::Share(args) => share::execute(args, ctx).await,
        Commands::Ls(args) => ls::execute(args, ctx).await,
        Commands::UploadPlan(args) => upload_plan::execute(args, ctx).await,
    }
}
