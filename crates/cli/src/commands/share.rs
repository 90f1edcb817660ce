//! share command - Generate signed download URLs
//!
//! Creates time-limited URLs for sharing objects without authentication.

use std::time::Duration;

use clap::Args;
use jiff::Timestamp;
use rft_core::Error;
use serde::Serialize;

use super::{Context, fail, parse_remote};
use crate::exit_code::ExitCode;

/// Longest expiry accepted by S3 presigning (7 days)
const S3_MAX_EXPIRY_SECS: u64 = 604_800;

/// Generate a signed URL for a remote file
#[derive(Args, Debug)]
pub struct ShareArgs {
    /// Path to the file (host:/container/key)
    pub path: String,

    /// Expiration time (e.g., 30m, 1h, 1d, 7d). Default: 1d
    #[arg(short, long, default_value = "1d")]
    pub expire: String,
}

#[derive(Debug, Serialize)]
struct ShareOutput {
    url: String,
    path: String,
    expires: Timestamp,
    expires_in: String,
    expires_secs: u64,
}

/// Execute the share command
pub async fn execute(args: ShareArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();

    let remote = match parse_remote(&args.path, &formatter) {
        Ok(r) => r,
        Err(code) => return code,
    };
    if remote.directory {
        formatter.error("Only files can be shared");
        return ExitCode::UsageError;
    }

    let expires_secs = match parse_expiration(&args.expire) {
        Ok(secs) => secs,
        Err(e) => {
            formatter.error(&e);
            return ExitCode::UsageError;
        }
    };

    let connection = match ctx.open(&remote.host, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };
    let capabilities = &connection.capabilities;
    if capabilities.protocol == "s3" && expires_secs > S3_MAX_EXPIRY_SECS {
        formatter.error("Expiration cannot exceed 7 days (604800 seconds)");
        return ExitCode::UsageError;
    }
    let feature = match capabilities.url() {
        Ok(f) => f,
        Err(e) => return fail(&formatter, &e),
    };

    let entry = remote.entry();
    match capabilities.find.find(&entry).await {
        Ok(true) => {}
        Ok(false) => return fail(&formatter, &Error::NotFound(remote.to_string())),
        Err(e) => return fail(&formatter, &e),
    }

    let signed = match feature
        .signed_url(&entry, Duration::from_secs(expires_secs))
        .await
    {
        Ok(Some(signed)) => signed,
        Ok(None) => {
            formatter.error(&format!("No signing key is configured for {remote}"));
            return ExitCode::UnsupportedFeature;
        }
        Err(e) => return fail(&formatter, &e),
    };

    let expires_human = format_duration(expires_secs);
    if formatter.is_json() {
        formatter.json(&ShareOutput {
            url: signed.url.to_string(),
            path: args.path.clone(),
            expires: signed.expires,
            expires_in: expires_human,
            expires_secs,
        });
    } else {
        formatter.println("Share URL:");
        formatter.println(&formatter.style_url(signed.url.as_str()));
        formatter.println("");
        formatter.println(&format!(
            "Expires in: {expires_human} ({})",
            formatter.style_date(&signed.expires.strftime("%Y-%m-%d %H:%M UTC").to_string())
        ));
    }

    ExitCode::Success
}

/// Parse expiration string (e.g., "1h", "1d", "7d")
fn parse_expiration(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Expiration cannot be empty".to_string());
    }

    let (num_str, suffix) = if s.ends_with(|c: char| c.is_ascii_alphabetic()) {
        let idx = s.len() - 1;
        (&s[..idx], &s[idx..])
    } else {
        (s, "s")
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("Invalid expiration number: {num_str}"))?;

    let unit = match suffix.to_lowercase().as_str() {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        "w" => 604800,
        _ => return Err(format!("Unknown expiration suffix: {suffix}")),
    };

    match num.checked_mul(unit) {
        Some(0) => Err("Expiration must be positive".to_string()),
        Some(seconds) => Ok(seconds),
        None => Err(format!("Expiration too large: {s}")),
    }
}

/// Format duration in human-readable form
fn format_duration(secs: u64) -> String {
    if secs >= 86400 {
        let days = secs / 86400;
        let hours = (secs % 86400) / 3600;
        if hours > 0 {
            format!("{days}d {hours}h")
        } else {
            format!("{days} day(s)")
        }
    } else if secs >= 3600 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins > 0 {
            format!("{hours}h {mins}m")
        } else {
            format!("{hours} hour(s)")
        }
    } else if secs >= 60 {
        let mins = secs / 60;
        format!("{mins} minute(s)")
    } else {
        format!("{secs} second(s)")
    }
}
