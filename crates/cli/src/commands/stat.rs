//! stat command - Show the attributes of a remote entry

use clap::Args;
use jiff::Timestamp;
use rft_core::{Attributes, Entry, Error};
use serde::Serialize;

use super::{Context, fail, parse_remote};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Show the attributes of a remote entry
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Remote path (host:/path)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct StatOutput {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    permission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    segments: Option<usize>,
}

impl StatOutput {
    fn new(entry: &Entry, attributes: Attributes, segments: Option<usize>) -> Self {
        Self {
            path: entry.path().to_string(),
            kind: entry.kind().to_string(),
            size: attributes.size,
            modified: attributes.modified,
            region: attributes.region,
            etag: attributes.etag,
            content_type: attributes.content_type,
            storage_class: attributes.storage_class,
            permission: attributes.permission.map(|p| p.octal()),
            owner: attributes.owner,
            segments,
        }
    }

    /// Key and value pairs of the human readable output
    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![("Path", self.path.clone()), ("Type", self.kind.clone())];
        if let Some(size) = self.size {
            rows.push((
                "Size",
                format!("{} ({size} bytes)", humansize::format_size(size, humansize::BINARY)),
            ));
        }
        if let Some(modified) = self.modified {
            rows.push(("Modified", modified.strftime("%Y-%m-%d %H:%M:%S UTC").to_string()));
        }
        let optional = [
            ("Region", &self.region),
            ("ETag", &self.etag),
            ("Content-Type", &self.content_type),
            ("Storage-Class", &self.storage_class),
            ("Permission", &self.permission),
            ("Owner", &self.owner),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                rows.push((key, value.clone()));
            }
        }
        if let Some(segments) = self.segments {
            rows.push(("Segments", segments.to_string()));
        }
        rows
    }

    fn print(&self, formatter: &Formatter) {
        for (key, value) in self.rows() {
            let value = match key {
                "Size" => formatter.style_size(&value),
                "Modified" => formatter.style_date(&value),
                _ => value,
            };
            formatter.println(&format!("{:<14} {value}", formatter.style_key(&format!("{key}:"))));
        }
    }
}

/// Execute the stat command
pub async fn execute(args: StatArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();

    let remote = match parse_remote(&args.path, &formatter) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let connection = match ctx.open(&remote.host, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };
    let capabilities = &connection.capabilities;

    let mut entry = remote.entry();
    match capabilities.find.find(&entry).await {
        Ok(true) => {}
        Ok(false) => {
            // A path without a trailing slash may still name a directory
            let directory = remote.as_directory().entry();
            match capabilities.find.find(&directory).await {
                Ok(true) => entry = directory,
                Ok(false) => return fail(&formatter, &Error::NotFound(remote.to_string())),
                Err(e) => return fail(&formatter, &e),
            }
        }
        Err(e) => return fail(&formatter, &e),
    }

    let attributes = match capabilities.attributes.attributes(&entry).await {
        Ok(a) => a,
        Err(e) => return fail(&formatter, &e),
    };

    let segments = match &capabilities.segments {
        Some(feature) if entry.is_file() => match feature.segments(&entry).await {
            Ok(segments) if !segments.is_empty() => Some(segments.len()),
            Ok(_) => None,
            Err(e) => {
                formatter.warning(&format!("Cannot read segments: {e}"));
                None
            }
        },
        _ => None,
    };

    let output = StatOutput::new(&entry, attributes, segments);
    if formatter.is_json() {
        formatter.json(&output);
    } else {
        output.print(&formatter);
    }
    ExitCode::Success
}
