//! ls command - List a remote directory

use clap::Args;
use jiff::Timestamp;
use rft_core::Entry;
use serde::Serialize;

use super::{Context, fail, parse_remote};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, SpinnerListener};

/// List the children of a remote directory
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Remote directory (host:/path)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct ListEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,
}

impl From<&Entry> for ListEntry {
    fn from(entry: &Entry) -> Self {
        let attributes = entry.attributes();
        Self {
            name: entry.name().to_string(),
            path: entry.path().to_string(),
            kind: entry.kind().to_string(),
            size: attributes.size,
            modified: attributes.modified,
            region: attributes.region.clone(),
        }
    }
}

/// One line of the human readable listing
fn format_line(formatter: &Formatter, entry: &Entry) -> String {
    let date = entry
        .attributes()
        .modified
        .map(|t| t.strftime("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let size = entry
        .size()
        .map(|s| humansize::format_size(s, humansize::BINARY))
        .unwrap_or_default();
    format!(
        "{} {} {}",
        formatter.style_date(&format!("{date:<16}")),
        formatter.style_size(&format!("{size:>10}")),
        formatter.style_entry(entry)
    )
}

/// Execute the ls command
pub async fn execute(args: LsArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();

    let remote = match parse_remote(&args.path, &formatter) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let connection = match ctx.open(&remote.host, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };
    let list = match connection.capabilities.list() {
        Ok(list) => list,
        Err(e) => return fail(&formatter, &e),
    };

    let listener = SpinnerListener::new(&formatter);
    let result = list.list(&remote.as_directory().entry(), &listener).await;
    listener.finish();
    let mut children = match result {
        Ok(children) => children,
        Err(e) => return fail(&formatter, &e),
    };
    children.sort();

    if formatter.is_json() {
        let entries: Vec<ListEntry> = children.iter().map(ListEntry::from).collect();
        formatter.json(&entries);
    } else {
        for entry in &children {
            formatter.println(&format_line(&formatter, entry));
        }
    }
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use rft_core::{Attributes, EntryPath};

    use super::*;
    use crate::output::OutputConfig;

    #[test]
    fn test_format_line() {
        let formatter = Formatter::new(OutputConfig {
            no_color: true,
            ..Default::default()
        });
        let file = Entry::file(EntryPath::parse("/c/a.txt")).with_attributes(Attributes {
            size: Some(2048),
            modified: Some(Timestamp::from_second(1_234_567_890).unwrap()),
            ..Default::default()
        });
        assert_eq!(
            format_line(&formatter, &file),
            format!("2009-02-13 23:31 {:>10} a.txt", "2 KiB")
        );

        let dir = Entry::directory(EntryPath::parse("/c/photos"));
        assert_eq!(format_line(&formatter, &dir), format!("{:<16} {:>10} photos/", "", ""));
    }

    #[test]
    fn test_list_entry_json() {
        let mut entry = Entry::volume("bucket");
        entry.set_region("eu-west-1");
        let json = serde_json::to_value(ListEntry::from(&entry)).unwrap();
        assert_eq!(json["name"], "bucket");
        assert_eq!(json["type"], "volume");
        assert_eq!(json["region"], "eu-west-1");
        assert!(json.get("size").is_none());
    }
}
