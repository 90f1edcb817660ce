//! Machine listing (MLSD, RFC 3659) reply parser
//!
//! Each reply line carries `fact=value;` pairs followed by a single space and
//! the entry name, e.g. `type=file;size=4161;modify=19970214165800; a.txt`.

use std::collections::HashMap;
use std::sync::LazyLock;

use jiff::Timestamp;
use jiff::civil::{Date, DateTime, Time};
use jiff::tz::TimeZone;
use regex::Regex;
use tracing::{error, warn};

use super::{AttributedList, ListingReply};
use crate::entry::{DELIMITER, Entry, EntryType, Permission};
use crate::error::{Error, Result};

static FACTS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s?((?:\S+=\S+;)*)\s(.*)$").expect("valid MLSD line pattern")
});

/// Parsed facts of one reply line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facts {
    pub name: String,
    pub facts: HashMap<String, String>,
}

impl Facts {
    fn get(&self, key: &str) -> Option<&str> {
        self.facts.get(key).map(String::as_str)
    }
}

/// Split a reply line into its lowercase facts and the entry name
///
/// Facts with a blank key or value are dropped. Returns `None` when the line
/// does not follow the machine listing grammar.
pub fn parse_facts(line: &str) -> Option<Facts> {
    let captures = FACTS_LINE.captures(line)?;
    let name = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
    let facts = captures
        .get(1)
        .map(|m| m.as_str())
        .unwrap_or_default()
        .split(';')
        .filter_map(|fact| {
            let (key, value) = fact.split_once('=')?;
            if key.trim().is_empty() || value.trim().is_empty() {
                return None;
            }
            Some((key.to_ascii_lowercase(), value.to_string()))
        })
        .collect();
    Some(Facts {
        name: name.to_string(),
        facts,
    })
}

/// Parse an MDTM style timestamp (`YYYYMMDDHHMMSS[.sss]`, UTC)
pub fn parse_timestamp(value: &str) -> Option<Timestamp> {
    let (base, fraction) = match value.split_once('.') {
        Some((base, fraction)) => (base, Some(fraction)),
        None => (value, None),
    };
    match parse_seconds(base).and_then(|ts| with_fraction(ts, fraction)) {
        Ok(ts) => Some(ts),
        Err(e) => {
            warn!(timestamp = value, error = %e, "Failed to parse timestamp");
            None
        }
    }
}

fn parse_seconds(value: &str) -> Result<Timestamp> {
    let invalid = |reason: String| Error::Parse {
        line: value.to_string(),
        reason,
    };
    if value.len() != 14 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("expected YYYYMMDDHHMMSS".to_string()));
    }
    let field = |range: std::ops::Range<usize>| -> Result<i16> {
        value[range]
            .parse::<i16>()
            .map_err(|e| invalid(e.to_string()))
    };
    let date = Date::new(field(0..4)?, field(4..6)? as i8, field(6..8)? as i8)
        .map_err(|e| invalid(e.to_string()))?;
    let time = Time::new(field(8..10)? as i8, field(10..12)? as i8, field(12..14)? as i8, 0)
        .map_err(|e| invalid(e.to_string()))?;
    DateTime::from_parts(date, time)
        .to_zoned(TimeZone::UTC)
        .map(|zoned| zoned.timestamp())
        .map_err(|e| invalid(e.to_string()))
}

fn with_fraction(ts: Timestamp, fraction: Option<&str>) -> Result<Timestamp> {
    let Some(fraction) = fraction else {
        return Ok(ts);
    };
    if fraction.is_empty() || fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Parse {
            line: fraction.to_string(),
            reason: "invalid fractional seconds".to_string(),
        });
    }
    let nanos: i64 = format!("{fraction:0<9}").parse().map_err(|_| Error::Parse {
        line: fraction.to_string(),
        reason: "invalid fractional seconds".to_string(),
    })?;
    ts.checked_add(jiff::SignedDuration::from_nanos(nanos))
        .map_err(|e| Error::Parse {
            line: fraction.to_string(),
            reason: e.to_string(),
        })
}

/// Reader turning MLSD reply lines into directory children
#[derive(Debug, Default, Clone, Copy)]
pub struct MlsdReader;

impl MlsdReader {
    pub fn new() -> Self {
        Self
    }

    /// Parse `replies` as the listing of `parent`
    ///
    /// `encoding` is the session's configured charset; a `charset` fact that
    /// disagrees with it is only logged. `success` is false for an empty reply
    /// and for a reply whose only entry is a directory named like `parent`,
    /// which some servers send for a path they failed to list.
    pub fn read<I, S>(&self, parent: &Entry, encoding: &str, replies: I) -> ListingReply
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut children = AttributedList::new();
        let mut errors = Vec::new();
        let mut success = false;
        let parent_absolute = parent.path().to_string();

        for line in replies {
            let line = line.as_ref();
            let Some(facts) = parse_facts(line) else {
                error!(line, "Error parsing line");
                errors.push(parse_error(line, "line does not match fact grammar"));
                continue;
            };

            let kind = match facts.get("type").map(str::to_ascii_lowercase).as_deref() {
                Some("dir") => EntryType::Directory,
                Some("file") => EntryType::File,
                Some(other) => {
                    warn!(line, kind = other, "Ignored type");
                    errors.push(parse_error(line, &format!("unsupported type {other}")));
                    continue;
                }
                None => {
                    error!(line, "No type fact in line");
                    errors.push(parse_error(line, "missing type fact"));
                    continue;
                }
            };

            let name = facts.name.as_str();
            if name.contains(DELIMITER) {
                let prefix = format!("{parent_absolute}{DELIMITER}");
                if !name.starts_with(&prefix) {
                    warn!(name, "Skip listing entry with delimiter");
                    continue;
                }
            }
            let bare = name.rsplit(DELIMITER).next().unwrap_or(name);
            if bare.is_empty() {
                errors.push(parse_error(line, "empty name"));
                continue;
            }

            if !success {
                if kind == EntryType::Directory && parent.name() == name {
                    warn!(line, "Possibly bogus response");
                } else {
                    success = true;
                }
            }

            let mut entry = parent.child(bare, kind);
            let mut attributes = entry.attributes().clone();
            if let Some(size) = facts.get("size") {
                match size.parse::<u64>() {
                    Ok(size) => attributes.size = Some(size),
                    Err(e) => {
                        warn!(line, size, "Failed to parse size fact");
                        errors.push(parse_error(line, &format!("invalid size: {e}")));
                    }
                }
            }
            attributes.owner = facts
                .get("unix.owner")
                .or_else(|| facts.get("unix.uid"))
                .map(str::to_string);
            attributes.group = facts
                .get("unix.group")
                .or_else(|| facts.get("unix.gid"))
                .map(str::to_string);
            if let Some(mode) = facts.get("unix.mode") {
                match Permission::from_octal(mode) {
                    Ok(permission) => attributes.permission = Some(permission),
                    Err(e) => error!(line, mode, error = %e, "Failed to parse fact"),
                }
            }
            attributes.modified = facts.get("modify").and_then(parse_timestamp);
            attributes.created = facts.get("create").and_then(parse_timestamp);
            if let Some(charset) = facts.get("charset")
                && !charset.eq_ignore_ascii_case(encoding)
            {
                error!(
                    charset,
                    encoding, "Incompatible charset, session is configured differently"
                );
            }
            entry.set_attributes(attributes);
            children.push(entry);
        }

        ListingReply {
            children,
            success,
            errors,
        }
    }
}

fn parse_error(line: &str, reason: &str) -> Error {
    Error::Parse {
        line: line.to_string(),
        reason: reason.to_string(),
    }
}
