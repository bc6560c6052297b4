/*
 * Copyright 2019-2021 Wren Powell
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::date::parse_history_date;
use super::revision::parse_revision;
use crate::name::PageName;
use crate::redaction::{RedactionList, REDACTED_TEXT};

/// Matches the date field of a log record's header line.
static DATE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^date:\s*([^;]+);").unwrap());

/// Matches the added/removed counts of a log record's header line.
static LINES_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"lines:\s*\+(\d+)\s+-(\d+)").unwrap());

/// Matches the separator between log records.
static RECORD_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-{10,}$").unwrap());

/// Matches the terminator after the last log record.
static LOG_TERMINATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^={10,}$").unwrap());

/// One commit in a page's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// The revision this commit created.
    pub revision: u32,
    /// When the commit happened, in UTC.
    pub time: DateTime<Utc>,
    /// The number of lines the commit added.
    pub added: u32,
    /// The number of lines the commit removed.
    pub removed: u32,
    /// The commit message, or [`REDACTED_TEXT`] if the revision is redacted.
    pub message: String,
    /// Whether the message was suppressed by the redaction list.
    pub killed: bool,
}

/// Parse `log` output for the page `name` into its commit history.
///
/// Records are newest-first, the order the binary emits them in. Entries
/// whose revision is redacted keep their revision, timestamp, and line
/// counts, but their message is replaced with the fixed placeholder.
///
/// # Errors
/// - `Error::Parse`: The output does not have the expected record shape.
pub fn parse_log(
    name: &PageName,
    text: &str,
    redaction: &RedactionList,
) -> crate::Result<Vec<LogEntry>> {
    let mut records: Vec<Vec<&str>> = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in text.lines() {
        if LOG_TERMINATOR.is_match(line) {
            break;
        }
        if RECORD_SEPARATOR.is_match(line) {
            if let Some(record) = current.take() {
                records.push(record);
            }
            current = Some(Vec::new());
            continue;
        }
        // Everything before the first separator is per-file preamble.
        if let Some(record) = current.as_mut() {
            record.push(line);
        }
    }
    if let Some(record) = current.take() {
        records.push(record);
    }

    records
        .into_iter()
        .map(|record| parse_record(name, &record, redaction))
        .collect()
}

/// Parse one record between separators into a `LogEntry`.
fn parse_record(
    name: &PageName,
    record: &[&str],
    redaction: &RedactionList,
) -> crate::Result<LogEntry> {
    let mut lines = record.iter().copied().skip_while(|line| line.is_empty());

    let revision_line = lines
        .next()
        .ok_or_else(|| crate::Error::Parse("empty log record".to_string()))?;
    let revision_str = revision_line
        .strip_prefix("revision ")
        .and_then(|rest| rest.split_whitespace().next())
        .ok_or_else(|| {
            crate::Error::Parse(format!("expected a revision line, got `{}`", revision_line))
        })?;
    let revision = parse_revision(revision_str)?;

    let date_line = lines
        .next()
        .ok_or_else(|| crate::Error::Parse("log record is missing its date line".to_string()))?;
    let date_field = DATE_LINE
        .captures(date_line)
        .ok_or_else(|| crate::Error::Parse(format!("expected a date line, got `{}`", date_line)))?;
    let time = parse_history_date(&date_field[1])
        .ok_or_else(|| crate::Error::Parse(format!("unrecognized date `{}`", &date_field[1])))?;

    // The first committed revision has no `lines:` field.
    let (added, removed) = match LINES_FIELD.captures(date_line) {
        Some(counts) => (counts[1].parse().unwrap_or(0), counts[2].parse().unwrap_or(0)),
        None => (0, 0),
    };

    let message = lines
        .skip_while(|line| line.starts_with("branches:"))
        .collect::<Vec<_>>()
        .join("\n");

    let killed = redaction.decide(name.as_str(), revision..=revision);

    Ok(LogEntry {
        revision,
        time,
        added,
        removed,
        message: if killed {
            REDACTED_TEXT.to_string()
        } else {
            message
        },
        killed,
    })
}
