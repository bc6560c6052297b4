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

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};

use super::date::parse_history_date;
use super::revision::parse_revision;
use crate::name::PageName;
use crate::redaction::{RedactionList, REDACTED_TEXT};
use crate::store::PathEncoding;

/// A unit of change between two revisions of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    /// The page this diff belongs to.
    pub name: PageName,
    /// The source revision, or 0 if the page was newly added.
    pub rev1: u32,
    /// The destination revision, or 0 if it could not be determined yet.
    pub rev2: u32,
    /// The timestamp of the source revision, if the output carried one.
    pub time1: Option<DateTime<Utc>>,
    /// The timestamp of the destination revision, if the output carried one.
    pub time2: Option<DateTime<Utc>>,
    /// The raw diff text, or [`REDACTED_TEXT`] if the diff is redacted.
    pub text: String,
    /// Whether the text was suppressed by the redaction list.
    pub killed: bool,
}

impl Diff {
    /// Return the closed range of revisions whose content this diff reveals.
    ///
    /// A diff between `rev1` and `rev2` shows lines from both sides, so both
    /// endpoints are covered.
    pub fn covered_revisions(&self) -> RangeInclusive<u32> {
        let lo = if self.rev1 == 0 { self.rev2 } else { self.rev1 };
        let hi = self.rev1.max(self.rev2);
        lo.min(hi)..=hi
    }

    /// Suppress this diff's text if the redaction list covers any revision
    /// it reveals.
    ///
    /// Revision numbers and timestamps stay visible. This only ever sets the
    /// `killed` flag; it never clears it.
    pub(crate) fn redact(&mut self, redaction: &RedactionList) {
        if self.killed || redaction.decide(self.name.as_str(), self.covered_revisions()) {
            self.killed = true;
            self.text = REDACTED_TEXT.to_string();
        }
    }
}

/// Parse unified-diff-with-header output into one `Diff` record per file.
///
/// The output of the `diff` subcommand is a sequence of `Index: <file>`
/// sections. Revisions and timestamps are taken from the `---`/`+++` header
/// lines, falling back to the `retrieving revision` lines; a side with
/// neither is left at 0 for the caller to resolve. Files whose names the
/// given `encoding` does not produce are not pages and are skipped.
///
/// # Errors
/// - `Error::Parse`: A header line carries an invalid revision string.
pub fn parse_diffs(
    text: &str,
    redaction: &RedactionList,
    encoding: &dyn PathEncoding,
) -> crate::Result<Vec<Diff>> {
    let mut diffs = Vec::new();
    let mut section: Option<(PageName, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some(file_name) = line.strip_prefix("Index: ") {
            if let Some((name, lines)) = section.take() {
                diffs.push(parse_section(name, &lines, redaction)?);
            }
            // Not every file in the tree is a page.
            section = encoding
                .decode(file_name.trim())
                .map(|name| (name, vec![line]));
            continue;
        }
        if let Some((_, lines)) = section.as_mut() {
            lines.push(line);
        }
    }
    if let Some((name, lines)) = section.take() {
        diffs.push(parse_section(name, &lines, redaction)?);
    }

    Ok(diffs)
}

/// Parse one `Index:` section into a `Diff`.
fn parse_section(
    name: PageName,
    lines: &[&str],
    redaction: &RedactionList,
) -> crate::Result<Diff> {
    let mut retrieved: Vec<u32> = Vec::new();
    let mut rev1 = None;
    let mut rev2 = None;
    let mut time1 = None;
    let mut time2 = None;

    for line in lines {
        if let Some(revision) = line.strip_prefix("retrieving revision ") {
            retrieved.push(parse_revision(revision)?);
        } else if let Some(header) = line.strip_prefix("--- ") {
            let (time, revision) = parse_file_header(header)?;
            time1 = time;
            rev1 = revision;
        } else if let Some(header) = line.strip_prefix("+++ ") {
            let (time, revision) = parse_file_header(header)?;
            time2 = time;
            rev2 = revision;
        }
    }

    let mut retrieved = retrieved.into_iter();
    let rev1 = rev1.or_else(|| retrieved.next()).unwrap_or(0);
    let rev2 = rev2.or_else(|| retrieved.next()).unwrap_or(0);

    let mut text = lines.join("\n");
    text.push('\n');

    let mut diff = Diff {
        name,
        rev1,
        rev2,
        time1,
        time2,
        text,
        killed: false,
    };
    diff.redact(redaction);
    Ok(diff)
}

/// Parse a `---`/`+++` header's tab-separated timestamp and revision.
///
/// The revision field is absent when the right-hand side is the working
/// file rather than a committed revision.
fn parse_file_header(header: &str) -> crate::Result<(Option<DateTime<Utc>>, Option<u32>)> {
    let mut fields = header.split('\t').skip(1);
    let time = fields.next().and_then(parse_history_date);
    let revision = match fields.next() {
        Some(field) => Some(parse_revision(field)?),
        None => None,
    };
    Ok((time, revision))
}
