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

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::date::parse_entries_date;
use super::revision::parse_revision;

/// One file's record in a working copy's `Entries` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The revision this working copy has checked out.
    pub revision: u32,
    /// The checkout timestamp, if the table recorded a parseable one.
    pub mtime: Option<DateTime<Utc>>,
}

/// The parsed revision bookkeeping table of one working copy.
///
/// The version control system records what it has checked out in an
/// `Entries` file under its administrative directory, one
/// `/name/revision/timestamp/options/tag` line per file. This table is the
/// source of truth for [`revision`] and [`mtime`] lookups; it is parsed once
/// per request and memoized in the request cache.
///
/// [`revision`]: crate::vcs::WorkingCopy::revision
/// [`mtime`]: crate::vcs::WorkingCopy::mtime
#[derive(Debug, Clone, Default)]
pub struct EntriesTable {
    entries: HashMap<String, Entry>,
}

impl EntriesTable {
    /// Parse an `Entries` file.
    ///
    /// Directory lines and files scheduled for addition or removal are
    /// skipped; they have no committed revision yet.
    ///
    /// # Errors
    /// - `Error::Parse`: A file line's revision field is not a revision
    /// string.
    pub fn parse(text: &str) -> crate::Result<Self> {
        let mut entries = HashMap::new();

        for line in text.lines() {
            if !line.starts_with('/') {
                // Directory lines start with `D`.
                continue;
            }

            let mut fields = line.split('/');
            fields.next();
            let name = fields
                .next()
                .ok_or_else(|| crate::Error::Parse(format!("malformed entries line `{}`", line)))?;
            let revision = fields
                .next()
                .ok_or_else(|| crate::Error::Parse(format!("malformed entries line `{}`", line)))?;
            let timestamp = fields.next().unwrap_or("");

            // `0` marks a scheduled add, a leading `-` a scheduled remove.
            if revision == "0" || revision.starts_with('-') {
                continue;
            }

            entries.insert(
                name.to_string(),
                Entry {
                    revision: parse_revision(revision)?,
                    mtime: parse_entries_date(timestamp),
                },
            );
        }

        Ok(Self { entries })
    }

    /// Return the record for the given file name.
    pub fn get(&self, file_name: &str) -> Option<&Entry> {
        self.entries.get(file_name)
    }

    /// Return the checked-out revision of the given file name.
    pub fn revision(&self, file_name: &str) -> Option<u32> {
        self.entries.get(file_name).map(|entry| entry.revision)
    }

    /// Return the number of files in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return whether the table has no files.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
