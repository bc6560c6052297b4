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
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

/// The placeholder text returned in place of a redacted record's content.
///
/// Revision numbers and timestamps of redacted records stay visible; only
/// their text is replaced by this message.
pub const REDACTED_TEXT: &str = "This revision has been removed by the site administrator.\n";

/// An empty range set, returned for page names with no redactions.
static EMPTY_SET: RangeSet = RangeSet { ranges: Vec::new() };

/// A union of single integers and closed integer intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    /// The contained intervals, each normalized so that `lo <= hi`.
    ranges: Vec<(u32, u32)>,
}

impl RangeSet {
    /// Create a new empty `RangeSet`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a range specification into a `RangeSet`.
    ///
    /// The specification is a comma-separated list of tokens, each either a
    /// single integer or an interval `A-B`. Intervals are order-normalized,
    /// so `7-5` means the same as `5-7`.
    ///
    /// # Errors
    /// - `Error::InvalidRedactionList`: A token is not an integer or an
    /// interval of integers.
    pub fn parse(spec: &str) -> crate::Result<Self> {
        let mut ranges = Vec::new();

        for token in spec.split(',') {
            let token = token.trim();
            let range = match token.split_once('-') {
                Some((lo, hi)) => {
                    let lo = parse_bound(lo)?;
                    let hi = parse_bound(hi)?;
                    (lo.min(hi), lo.max(hi))
                }
                None => {
                    let value = parse_bound(token)?;
                    (value, value)
                }
            };
            ranges.push(range);
        }

        Ok(Self { ranges })
    }

    /// Return whether this set contains the given `value`.
    pub fn includes(&self, value: u32) -> bool {
        self.ranges.iter().any(|(lo, hi)| *lo <= value && value <= *hi)
    }

    /// Return whether this set shares at least one integer with `range`.
    pub fn overlaps(&self, range: RangeInclusive<u32>) -> bool {
        self.ranges
            .iter()
            .any(|(lo, hi)| *lo <= *range.end() && *range.start() <= *hi)
    }

    /// Return whether this set is empty.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Parse one integer bound of a range token.
fn parse_bound(text: &str) -> crate::Result<u32> {
    text.trim()
        .parse()
        .map_err(|_| crate::Error::InvalidRedactionList(format!("invalid range token `{}`", text)))
}

/// A mapping from page names to the revision ranges hidden for that page.
///
/// The list is loaded from a text file with one `<name> <range-spec>` entry
/// per line. The diff, log, and annotate parsers consult it through
/// [`decide`] to determine whether a record's text must be suppressed.
///
/// [`decide`]: crate::redaction::RedactionList::decide
#[derive(Debug, Clone, Default)]
pub struct RedactionList {
    pages: HashMap<String, RangeSet>,
}

impl RedactionList {
    /// Create a new empty `RedactionList`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a redaction list from the given `text`.
    ///
    /// Each non-empty line holds a page name followed by a range
    /// specification. Blank lines and lines starting with `#` are skipped.
    ///
    /// # Errors
    /// - `Error::InvalidRedactionList`: A line is missing its range
    /// specification or the specification is malformed.
    pub fn parse(text: &str) -> crate::Result<Self> {
        let mut pages = HashMap::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (name, spec) = line.split_once(char::is_whitespace).ok_or_else(|| {
                crate::Error::InvalidRedactionList(format!("missing range spec in `{}`", line))
            })?;
            pages.insert(name.to_string(), RangeSet::parse(spec)?);
        }

        Ok(Self { pages })
    }

    /// Load a redaction list from the file at `path`.
    ///
    /// A missing file is not an error; it loads as an empty list.
    ///
    /// # Errors
    /// - `Error::InvalidRedactionList`: The file is malformed.
    /// - `Error::Io`: An I/O error occurred.
    pub fn load(path: &Path) -> crate::Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(error) => Err(error.into()),
        }
    }

    /// Return the set of redacted revisions for the given page name.
    ///
    /// Unknown names return an empty set, never an error.
    pub fn ranges(&self, name: &str) -> &RangeSet {
        self.pages.get(name).unwrap_or(&EMPTY_SET)
    }

    /// Return whether the given revision of the given page is redacted.
    pub fn includes(&self, name: &str, revision: u32) -> bool {
        self.ranges(name).includes(revision)
    }

    /// Decide whether a record covering `revisions` of page `name` must have
    /// its text suppressed.
    ///
    /// This is the single capability the diff, log, and annotate parsers use
    /// to set a record's `killed` flag.
    pub fn decide(&self, name: &str, revisions: RangeInclusive<u32>) -> bool {
        self.ranges(name).overlaps(revisions)
    }
}
