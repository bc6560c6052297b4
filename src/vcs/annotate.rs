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

use once_cell::sync::Lazy;
use regex::Regex;

use super::revision::parse_revision;
use crate::name::PageName;
use crate::redaction::RedactionList;

/// Matches one annotated line: revision, author, date, then the content.
static ANNOTATED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9.]+)\s+\(\S+\s+[0-9]{2}-[A-Za-z]{3}-[0-9]{2}\): ?(.*)$").unwrap()
});

/// One line of a page, attributed to the revision that last touched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotateLine {
    /// The revision that last changed this line.
    pub revision: u32,
    /// The line's content, or an empty string if the revision is redacted.
    pub text: String,
    /// Whether the content was suppressed by the redaction list.
    pub killed: bool,
}

/// Parse `annotate` output for the page `name` into attributed lines.
///
/// Lines whose revision is redacted come back with empty content but keep
/// their revision number, so blame still shows who touched a redacted line
/// without revealing its text.
///
/// # Errors
/// - `Error::Parse`: The output does not have the expected line shape.
pub fn parse_annotation(
    name: &PageName,
    text: &str,
    redaction: &RedactionList,
) -> crate::Result<Vec<AnnotateLine>> {
    let mut lines = Vec::new();

    for line in text.lines() {
        let captures = match ANNOTATED_LINE.captures(line) {
            Some(captures) => captures,
            None => {
                // Some binaries put the per-file banner on stdout.
                if line.is_empty()
                    || line.starts_with("Annotations for")
                    || line.chars().all(|ch| ch == '*')
                {
                    continue;
                }
                return Err(crate::Error::Parse(format!(
                    "unexpected annotate line `{}`",
                    line
                )));
            }
        };

        let revision = parse_revision(&captures[1])?;
        let killed = redaction.includes(name.as_str(), revision);

        lines.push(AnnotateLine {
            revision,
            text: if killed {
                String::new()
            } else {
                captures[2].to_string()
            },
            killed,
        });
    }

    Ok(lines)
}
