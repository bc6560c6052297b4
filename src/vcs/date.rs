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

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Date formats with an explicit offset, as emitted by newer binaries.
const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%e %b %Y %H:%M:%S %z"];

/// Date formats without an offset; these are implied UTC.
const NAIVE_FORMATS: &[&str] = &["%Y/%m/%d %H:%M:%S", "%e %b %Y %H:%M:%S"];

/// The format of timestamps in the `Entries` file, implied UTC.
const ENTRIES_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Parse a timestamp from log or diff output.
///
/// Old binaries write `2003/03/05 07:00:51` (implied UTC); newer ones write
/// `2003-03-05 07:00:51 +0000`; diff headers write
/// `5 Mar 2003 07:00:51 -0000`. All of them normalize to UTC.
pub(crate) fn parse_history_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    for format in ZONED_FORMATS {
        if let Ok(date) = DateTime::parse_from_str(text, format) {
            return Some(date.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(date) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&date));
        }
    }

    None
}

/// Parse a working copy `Entries` timestamp like `Wed Mar  5 07:00:51 2003`.
///
/// Entries timestamps the binary writes for merges and fresh checkouts are
/// not dates at all; those parse as `None` and callers fall back to the
/// file's own modification time.
pub(crate) fn parse_entries_date(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text.trim(), ENTRIES_FORMAT)
        .ok()
        .map(|date| Utc.from_utc_datetime(&date))
}
