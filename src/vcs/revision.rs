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

/// The revision string of the vendor branch bootstrap commit.
///
/// An imported file's first revision is reported as `1.1.1.1` instead of
/// `1.1`; both mean revision 1.
const VENDOR_BOOTSTRAP: &str = "1.1.1.1";

/// Parse a two-part revision string like `1.4` into a page revision.
///
/// Page revisions are strictly increasing positive integers; the version
/// control system spells revision `N` as `1.N` on the trunk. The vendor
/// branch bootstrap marker `1.1.1.1` maps to revision 1.
///
/// # Errors
/// - `Error::Parse`: The text is not a trunk revision string.
pub fn parse_revision(text: &str) -> crate::Result<u32> {
    let text = text.trim();

    if text == VENDOR_BOOTSTRAP {
        return Ok(1);
    }

    let parse_error = || crate::Error::Parse(format!("invalid revision string `{}`", text));

    match text.split_once('.') {
        Some((branch, number)) if !number.contains('.') => {
            branch.parse::<u32>().map_err(|_| parse_error())?;
            number.parse().map_err(|_| parse_error())
        }
        _ => Err(parse_error()),
    }
}

/// Format a page revision as the version control system's revision string.
pub fn format_revision(revision: u32) -> String {
    format!("1.{}", revision)
}
