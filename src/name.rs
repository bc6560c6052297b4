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

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The maximum length of a page name in bytes.
const MAX_NAME_LEN: usize = 100;

/// Return whether `ch` is allowed in a page name.
fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch == '.'
}

/// A validated wiki page name.
///
/// A page name is the primary key for all lookups in a repository. Names are
/// validated on construction, before any file access happens: a valid name
/// is 1 to 100 bytes of ASCII alphanumerics, `_`, `-`, and `.`, and does not
/// begin with `.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageName(String);

impl PageName {
    /// Create a new `PageName` from the given `name`.
    ///
    /// # Errors
    /// - `Error::InvalidName`: The given `name` is empty, too long, contains
    /// a character outside the allowed set, or begins with `.`.
    pub fn new(name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();

        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(crate::Error::InvalidName);
        }
        if name.starts_with('.') || !name.chars().all(is_name_char) {
            return Err(crate::Error::InvalidName);
        }
        // The administrative directory shares the working tree.
        if name == "CVS" {
            return Err(crate::Error::InvalidName);
        }

        Ok(Self(name))
    }

    /// Return this page name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for PageName {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::PageName;

    #[test]
    fn accepts_simple_names() {
        assert!(PageName::new("FrontPage").is_ok());
        assert!(PageName::new("notes-2021.draft_3").is_ok());
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(PageName::new("").is_err());
        assert!(PageName::new(".hidden").is_err());
        assert!(PageName::new("a/b").is_err());
        assert!(PageName::new("spaced name").is_err());
        assert!(PageName::new("a".repeat(101)).is_err());
        assert!(PageName::new("CVS").is_err());
    }
}
