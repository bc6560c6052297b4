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

use std::fmt::Debug;

use crate::name::PageName;

/// A scheme for mapping page names to file names.
///
/// Implementations must be reversible: `decode(encode(name))` returns the
/// original `name` for every valid page name.
pub trait PathEncoding: Debug + Send + Sync {
    /// Encode the given page name as a file name.
    fn encode(&self, name: &PageName) -> String;

    /// Decode a file name produced by [`encode`] back into a page name.
    ///
    /// This returns `None` for file names this encoding never produces.
    ///
    /// [`encode`]: crate::store::PathEncoding::encode
    fn decode(&self, file_name: &str) -> Option<PageName>;
}

/// A `PathEncoding` for case-sensitive file systems.
///
/// Page names are used as file names verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseSensitiveEncoding;

impl PathEncoding for CaseSensitiveEncoding {
    fn encode(&self, name: &PageName) -> String {
        name.as_str().to_string()
    }

    fn decode(&self, file_name: &str) -> Option<PageName> {
        PageName::new(file_name).ok()
    }
}

/// A `PathEncoding` for case-insensitive file systems.
///
/// `Page` and `page` would collide on a case-folding file system, so each
/// uppercase letter `C` is stored as `=c`. The marker character `=` is not
/// valid in page names, which makes the scheme reversible.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitiveEncoding;

impl PathEncoding for CaseInsensitiveEncoding {
    fn encode(&self, name: &PageName) -> String {
        let mut encoded = String::with_capacity(name.as_str().len());
        for ch in name.as_str().chars() {
            if ch.is_ascii_uppercase() {
                encoded.push('=');
                encoded.push(ch.to_ascii_lowercase());
            } else {
                encoded.push(ch);
            }
        }
        encoded
    }

    fn decode(&self, file_name: &str) -> Option<PageName> {
        let mut decoded = String::with_capacity(file_name.len());
        let mut chars = file_name.chars();
        while let Some(ch) = chars.next() {
            if ch == '=' {
                decoded.push(chars.next()?.to_ascii_uppercase());
            } else if ch.is_ascii_uppercase() {
                // Never produced by `encode`.
                return None;
            } else {
                decoded.push(ch);
            }
        }
        PageName::new(decoded).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::{CaseInsensitiveEncoding, CaseSensitiveEncoding, PathEncoding};
    use crate::name::PageName;

    #[test]
    fn case_sensitive_round_trip() {
        let encoding = CaseSensitiveEncoding;
        let name = PageName::new("FrontPage").unwrap();

        assert_eq!(encoding.encode(&name), "FrontPage");
        assert_eq!(encoding.decode("FrontPage"), Some(name));
    }

    #[test]
    fn case_insensitive_round_trip() {
        let encoding = CaseInsensitiveEncoding;
        let name = PageName::new("FrontPage-2.0").unwrap();
        let encoded = encoding.encode(&name);

        assert_eq!(encoded, "=front=page-2.0");
        assert_eq!(encoding.decode(&encoded), Some(name));
    }

    #[test]
    fn case_insensitive_rejects_foreign_names() {
        let encoding = CaseInsensitiveEncoding;

        assert_eq!(encoding.decode("FrontPage"), None);
        assert_eq!(encoding.decode("broken="), None);
    }
}
