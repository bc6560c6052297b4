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

use std::path::PathBuf;
use std::sync::Arc;

use crate::store::{CaseInsensitiveEncoding, CaseSensitiveEncoding, PathEncoding};

/// The version control binary used when the configuration names none.
const DEFAULT_BINARY: &str = "cvs";

/// The configuration for opening a [`Repository`].
///
/// A repository needs at least a read tree and a cache directory. Without a
/// write tree the repository is read-only and rejects every checkin.
///
/// [`Repository`]: crate::repo::Repository
#[derive(Debug, Clone)]
pub struct RepoConfig {
    /// The checked-out tree all reads go through.
    pub read_root: PathBuf,
    /// The checked-out tree all writes go through, if any.
    pub write_root: Option<PathBuf>,
    /// The directory holding the link cache.
    pub cache_dir: PathBuf,
    /// The version control binary to invoke.
    pub vcs_binary: PathBuf,
    /// The redaction list file, if any.
    pub redaction_file: Option<PathBuf>,
    /// Whether page files live on a case-insensitive file system.
    pub case_insensitive: bool,
}

impl RepoConfig {
    /// Create a configuration for a read-only repository over `read_root`.
    pub fn new(read_root: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            read_root: read_root.into(),
            write_root: None,
            cache_dir: cache_dir.into(),
            vcs_binary: PathBuf::from(DEFAULT_BINARY),
            redaction_file: None,
            case_insensitive: false,
        }
    }

    /// Route writes through the checked-out tree at `write_root`.
    pub fn write_root(mut self, write_root: impl Into<PathBuf>) -> Self {
        self.write_root = Some(write_root.into());
        self
    }

    /// Use the version control binary at `binary`.
    pub fn vcs_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.vcs_binary = binary.into();
        self
    }

    /// Load redacted revisions from the file at `path`.
    pub fn redaction_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.redaction_file = Some(path.into());
        self
    }

    /// Encode page names for a case-insensitive file system.
    pub fn case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    /// Return the name-to-path encoding this configuration selects.
    pub(crate) fn encoding(&self) -> Arc<dyn PathEncoding> {
        if self.case_insensitive {
            Arc::new(CaseInsensitiveEncoding)
        } else {
            Arc::new(CaseSensitiveEncoding)
        }
    }

    /// Check this configuration for missing or contradictory setup.
    ///
    /// # Errors
    /// - `Error::Config`: A working tree is missing, is not a checkout, or
    /// the read and write trees are the same directory.
    pub(crate) fn validate(&self) -> crate::Result<()> {
        if self.vcs_binary.as_os_str().is_empty() {
            return Err(crate::Error::Config(
                "no version control binary is configured".to_string(),
            ));
        }

        for root in std::iter::once(&self.read_root).chain(self.write_root.iter()) {
            if !root.is_dir() {
                return Err(crate::Error::Config(format!(
                    "working tree {} is not a directory",
                    root.display()
                )));
            }
            if !root.join("CVS").is_dir() {
                return Err(crate::Error::Config(format!(
                    "working tree {} is not a checkout",
                    root.display()
                )));
            }
        }

        if self.write_root.as_deref() == Some(self.read_root.as_path()) {
            return Err(crate::Error::Config(
                "the read and write trees must be separate checkouts".to_string(),
            ));
        }

        Ok(())
    }
}
