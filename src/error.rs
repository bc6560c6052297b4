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

use std::io;
use std::result;

use thiserror::Error as DeriveError;

/// The error type for operations with a page repository.
#[derive(Debug, DeriveError)]
pub enum Error {
    /// The repository configuration is missing or contradictory.
    ///
    /// This error is fatal at startup and is never retried.
    #[error("The repository configuration is invalid: {0}")]
    Config(String),

    /// The given page name is not a valid page name.
    #[error("The given page name is invalid.")]
    InvalidName,

    /// The page was not found.
    #[error("The page was not found.")]
    NotFound,

    /// A writer lock could not be acquired within the retry budget.
    ///
    /// Another writer held the page lock for the whole retry window. The
    /// operation was not started and is safe to retry later.
    #[error("The page is locked by another writer.")]
    Locked,

    /// The external version control process exited unsuccessfully.
    ///
    /// This is not retried automatically; a retry could resubmit a partially
    /// applied write.
    #[error("The version control command exited with status {status:?}.")]
    Command {
        /// The exit status of the process, if it exited normally.
        status: Option<i32>,
        /// The captured standard error output of the process.
        stderr: String,
    },

    /// A three-way merge produced conflicts.
    ///
    /// This is an expected, recoverable outcome of committing with a stale
    /// base revision. It carries the conflict-marked merged text and the
    /// page's current head revision so the caller can re-present an edit
    /// form.
    #[error("The edit conflicts with revision {revision}.")]
    Conflict {
        /// The merged text, including conflict markers.
        text: String,
        /// The page's current head revision.
        revision: u32,
    },

    /// The redaction list file is malformed.
    ///
    /// This error is fatal at load time.
    #[error("The redaction list could not be parsed: {0}")]
    InvalidRedactionList(String),

    /// The output of a version control command had an unexpected shape.
    #[error("Unexpected version control output: {0}")]
    Parse(String),

    /// An I/O error occurred.
    #[error("{0}")]
    Io(#[from] io::Error),
}

/// The result type for operations with a page repository.
pub type Result<T> = result::Result<T, Error>;
