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

//! The version control layer over a checked-out tree.
//!
//! A [`WorkingCopy`] wraps one checkout tracked by an external version
//! control binary. It owns the revision bookkeeping for that tree and turns
//! the binary's textual output into typed records: [`Diff`], [`LogEntry`],
//! and [`AnnotateLine`]. Every record's text passes through the shared
//! [`RedactionList`] before a caller can see it.
//!
//! # Process invocation
//! Every subcommand runs through [`run_command`], which fully drains both
//! output streams before waiting on the process. Waiting first deadlocks
//! once a pipe buffer fills, so no other invocation path exists in this
//! crate. Exit status 0 means success for every subcommand except `diff`,
//! where a non-zero status may just mean "differences found".
//!
//! # Revisions
//! Page revisions are strictly increasing positive integers, spelled `1.N`
//! by the binary; [`parse_revision`] also maps the vendor bootstrap marker
//! `1.1.1.1` to revision 1. A page with no revision does not exist yet.
//!
//! [`RedactionList`]: crate::redaction::RedactionList

pub use self::annotate::{parse_annotation, AnnotateLine};
pub use self::command::{run_command, CommandOutput};
pub use self::diff::{parse_diffs, Diff};
pub use self::entries::{EntriesTable, Entry};
pub use self::log::{parse_log, LogEntry};
pub use self::revision::{format_revision, parse_revision};
pub use self::working_copy::WorkingCopy;

mod annotate;
mod command;
mod date;
mod diff;
mod entries;
mod log;
mod revision;
mod working_copy;
