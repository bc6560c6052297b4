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

//! `wiki-store` is a library for version-controlled wiki page storage.
//!
//! Pages are persisted as files inside working trees tracked by an external
//! version control binary. The library shells out to that binary for
//! everything with history and parses its textual output; it never speaks
//! the version control protocol itself. On top of that it provides:
//! - Per-page revision history, diffs, logs, and line annotations
//! - Crash-safe page writes (staging file plus rename)
//! - Per-page writer locking with bounded retry
//! - A redaction overlay that hides the text of selected historical
//! revisions while keeping their metadata visible
//! - A derived forward-link and backlink index with incremental updates
//!
//! The [`repo`] module is the entry point: a [`Repository`] owns a
//! read-only working copy for lookups and a write working copy for
//! commits, and hands out [`Page`] handles.
//!
//! # Concurrency
//! Any number of readers may share one set of working trees. Writers are
//! serialized per page name by an advisory directory lock; different page
//! names commit independently. A `Repository` instance itself belongs to
//! one unit of work, because it carries that request's memoization cache.
//!
//! [`Repository`]: crate::repo::Repository
//! [`Page`]: crate::repo::Page

pub use error::{Error, Result};
pub use name::PageName;

pub mod cache;
mod error;
pub mod links;
mod name;
pub mod redaction;
pub mod repo;
pub mod store;
pub mod vcs;
