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

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use super::repository::Repository;
use crate::name::PageName;
use crate::vcs::{AnnotateLine, Diff, LogEntry};

/// The state of one page, captured when it was first looked up.
///
/// A page entity lives for one request: it is constructed on first access,
/// memoized in the request cache so repeated lookups of the same name
/// observe identical state, and discarded when the request ends. Nothing in
/// it is persisted; the underlying file and history live in the working
/// tree.
#[derive(Debug)]
pub struct PageState {
    /// The page's validated name.
    pub(crate) name: PageName,
    /// The page's revision in the read tree, or `None` if it doesn't exist.
    pub(crate) revision: Option<u32>,
    /// The page's modification time, or `None` if it doesn't exist.
    pub(crate) mtime: Option<DateTime<Utc>>,
    /// The lazily computed backlink set.
    pub(crate) backlinks: RefCell<Option<BTreeSet<PageName>>>,
}

/// A handle to one page of a [`Repository`].
///
/// Reads go through the repository's read tree; writes go through
/// [`checkin`], which routes them to the write tree.
///
/// [`Repository`]: crate::repo::Repository
/// [`checkin`]: crate::repo::Page::checkin
#[derive(Debug, Clone)]
pub struct Page<'a> {
    repo: &'a Repository,
    state: Rc<PageState>,
}

impl<'a> Page<'a> {
    pub(crate) fn new(repo: &'a Repository, state: Rc<PageState>) -> Self {
        Self { repo, state }
    }

    /// Return this page's name.
    pub fn name(&self) -> &PageName {
        &self.state.name
    }

    /// Return this page's current revision, or `None` if it doesn't exist
    /// yet.
    pub fn revision(&self) -> Option<u32> {
        self.state.revision
    }

    /// Return this page's modification time, or `None` if it doesn't exist
    /// yet.
    pub fn mtime(&self) -> Option<DateTime<Utc>> {
        self.state.mtime
    }

    /// Return whether this page exists in the repository.
    pub fn exists(&self) -> bool {
        self.repo.exists(&self.state.name)
    }

    /// Return this page's current source text.
    ///
    /// # Errors
    /// - `Error::NotFound`: The page doesn't exist yet.
    pub fn source(&self) -> crate::Result<String> {
        self.repo.read_copy().read(&self.state.name)
    }

    /// Return this page's source text at the given revision.
    ///
    /// A redacted revision returns the fixed placeholder text.
    pub fn source_at(&self, revision: u32) -> crate::Result<String> {
        self.repo.read_copy().read_at_revision(&self.state.name, revision)
    }

    /// Return this page's commit history, newest first.
    pub fn logs(&self) -> crate::Result<Vec<LogEntry>> {
        self.repo.read_copy().log(&self.state.name)
    }

    /// Return the log entry for one revision of this page.
    pub fn log_at(&self, revision: u32) -> crate::Result<LogEntry> {
        self.repo.read_copy().log_at(&self.state.name, revision)
    }

    /// Return the diff of this page between two revisions.
    pub fn diff(&self, rev1: u32, rev2: u32) -> crate::Result<Diff> {
        self.repo.read_copy().diff(&self.state.name, rev1, rev2)
    }

    /// Return the diff of this page's whole history.
    ///
    /// # Errors
    /// - `Error::NotFound`: The page doesn't exist yet.
    pub fn diff_all(&self) -> crate::Result<Diff> {
        let revision = self.state.revision.ok_or(crate::Error::NotFound)?;
        self.repo.read_copy().diff_all(&self.state.name, revision)
    }

    /// Return this page's lines attributed to the revisions that last
    /// touched them, at `revision` or at the head.
    pub fn annotate(&self, revision: Option<u32>) -> crate::Result<Vec<AnnotateLine>> {
        self.repo.read_copy().annotate(&self.state.name, revision)
    }

    /// Return the pages this page links to.
    pub fn links(&self) -> crate::Result<BTreeSet<PageName>> {
        self.repo.links_of(&self.state.name)
    }

    /// Return the pages that link to this page.
    ///
    /// The set is computed on first use and remembered for this entity's
    /// lifetime.
    pub fn backlinks(&self) -> crate::Result<BTreeSet<PageName>> {
        {
            let cached = self.state.backlinks.borrow();
            if let Some(backlinks) = cached.as_ref() {
                return Ok(backlinks.clone());
            }
        }

        let backlinks = self.repo.backlinks_of(&self.state.name)?;
        *self.state.backlinks.borrow_mut() = Some(backlinks.clone());
        Ok(backlinks)
    }

    /// Commit `text` as the next revision of this page.
    ///
    /// See [`Repository::checkin`].
    ///
    /// [`Repository::checkin`]: crate::repo::Repository::checkin
    pub fn checkin(&self, base: Option<u32>, text: &str) -> crate::Result<u32> {
        self.repo.checkin(&self.state.name, base, text)
    }
}
