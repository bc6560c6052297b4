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

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::annotate::{parse_annotation, AnnotateLine};
use super::command::{run_command, CommandOutput};
use super::diff::{parse_diffs, Diff};
use super::entries::EntriesTable;
use super::log::{parse_log, LogEntry};
use super::revision::format_revision;
use crate::cache::RequestCache;
use crate::name::PageName;
use crate::redaction::{RedactionList, REDACTED_TEXT};
use crate::store::PageStore;

/// The administrative directory the version control system keeps per tree.
const ADMIN_DIR: &str = "CVS";

/// The revision bookkeeping file inside the administrative directory.
const ENTRIES_FILE: &str = "Entries";

/// The commit message recorded for page edits.
const COMMIT_MESSAGE: &str = "updated via wiki";

/// The marker rcsmerge puts at the start of a conflicting region.
const CONFLICT_MARKER: &str = "<<<<<<<";

/// A single checked-out tree bound to one external version control binary.
///
/// A working copy reads and writes page files through a [`PageStore`] and
/// shells out to the version control binary for everything with history:
/// diffs, logs, annotations, historical content, and commits. Parsed output
/// is filtered through one shared [`RedactionList`] so redacted revisions
/// never leak text.
///
/// Many readers may use one working copy concurrently; writers are
/// serialized per page name by the store's directory lock. The revision
/// table and the binary's version string are memoized in the request cache,
/// which belongs to exactly one unit of work.
#[derive(Debug)]
pub struct WorkingCopy {
    /// The version control binary to invoke.
    binary: PathBuf,
    /// The file layer of this checked-out tree.
    store: PageStore,
    /// The revisions whose content must not be exposed.
    redaction: Arc<RedactionList>,
    /// The owning request's memoization cache.
    cache: Rc<RequestCache>,
}

impl WorkingCopy {
    /// Create a new `WorkingCopy` over the checked-out tree in `store`.
    pub fn new(
        binary: impl Into<PathBuf>,
        store: PageStore,
        redaction: Arc<RedactionList>,
        cache: Rc<RequestCache>,
    ) -> Self {
        Self {
            binary: binary.into(),
            store,
            redaction,
            cache,
        }
    }

    /// Return the file layer of this working copy.
    pub fn store(&self) -> &PageStore {
        &self.store
    }

    /// Return the first line of the binary's `--version` output.
    ///
    /// The probe runs at most once per request.
    pub fn version(&self) -> crate::Result<Rc<String>> {
        self.cache.get_or_compute("vcs-version", || {
            let output = self.run(&["--version"])?.check()?;
            Ok(output.stdout.lines().next().unwrap_or("").to_string())
        })
    }

    /// Return whether the given revision of the given page is redacted.
    pub fn is_redacted(&self, name: &PageName, revision: u32) -> bool {
        self.redaction.includes(name.as_str(), revision)
    }

    /// Return the revision of the given page in this tree.
    ///
    /// This returns `None` if the page does not exist here yet.
    pub fn revision(&self, name: &PageName) -> crate::Result<Option<u32>> {
        Ok(self.entries()?.revision(&self.store.file_name(name)))
    }

    /// Return the modification time of the given page in this tree.
    ///
    /// The time comes from the revision bookkeeping table; if the table has
    /// no parseable timestamp, the file's own modification time is used.
    /// This returns `None` if the page does not exist here yet.
    pub fn mtime(&self, name: &PageName) -> crate::Result<Option<DateTime<Utc>>> {
        let entries = self.entries()?;
        let entry = match entries.get(&self.store.file_name(name)) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        match entry.mtime {
            Some(mtime) => Ok(Some(mtime)),
            None => Ok(Some(DateTime::<Utc>::from(self.store.stat(name)?))),
        }
    }

    /// Return the current contents of the given page.
    ///
    /// # Errors
    /// - `Error::NotFound`: The page has no file in this tree.
    /// - `Error::Io`: An I/O error occurred.
    pub fn read(&self, name: &PageName) -> crate::Result<String> {
        self.store.read(name)
    }

    /// Return the contents of the given page at the given revision.
    ///
    /// If the redaction list covers `revision`, this short-circuits to the
    /// fixed placeholder without invoking the binary.
    ///
    /// # Errors
    /// - `Error::Command`: The binary could not materialize the revision.
    pub fn read_at_revision(&self, name: &PageName, revision: u32) -> crate::Result<String> {
        if self.redaction.includes(name.as_str(), revision) {
            return Ok(REDACTED_TEXT.to_string());
        }

        let file = self.store.file_name(name);
        let revision_arg = format!("-r{}", format_revision(revision));
        let output = self.run(&["update", "-p", &revision_arg, &file])?.check()?;
        Ok(output.stdout)
    }

    /// Return the commit history of the given page, newest first.
    ///
    /// # Errors
    /// - `Error::Command`: The log subcommand failed.
    /// - `Error::Parse`: The log output had an unexpected shape.
    pub fn log(&self, name: &PageName) -> crate::Result<Vec<LogEntry>> {
        let file = self.store.file_name(name);
        let output = self.run(&["log", &file])?.check()?;
        parse_log(name, &output.stdout, &self.redaction)
    }

    /// Return the log entry for one revision of the given page.
    ///
    /// # Errors
    /// - `Error::NotFound`: The page has no such revision.
    pub fn log_at(&self, name: &PageName, revision: u32) -> crate::Result<LogEntry> {
        let file = self.store.file_name(name);
        let revision_arg = format!("-r{}", format_revision(revision));
        let output = self.run(&["log", &revision_arg, &file])?.check()?;
        parse_log(name, &output.stdout, &self.redaction)?
            .into_iter()
            .next()
            .ok_or(crate::Error::NotFound)
    }

    /// Return the given page's lines attributed to the revisions that last
    /// touched them, at `revision` or at the head.
    ///
    /// # Errors
    /// - `Error::Command`: The annotate subcommand failed.
    /// - `Error::Parse`: The annotate output had an unexpected shape.
    pub fn annotate(
        &self,
        name: &PageName,
        revision: Option<u32>,
    ) -> crate::Result<Vec<AnnotateLine>> {
        let mut args = vec!["annotate".to_string(), "-F".to_string()];
        if let Some(revision) = revision {
            args.push(format!("-r{}", format_revision(revision)));
        }
        args.push(self.store.file_name(name));

        let output = self.run_args(&args)?.check()?;
        parse_annotation(name, &output.stdout, &self.redaction)
    }

    /// Return the diff of the given page between two revisions.
    ///
    /// # Errors
    /// - `Error::Parse`: The diff output had an unexpected shape.
    pub fn diff(&self, name: &PageName, rev1: u32, rev2: u32) -> crate::Result<Diff> {
        let file = self.store.file_name(name);
        let rev1_arg = format!("-r{}", format_revision(rev1));
        let rev2_arg = format!("-r{}", format_revision(rev2));

        // A non-zero diff status may just mean "differences found".
        let output = self.run(&["diff", "-u", &rev1_arg, &rev2_arg, &file])?;
        if output.status.is_none() {
            return Err(crate::Error::Command {
                status: None,
                stderr: output.stderr,
            });
        }

        let parsed = parse_diffs(&output.stdout, &self.redaction, self.store.encoding().as_ref())?;
        let mut diff = parsed
            .into_iter()
            .find(|diff| diff.name == *name)
            .unwrap_or_else(|| Diff {
                name: name.clone(),
                rev1,
                rev2,
                time1: None,
                time2: None,
                text: String::new(),
                killed: false,
            });
        diff.rev1 = rev1;
        diff.rev2 = rev2;
        diff.redact(&self.redaction);
        Ok(diff)
    }

    /// Return the diff of the given page's whole history up to a revision.
    pub fn diff_all(&self, name: &PageName, rev_up_to: u32) -> crate::Result<Diff> {
        self.diff(name, 1, rev_up_to)
    }

    /// Return one diff per page changed since the given time.
    ///
    /// # Errors
    /// - `Error::Parse`: The diff output had an unexpected shape.
    pub fn diff_since(&self, since: DateTime<Utc>) -> crate::Result<Vec<Diff>> {
        let date_arg = since.format("%d %b %Y %H:%M:%S GMT").to_string();

        let output = self.run(&["diff", "-u", "-D", &date_arg])?;
        if output.status.is_none() {
            return Err(crate::Error::Command {
                status: None,
                stderr: output.stderr,
            });
        }

        let mut diffs = parse_diffs(&output.stdout, &self.redaction, self.store.encoding().as_ref())?;
        for diff in &mut diffs {
            // The destination side of a dated diff is the working file, so
            // the output carries no destination revision.
            if diff.rev2 == 0 {
                if let Some(revision) = self.revision(&diff.name)? {
                    diff.rev2 = revision;
                }
            }
            diff.redact(&self.redaction);
        }
        Ok(diffs)
    }

    /// Refresh this tree's copy of the given page from the upstream history.
    ///
    /// This is used to sync a read tree after a write tree commits, and to
    /// pull in out-of-band external changes.
    ///
    /// # Errors
    /// - `Error::Command`: The update subcommand failed.
    pub fn update(&self, name: &PageName) -> crate::Result<()> {
        let file = self.store.file_name(name);
        self.run(&["update", "-A", &file])?.check()?;
        self.invalidate_entries();
        Ok(())
    }

    /// Commit `text` as the next revision of the given page.
    ///
    /// The whole operation holds the page's writer lock. A page that does
    /// not exist in this tree is written, registered, and committed as new.
    /// An existing page committed with no `base` revision is overwritten
    /// (last writer wins). An existing page committed with a `base` revision
    /// is three-way merged against the upstream head when the head has moved
    /// past `base`.
    ///
    /// When `paired` is given, that tree is refreshed from the new revision
    /// before the page lock is released, so outside observers never see the
    /// paired read tree behind a finished commit.
    ///
    /// Returns the revision the commit created.
    ///
    /// # Errors
    /// - `Error::Conflict`: The merge produced conflicts. The working file
    /// is reset to the upstream head, and the error carries the
    /// conflict-marked merged text and the head revision.
    /// - `Error::Locked`: A rival writer held the page lock for the whole
    /// retry window.
    /// - `Error::Command`: A subcommand failed.
    pub fn commit(
        &self,
        name: &PageName,
        base: Option<u32>,
        text: &str,
        paired: Option<&WorkingCopy>,
    ) -> crate::Result<u32> {
        self.store.with_lock(name, || {
            let file = self.store.file_name(name);

            if !self.store.exists(name) {
                // The page may exist upstream while this tree is stale. The
                // status is not checked; updating a genuinely unknown file
                // only warns.
                self.run(&["update", "-A", &file])?;
                self.invalidate_entries();
            }

            if !self.store.exists(name) {
                self.store.atomic_write(name, text.as_bytes())?;
                self.run(&["add", "-ko", &file])?.check()?;
                self.commit_file(&file)?;
            } else if let Some(base) = base {
                self.merge_commit(name, &file, base, text)?;
            } else {
                // Last writer wins when the caller carries no base revision.
                self.run(&["update", "-A", &file])?.check()?;
                self.invalidate_entries();
                self.store.atomic_write(name, text.as_bytes())?;
                self.commit_file(&file)?;
            }

            self.invalidate_entries();
            if let Some(paired) = paired {
                paired.update(name)?;
            }
            self.revision(name)?
                .ok_or_else(|| crate::Error::Parse("committed page has no revision".to_string()))
        })
    }

    /// Commit `text` against `base`, merging when the head has moved.
    fn merge_commit(
        &self,
        name: &PageName,
        file: &str,
        base: u32,
        text: &str,
    ) -> crate::Result<()> {
        // Sync to the upstream head before observing it.
        self.run(&["update", "-A", file])?.check()?;
        self.invalidate_entries();
        let head = self.revision(name)?.ok_or(crate::Error::NotFound)?;

        self.store.atomic_write(name, text.as_bytes())?;

        if head == base {
            return self.commit_file(file);
        }

        // The new text descends from `base`, so folding the base-to-head
        // delta into it is a three-way merge with `base` as the ancestor.
        let base_arg = format!("-j{}", format_revision(base));
        let head_arg = format!("-j{}", format_revision(head));
        let merge_output = self.run(&["update", &base_arg, &head_arg, file])?.check()?;

        let merged = self.store.read(name)?;
        let conflicted = merged
            .lines()
            .any(|line| line.starts_with(CONFLICT_MARKER))
            || merge_output.stderr.contains("conflicts during merge");

        if conflicted {
            // Reset the working file to the upstream head so the next
            // writer does not start from the conflict markers.
            self.store.remove(name)?;
            self.run(&["update", "-A", file])?.check()?;
            self.invalidate_entries();
            return Err(crate::Error::Conflict {
                text: merged,
                revision: head,
            });
        }

        self.commit_file(file)
    }

    /// Commit the working file with the fixed page-edit message.
    fn commit_file(&self, file: &str) -> crate::Result<()> {
        self.run(&["commit", "-m", COMMIT_MESSAGE, file])?.check()?;
        Ok(())
    }

    /// Return the parsed revision bookkeeping table, memoized per request.
    fn entries(&self) -> crate::Result<Rc<EntriesTable>> {
        self.cache.get_or_compute(&self.entries_key(), || {
            let path = self.store.root().join(ADMIN_DIR).join(ENTRIES_FILE);
            match fs::read_to_string(path) {
                Ok(text) => EntriesTable::parse(&text),
                Err(error) if error.kind() == ErrorKind::NotFound => Ok(EntriesTable::default()),
                Err(error) => Err(error.into()),
            }
        })
    }

    /// Drop the memoized revision table after a commit or update.
    fn invalidate_entries(&self) {
        self.cache.invalidate_prefix(&self.entries_key());
    }

    /// Return the request cache key of this tree's revision table.
    fn entries_key(&self) -> String {
        format!("entries:{}", self.store.root().display())
    }

    /// Run the version control binary in this tree.
    fn run(&self, args: &[&str]) -> crate::Result<CommandOutput> {
        run_command(&self.binary, args, self.store.root())
    }

    /// Run the version control binary with owned arguments.
    fn run_args(&self, args: &[String]) -> crate::Result<CommandOutput> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&args)
    }
}
