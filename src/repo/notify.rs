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
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::cache::RequestCache;
use crate::name::PageName;
use crate::redaction::RedactionList;
use crate::store::PageStore;
use crate::vcs::{Diff, WorkingCopy};

/// How long a notification waits before recomputing the committed diff.
///
/// The committer may still hold the version control lock when the
/// notification task starts; racing it would make the diff fail spuriously.
const NOTIFY_DELAY: Duration = Duration::from_secs(1);

/// A collaborator that delivers change notifications.
///
/// Notification is fire-and-forget: the repository hands over the diff of
/// the just-committed revision on a background thread and swallows every
/// failure, so a broken notifier can never block or fail a commit.
pub trait Notifier: Debug + Send + Sync {
    /// Deliver a notification for the given `diff`.
    fn notify(&self, diff: &Diff) -> anyhow::Result<()>;
}

/// A `Notifier` that discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _diff: &Diff) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Spawn a detached background thread that notifies about a committed
/// revision.
///
/// The thread builds its own working copy over `store` with a fresh request
/// cache; the committing request's cache belongs to that request alone.
/// Errors are logged and swallowed.
pub(crate) fn spawn_notify(
    notifier: Arc<dyn Notifier>,
    binary: PathBuf,
    store: PageStore,
    redaction: Arc<RedactionList>,
    name: PageName,
    revision: u32,
) {
    thread::spawn(move || {
        thread::sleep(NOTIFY_DELAY);

        let copy = WorkingCopy::new(binary, store, redaction, Rc::new(RequestCache::new()));
        let result: anyhow::Result<()> = (|| {
            let diff = committed_diff(&copy, &name, revision)?;
            notifier.notify(&diff)
        })();

        if let Err(error) = result {
            log::warn!(
                target: "wiki_store::repo",
                "change notification for {} failed: {:#}",
                name,
                error
            );
        }
    });
}

/// Compute the diff describing the commit that created `revision`.
///
/// The first revision of a page has nothing to diff against; its full
/// content stands in for the diff text.
fn committed_diff(copy: &WorkingCopy, name: &PageName, revision: u32) -> crate::Result<Diff> {
    if revision > 1 {
        copy.diff(name, revision - 1, revision)
    } else {
        Ok(Diff {
            name: name.clone(),
            rev1: 0,
            rev2: revision,
            time1: None,
            time2: copy.mtime(name)?,
            text: copy.read_at_revision(name, revision)?,
            killed: copy.is_redacted(name, revision),
        })
    }
}
