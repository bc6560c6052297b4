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
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::config::RepoConfig;
use super::notify::{spawn_notify, Notifier, NullNotifier};
use super::page::{Page, PageState};
use crate::cache::RequestCache;
use crate::links::{BracketLinkExtractor, LinkCache, LinkExtractor};
use crate::name::PageName;
use crate::redaction::RedactionList;
use crate::store::PageStore;
use crate::vcs::{Diff, WorkingCopy};

/// A version-controlled wiki page repository.
///
/// The repository coordinates one read-only working copy, one write working
/// copy unless configured read-only, and the link cache pair. Reads hand
/// back [`Page`] handles backed by the read tree; writes go through the
/// write tree and then sync the read tree, update the link cache, and fire
/// an asynchronous change notification.
///
/// A repository carries the request-scoped cache for one unit of work, so
/// it must not be shared across concurrent requests. Construct one per
/// request, or call [`finish_request`] at each request boundary.
///
/// [`finish_request`]: crate::repo::Repository::finish_request
pub struct Repository {
    config: RepoConfig,
    read: WorkingCopy,
    write: Option<WorkingCopy>,
    links: LinkCache,
    cache: Rc<RequestCache>,
    redaction: Arc<RedactionList>,
    notifier: Arc<dyn Notifier>,
    extractor: Arc<dyn LinkExtractor>,
}

impl Repository {
    /// Open a repository with the given configuration.
    ///
    /// # Errors
    /// - `Error::Config`: The configuration is missing or contradictory.
    /// - `Error::InvalidRedactionList`: The redaction list file is
    /// malformed.
    /// - `Error::Io`: An I/O error occurred.
    pub fn open(config: RepoConfig) -> crate::Result<Self> {
        config.validate()?;

        let encoding = config.encoding();
        let redaction = Arc::new(match &config.redaction_file {
            Some(path) => RedactionList::load(path)?,
            None => RedactionList::new(),
        });
        let cache = Rc::new(RequestCache::new());

        let read = WorkingCopy::new(
            &config.vcs_binary,
            PageStore::new(&config.read_root, Arc::clone(&encoding)),
            Arc::clone(&redaction),
            Rc::clone(&cache),
        );
        let write = config.write_root.as_ref().map(|root| {
            WorkingCopy::new(
                &config.vcs_binary,
                PageStore::new(root, Arc::clone(&encoding)),
                Arc::clone(&redaction),
                Rc::clone(&cache),
            )
        });
        let links = LinkCache::new(&config.cache_dir, encoding)?;

        Ok(Self {
            config,
            read,
            write,
            links,
            cache,
            redaction,
            notifier: Arc::new(NullNotifier),
            extractor: Arc::new(BracketLinkExtractor),
        })
    }

    /// Deliver change notifications through the given collaborator.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Extract page links with the given collaborator.
    pub fn with_link_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Return whether this repository rejects checkins.
    pub fn read_only(&self) -> bool {
        self.write.is_none()
    }

    /// Return whether the given page exists.
    ///
    /// A page only exists if its file is present, readable, and writable in
    /// the read tree. A present but read-only file is deliberately not an
    /// existing page; see [`editable`].
    ///
    /// [`editable`]: crate::repo::Repository::editable
    pub fn exists(&self, name: &PageName) -> bool {
        let store = self.read.store();
        store.exists(name) && store.readable(name) && store.writable(name)
    }

    /// Return whether an edit of the given page may proceed.
    ///
    /// A page that does not exist may be created; a present page must be
    /// readable and writable. This is what distinguishes "create the page"
    /// from "reject the edit" when [`exists`] is false.
    ///
    /// [`exists`]: crate::repo::Repository::exists
    pub fn editable(&self, name: &PageName) -> bool {
        let store = self.read.store();
        !store.exists(name) || (store.readable(name) && store.writable(name))
    }

    /// Return a handle to the given page.
    ///
    /// # Errors
    /// - `Error::InvalidName`: The name is not a valid page name.
    /// - `Error::NotFound`: The page does not exist.
    pub fn get(&self, name: &str) -> crate::Result<Page> {
        let name = PageName::new(name)?;
        if !self.exists(&name) {
            return Err(crate::Error::NotFound);
        }
        self.page(name)
    }

    /// Return a handle to the given page whether or not it exists.
    ///
    /// This is the entry point for "new page" editing flows; only the name
    /// syntax is checked.
    ///
    /// # Errors
    /// - `Error::InvalidName`: The name is not a valid page name.
    pub fn fetch(&self, name: &str) -> crate::Result<Page> {
        self.page(PageName::new(name)?)
    }

    /// Commit `text` as the next revision of the given page.
    ///
    /// On success the read tree is synced to the new revision, the link
    /// cache is updated with the page's new forward links, and a change
    /// notification is fired on a background thread. Notification failures
    /// never reach the caller.
    ///
    /// Returns the revision the commit created.
    ///
    /// # Errors
    /// - `Error::Config`: The repository is read-only.
    /// - `Error::Conflict`: The edit conflicts with a concurrent commit.
    /// - `Error::Locked`: A rival writer held the page lock for the whole
    /// retry window.
    /// - `Error::Command`: A version control subcommand failed.
    pub fn checkin(&self, name: &PageName, base: Option<u32>, text: &str) -> crate::Result<u32> {
        let write = self.write.as_ref().ok_or_else(|| {
            crate::Error::Config("the repository is read-only".to_string())
        })?;

        // The read tree is synced inside the held page lock, so a finished
        // commit is immediately visible to readers.
        let revision = write.commit(name, base, text, Some(&self.read))?;
        self.cache.invalidate_prefix(&format!("page:{}", name));

        self.links.update(name, &self.extractor.extract(text))?;

        spawn_notify(
            Arc::clone(&self.notifier),
            self.config.vcs_binary.clone(),
            self.read.store().clone(),
            Arc::clone(&self.redaction),
            name.clone(),
            revision,
        );

        Ok(revision)
    }

    /// Reconcile both trees after the page changed outside this process.
    ///
    /// This is the entry point for out-of-band commits, such as an external
    /// commit script. Both trees are refreshed from the upstream history
    /// and the page's links are recomputed.
    ///
    /// # Errors
    /// - `Error::NotFound`: The page vanished mid-update.
    pub fn updated_externally(&self, name: &PageName) -> crate::Result<()> {
        self.read.update(name)?;
        if let Some(write) = &self.write {
            write.update(name)?;
        }
        self.cache.invalidate_prefix(&format!("page:{}", name));

        if !self.read.store().exists(name) {
            return Err(crate::Error::NotFound);
        }

        let source = self.read.read(name)?;
        self.links.update(name, &self.extractor.extract(&source))?;
        Ok(())
    }

    /// Return one diff per page changed since the given time.
    ///
    /// This backs "recent changes" feeds.
    pub fn diff_since(&self, since: DateTime<Utc>) -> crate::Result<Vec<Diff>> {
        self.read.diff_since(since)
    }

    /// Return the pages the given page links to.
    ///
    /// A page whose links have not been computed yet has them computed from
    /// its source text and stored.
    pub fn links_of(&self, name: &PageName) -> crate::Result<BTreeSet<PageName>> {
        if let Some(links) = self.links.links(name)? {
            return Ok(links);
        }
        if !self.read.store().exists(name) {
            return Ok(BTreeSet::new());
        }

        let links = self.extractor.extract(&self.read.read(name)?);
        self.links.update(name, &links)?;
        Ok(links)
    }

    /// Return the pages that link to the given page.
    pub fn backlinks_of(&self, name: &PageName) -> crate::Result<BTreeSet<PageName>> {
        Ok(self.links.backlinks(name)?.unwrap_or_default())
    }

    /// Recompute the whole link cache from every page's source text.
    pub fn rebuild_link_cache(&self) -> crate::Result<()> {
        self.links.clear()?;
        for name in self.read.store().pages()? {
            let links = self.extractor.extract(&self.read.read(&name)?);
            self.links.update(&name, &links)?;
        }
        Ok(())
    }

    /// Drop all request-scoped state.
    ///
    /// The request boundary must call this on exit, success or failure;
    /// the cache remembers process-local facts that become stale across
    /// requests.
    pub fn finish_request(&self) {
        self.cache.invalidate_all();
    }

    /// Return the working copy reads go through.
    pub(crate) fn read_copy(&self) -> &WorkingCopy {
        &self.read
    }

    /// Return the memoized page entity for `name`.
    fn page(&self, name: PageName) -> crate::Result<Page> {
        let key = format!("page:{}", name);
        let state = self.cache.get_or_compute(&key, || {
            Ok(PageState {
                revision: self.read.revision(&name)?,
                mtime: self.read.mtime(&name)?,
                name: name.clone(),
                backlinks: RefCell::new(None),
            })
        })?;
        Ok(Page::new(self, state))
    }
}

impl Debug for Repository {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("read_root", &self.config.read_root)
            .field("write_root", &self.config.write_root)
            .field("cache_dir", &self.config.cache_dir)
            .finish()
    }
}
