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

//! The on-disk cache of page links and backlinks.
//!
//! Each page's forward-link set and each page's backlink set are stored as
//! one MessagePack record each, under two independently namespaced flat
//! directories built on the same [`PageStore`] mechanism. A missing record
//! reads as "not yet computed", which is distinct from "computed empty";
//! callers use the difference to decide whether to recompute a page's links
//! from its source text.
//!
//! The two sets must stay consistent: whenever a page's stored forward
//! links change from set `A` to set `B`, every name in `B - A` gains that
//! page as a backlinker and every name in `A - B` loses it. [`update`]
//! applies the whole delta inside one held lock so that it is atomic
//! relative to other concurrent link updates.
//!
//! [`update`]: crate::links::LinkCache::update

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use rmp_serde::{from_read, to_vec};

use crate::name::PageName;
use crate::store::{DirLock, PageStore, PathEncoding};

/// The sub-directory holding one forward-link record per page.
const FORWARD_DIR: &str = "forward";

/// The sub-directory holding one backlink record per page.
const REVERSE_DIR: &str = "reverse";

/// The directory-as-mutex serializing link cache mutations.
const LOCK_DIR: &str = "links,lock";

/// Matches a `[[PageName]]` link in page source text.
static BRACKET_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").unwrap());

/// A collaborator that extracts page links from page source text.
///
/// The wiki-markup compiler is outside this crate, so the repository
/// receives link extraction as an injected collaborator.
pub trait LinkExtractor: Debug + Send + Sync {
    /// Return the set of page names referenced by `source`.
    fn extract(&self, source: &str) -> BTreeSet<PageName>;
}

/// A `LinkExtractor` for `[[PageName]]` bracket links.
///
/// Bracketed text that is not a valid page name is not a link.
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketLinkExtractor;

impl LinkExtractor for BracketLinkExtractor {
    fn extract(&self, source: &str) -> BTreeSet<PageName> {
        BRACKET_LINK
            .captures_iter(source)
            .filter_map(|captures| PageName::new(&captures[1]).ok())
            .collect()
    }
}

/// The on-disk forward-link and backlink cache.
#[derive(Debug)]
pub struct LinkCache {
    /// The forward namespace, one record per linking page.
    forward: PageStore,
    /// The reverse namespace, one record per linked-to page.
    reverse: PageStore,
    /// The path of the mutation lock directory.
    lock_path: PathBuf,
}

impl LinkCache {
    /// Create a new `LinkCache` under the directory `root`.
    ///
    /// The namespace sub-directories are created if they do not exist.
    ///
    /// # Errors
    /// - `Error::Io`: An I/O error occurred.
    pub fn new(root: &Path, encoding: Arc<dyn PathEncoding>) -> crate::Result<Self> {
        let forward_dir = root.join(FORWARD_DIR);
        let reverse_dir = root.join(REVERSE_DIR);
        fs::create_dir_all(&forward_dir)?;
        fs::create_dir_all(&reverse_dir)?;

        Ok(Self {
            forward: PageStore::new(forward_dir, Arc::clone(&encoding)),
            reverse: PageStore::new(reverse_dir, encoding),
            lock_path: root.join(LOCK_DIR),
        })
    }

    /// Return the cached forward links of the given page.
    ///
    /// This returns `None` if the page's links have not been computed yet;
    /// a page computed to link nowhere returns an empty set.
    pub fn links(&self, name: &PageName) -> crate::Result<Option<BTreeSet<PageName>>> {
        self.read_record(&self.forward, name)
    }

    /// Return the cached backlinks of the given page.
    ///
    /// This returns `None` if no linking page has been indexed yet.
    pub fn backlinks(&self, name: &PageName) -> crate::Result<Option<BTreeSet<PageName>>> {
        self.read_record(&self.reverse, name)
    }

    /// Store the given page's forward links and apply the backlink delta.
    ///
    /// Every page newly linked to gains `name` as a backlinker; every page
    /// no longer linked to loses it. The whole batch runs inside one held
    /// lock, so it is atomic relative to other concurrent link updates.
    ///
    /// # Errors
    /// - `Error::Locked`: A rival mutation held the cache lock for the
    /// whole retry window.
    /// - `Error::Io`: An I/O error occurred.
    pub fn update(&self, name: &PageName, links: &BTreeSet<PageName>) -> crate::Result<()> {
        let _lock = DirLock::acquire(&self.lock_path)?;

        let old = self.links(name)?.unwrap_or_default();
        self.write_record(&self.forward, name, links)?;

        for target in links.difference(&old) {
            self.apply_backlink(target, name, true)?;
        }
        for target in old.difference(links) {
            self.apply_backlink(target, name, false)?;
        }

        Ok(())
    }

    /// Record that page `from` links to page `name`.
    pub fn add_backlink(&self, name: &PageName, from: &PageName) -> crate::Result<()> {
        let _lock = DirLock::acquire(&self.lock_path)?;
        self.apply_backlink(name, from, true)
    }

    /// Record that page `from` no longer links to page `name`.
    pub fn remove_backlink(&self, name: &PageName, from: &PageName) -> crate::Result<()> {
        let _lock = DirLock::acquire(&self.lock_path)?;
        self.apply_backlink(name, from, false)
    }

    /// Return every page with a computed forward-link record.
    pub fn entries(&self) -> crate::Result<Vec<(PageName, BTreeSet<PageName>)>> {
        let mut entries = Vec::new();
        for name in self.forward.pages()? {
            if let Some(links) = self.links(&name)? {
                entries.push((name, links));
            }
        }
        Ok(entries)
    }

    /// Drop every record from both namespaces.
    ///
    /// After this call every page reads as "not yet computed".
    pub fn clear(&self) -> crate::Result<()> {
        let _lock = DirLock::acquire(&self.lock_path)?;
        for store in [&self.forward, &self.reverse] {
            for name in store.pages()? {
                store.remove(&name)?;
            }
        }
        Ok(())
    }

    /// Add or remove `from` in the backlink record of `name`.
    ///
    /// The caller must hold the cache lock.
    fn apply_backlink(&self, name: &PageName, from: &PageName, add: bool) -> crate::Result<()> {
        let mut backlinks = self.read_record(&self.reverse, name)?.unwrap_or_default();
        if add {
            backlinks.insert(from.clone());
        } else {
            backlinks.remove(from);
        }
        self.write_record(&self.reverse, name, &backlinks)
    }

    /// Read one namespace record, or `None` if it has not been written.
    fn read_record(
        &self,
        store: &PageStore,
        name: &PageName,
    ) -> crate::Result<Option<BTreeSet<PageName>>> {
        let bytes = match store.read_bytes(name) {
            Ok(bytes) => bytes,
            Err(crate::Error::NotFound) => return Ok(None),
            Err(error) => return Err(error),
        };
        from_read(bytes.as_slice())
            .map(Some)
            .map_err(|error| crate::Error::Parse(format!("corrupt link record: {}", error)))
    }

    /// Atomically replace one namespace record.
    fn write_record(
        &self,
        store: &PageStore,
        name: &PageName,
        links: &BTreeSet<PageName>,
    ) -> crate::Result<()> {
        let bytes = to_vec(links)
            .map_err(|error| crate::Error::Parse(format!("unwritable link record: {}", error)))?;
        store.atomic_write(name, &bytes)
    }
}
