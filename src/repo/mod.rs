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

//! The top-level page repository.
//!
//! A [`Repository`] coordinates a read-only working copy for lookups and a
//! write working copy for commits, plus the link cache that tracks which
//! page links to which. Open one with a [`RepoConfig`]:
//!
//! ```no_run
//! use wiki_store::repo::{RepoConfig, Repository};
//!
//! fn main() -> wiki_store::Result<()> {
//!     let config = RepoConfig::new("/var/lib/wiki/read", "/var/lib/wiki/cache")
//!         .write_root("/var/lib/wiki/write");
//!     let repo = Repository::open(config)?;
//!
//!     let page = repo.fetch("FrontPage")?;
//!     let revision = page.checkin(None, "hello, world\n")?;
//!     assert_eq!(repo.get("FrontPage")?.revision(), Some(revision));
//!
//!     repo.finish_request();
//!     Ok(())
//! }
//! ```
//!
//! # Consistency
//! Within one page name, commits are totally ordered by the per-page
//! writer lock; across page names nothing is ordered. The read tree is
//! only guaranteed consistent with a write immediately after that write's
//! sync; a repository that never writes may observe stale revisions until
//! [`updated_externally`] reconciles it.
//!
//! [`updated_externally`]: crate::repo::Repository::updated_externally

pub use self::config::RepoConfig;
pub use self::notify::{Notifier, NullNotifier};
pub use self::page::{Page, PageState};
pub use self::repository::Repository;

mod config;
mod notify;
mod page;
mod repository;
