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

//! The file layer under a working tree.
//!
//! This module maps logical page names to files inside one root directory
//! and provides the two primitives every mutation in this crate is funneled
//! through:
//!
//! - [`PageStore::atomic_write`] stages new content in a sibling file and
//! renames it over the destination, so a page file is always fully-old or
//! fully-new.
//! - [`PageStore::with_lock`] serializes writers per page name with a
//! directory-as-mutex next to the page file. Lock acquisition retries a
//! bounded number of times and then fails; it never waits indefinitely.
//!
//! Name-to-path mapping is pluggable through [`PathEncoding`] so that
//! repositories can live on case-insensitive file systems without page name
//! collisions.

pub use self::encoding::{CaseInsensitiveEncoding, CaseSensitiveEncoding, PathEncoding};
pub use self::lock::{DirLock, LOCK_RETRIES, LOCK_WAIT};
pub use self::page_store::PageStore;

mod encoding;
mod lock;
mod page_store;
