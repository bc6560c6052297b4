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

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

/// A request-scoped memoization cache.
///
/// This cache remembers process-local facts for the duration of one unit of
/// work: the parsed revision table of a working copy, the version string of
/// the external version control binary, and page entities constructed during
/// the request. Those facts become stale across requests, so one
/// `RequestCache` must never be shared between concurrent units of work.
/// This type is intentionally `!Sync`; a cache belongs to exactly one
/// request, and the request boundary calls [`invalidate_all`] on exit.
///
/// [`invalidate_all`]: crate::cache::RequestCache::invalidate_all
#[derive(Default)]
pub struct RequestCache {
    values: RefCell<HashMap<String, Rc<dyn Any>>>,
}

impl RequestCache {
    /// Create a new empty `RequestCache`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, computing and caching it if absent.
    ///
    /// The `compute` closure is only called on a cache miss. If it fails,
    /// nothing is cached and the error is returned. The closure may itself
    /// use this cache; the cache is not borrowed while it runs.
    ///
    /// A cached value is only returned if it has the requested type;
    /// otherwise it is recomputed.
    pub fn get_or_compute<T, F>(&self, key: &str, compute: F) -> crate::Result<Rc<T>>
    where
        T: 'static,
        F: FnOnce() -> crate::Result<T>,
    {
        let cached = self.values.borrow().get(key).cloned();
        if let Some(value) = cached {
            if let Ok(value) = value.downcast::<T>() {
                return Ok(value);
            }
        }

        let value = Rc::new(compute()?);
        self.values
            .borrow_mut()
            .insert(key.to_string(), Rc::clone(&value) as Rc<dyn Any>);
        Ok(value)
    }

    /// Return the cached value for `key` if one exists with type `T`.
    pub fn get<T: 'static>(&self, key: &str) -> Option<Rc<T>> {
        let value = self.values.borrow().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Drop every cached value.
    ///
    /// The top-level request handler calls this on exit, success or failure,
    /// so that no memory or stale state leaks across requests.
    pub fn invalidate_all(&self) {
        self.values.borrow_mut().clear();
    }

    /// Drop every cached value whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.values
            .borrow_mut()
            .retain(|key, _| !key.starts_with(prefix));
    }

    /// Return the number of cached values.
    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    /// Return whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}

impl Debug for RequestCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let values = self.values.borrow();
        f.debug_struct("RequestCache")
            .field("keys", &values.keys().collect::<Vec<_>>())
            .finish()
    }
}
