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

use std::cell::Cell;

use wiki_store::cache::RequestCache;
use wiki_store::Error;

#[test]
fn computes_on_miss_and_memoizes() -> anyhow::Result<()> {
    let cache = RequestCache::new();
    let calls = Cell::new(0);

    let compute = || {
        calls.set(calls.get() + 1);
        Ok(String::from("value"))
    };

    assert_eq!(*cache.get_or_compute("key", compute)?, "value");
    assert_eq!(*cache.get_or_compute("key", compute)?, "value");
    assert_eq!(calls.get(), 1);
    Ok(())
}

#[test]
fn failed_computations_are_not_cached() -> anyhow::Result<()> {
    let cache = RequestCache::new();

    let result: wiki_store::Result<std::rc::Rc<String>> =
        cache.get_or_compute("key", || Err(Error::NotFound));
    assert!(result.is_err());

    let value = cache.get_or_compute("key", || Ok(String::from("value")))?;
    assert_eq!(*value, "value");
    Ok(())
}

#[test]
fn repeated_lookups_return_the_same_instance() -> anyhow::Result<()> {
    let cache = RequestCache::new();

    let first = cache.get_or_compute("key", || Ok(String::from("value")))?;
    let second = cache.get_or_compute("key", || Ok(String::from("other")))?;

    assert!(std::rc::Rc::ptr_eq(&first, &second));
    Ok(())
}

#[test]
fn invalidating_a_prefix_keeps_other_keys() -> anyhow::Result<()> {
    let cache = RequestCache::new();

    cache.get_or_compute("entries:/read", || Ok(1u32))?;
    cache.get_or_compute("entries:/write", || Ok(2u32))?;
    cache.get_or_compute("page:FrontPage", || Ok(3u32))?;

    cache.invalidate_prefix("entries:");

    assert!(cache.get::<u32>("entries:/read").is_none());
    assert!(cache.get::<u32>("entries:/write").is_none());
    assert_eq!(cache.get::<u32>("page:FrontPage").as_deref(), Some(&3));
    Ok(())
}

#[test]
fn invalidating_all_empties_the_cache() -> anyhow::Result<()> {
    let cache = RequestCache::new();

    cache.get_or_compute("one", || Ok(1u32))?;
    cache.get_or_compute("two", || Ok(2u32))?;
    assert_eq!(cache.len(), 2);

    cache.invalidate_all();

    assert!(cache.is_empty());
    Ok(())
}

#[test]
fn computations_may_use_the_cache_recursively() -> anyhow::Result<()> {
    let cache = RequestCache::new();

    let outer = cache.get_or_compute("outer", || {
        let inner = cache.get_or_compute("inner", || Ok(2u32))?;
        Ok(*inner * 2)
    })?;

    assert_eq!(*outer, 4);
    assert_eq!(cache.get::<u32>("inner").as_deref(), Some(&2));
    Ok(())
}
