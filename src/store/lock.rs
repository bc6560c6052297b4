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
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

/// The number of attempts to acquire a lock before giving up.
pub const LOCK_RETRIES: u32 = 5;

/// How long to wait between lock acquisition attempts.
pub const LOCK_WAIT: Duration = Duration::from_secs(3);

/// An advisory lock backed by a directory.
///
/// Creating a directory is atomic on every file system the working tree can
/// live on, so the directory doubles as a mutex between processes. The lock
/// is released when this value is dropped, on both the normal and the error
/// exit path.
#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
}

impl DirLock {
    /// Acquire the lock directory at `path` with the default retry budget.
    ///
    /// # Errors
    /// - `Error::Locked`: The lock was held by a rival for all
    /// [`LOCK_RETRIES`] attempts, spaced [`LOCK_WAIT`] apart.
    /// - `Error::Io`: An I/O error occurred.
    pub fn acquire(path: impl Into<PathBuf>) -> crate::Result<Self> {
        Self::acquire_with(path, LOCK_RETRIES, LOCK_WAIT)
    }

    /// Acquire the lock directory at `path`, retrying `retries` times and
    /// sleeping `wait` after each failed attempt.
    pub fn acquire_with(
        path: impl Into<PathBuf>,
        retries: u32,
        wait: Duration,
    ) -> crate::Result<Self> {
        let path = path.into();

        for _ in 0..retries {
            match fs::create_dir(&path) {
                Ok(()) => return Ok(Self { path }),
                Err(error) if error.kind() == ErrorKind::AlreadyExists => sleep(wait),
                Err(error) => return Err(error.into()),
            }
        }

        Err(crate::Error::Locked)
    }

    /// Return the path of the lock directory.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_dir(&self.path) {
            log::warn!(
                target: "wiki_store::store",
                "failed to release lock {}: {}",
                self.path.display(),
                error
            );
        }
    }
}
