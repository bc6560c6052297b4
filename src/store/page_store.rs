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

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use uuid::Uuid;

use super::encoding::PathEncoding;
use super::lock::DirLock;
use crate::name::PageName;

/// Map an I/O error on a page file to a repository error.
fn file_error(error: std::io::Error) -> crate::Error {
    if error.kind() == ErrorKind::NotFound {
        crate::Error::NotFound
    } else {
        error.into()
    }
}

/// A flat directory of page files.
///
/// A `PageStore` maps logical page names to paths inside one root directory
/// and provides the file primitives the rest of the crate is built on:
/// atomic writes and an advisory per-page writer lock. Read access never
/// locks; only writers contend.
#[derive(Debug, Clone)]
pub struct PageStore {
    /// The root directory holding one file per page.
    root: PathBuf,
    /// The scheme used to map page names to file names.
    encoding: Arc<dyn PathEncoding>,
}

impl PageStore {
    /// Create a new `PageStore` rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, encoding: Arc<dyn PathEncoding>) -> Self {
        Self {
            root: root.into(),
            encoding,
        }
    }

    /// Return the root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the name-to-path encoding this store uses.
    pub fn encoding(&self) -> &Arc<dyn PathEncoding> {
        &self.encoding
    }

    /// Return the file name for the given page name.
    pub fn file_name(&self, name: &PageName) -> String {
        self.encoding.encode(name)
    }

    /// Return the path where the given page is stored.
    pub fn resolve(&self, name: &PageName) -> PathBuf {
        self.root.join(self.file_name(name))
    }

    /// Return whether a file for the given page exists.
    pub fn exists(&self, name: &PageName) -> bool {
        self.resolve(name).is_file()
    }

    /// Return whether the given page's file can be opened for reading.
    pub fn readable(&self, name: &PageName) -> bool {
        File::open(self.resolve(name)).is_ok()
    }

    /// Return whether the given page's file can be opened for writing.
    pub fn writable(&self, name: &PageName) -> bool {
        OpenOptions::new()
            .write(true)
            .open(self.resolve(name))
            .is_ok()
    }

    /// Return the contents of the given page's file.
    ///
    /// # Errors
    /// - `Error::NotFound`: The page has no file.
    /// - `Error::Io`: An I/O error occurred.
    pub fn read(&self, name: &PageName) -> crate::Result<String> {
        fs::read_to_string(self.resolve(name)).map_err(file_error)
    }

    /// Return the contents of the given page's file as raw bytes.
    ///
    /// # Errors
    /// - `Error::NotFound`: The page has no file.
    /// - `Error::Io`: An I/O error occurred.
    pub fn read_bytes(&self, name: &PageName) -> crate::Result<Vec<u8>> {
        fs::read(self.resolve(name)).map_err(file_error)
    }

    /// Return the lines of the given page's file, without line terminators.
    ///
    /// # Errors
    /// - `Error::NotFound`: The page has no file.
    /// - `Error::Io`: An I/O error occurred.
    pub fn read_lines(&self, name: &PageName) -> crate::Result<Vec<String>> {
        Ok(self.read(name)?.lines().map(String::from).collect())
    }

    /// Write `bytes` to the given page's file, truncating any existing file.
    ///
    /// Unlike [`atomic_write`], an interrupted write can leave the file
    /// partially written.
    ///
    /// [`atomic_write`]: crate::store::PageStore::atomic_write
    pub fn write(&self, name: &PageName, bytes: &[u8]) -> crate::Result<()> {
        fs::write(self.resolve(name), bytes)?;
        Ok(())
    }

    /// Return the modification time of the given page's file.
    ///
    /// # Errors
    /// - `Error::NotFound`: The page has no file.
    /// - `Error::Io`: An I/O error occurred.
    pub fn stat(&self, name: &PageName) -> crate::Result<SystemTime> {
        let metadata = fs::metadata(self.resolve(name)).map_err(file_error)?;
        Ok(metadata.modified()?)
    }

    /// Remove the given page's file.
    ///
    /// # Errors
    /// - `Error::NotFound`: The page has no file.
    /// - `Error::Io`: An I/O error occurred.
    pub fn remove(&self, name: &PageName) -> crate::Result<()> {
        fs::remove_file(self.resolve(name)).map_err(file_error)
    }

    /// Atomically replace the given page's file with `bytes`.
    ///
    /// The bytes are written to a sibling staging file in the same directory
    /// and then renamed over the destination. After this call the
    /// destination holds either its old contents or the new `bytes` in full,
    /// never a partial write. On any failure before the rename, the staging
    /// file is removed and the destination is untouched.
    ///
    /// This is the sole durability guarantee the rest of the crate relies
    /// on.
    pub fn atomic_write(&self, name: &PageName, bytes: &[u8]) -> crate::Result<()> {
        let path = self.resolve(name);
        let staging_path = self
            .root
            .join(format!(".{},{}", self.file_name(name), Uuid::new_v4()));

        let result = (|| -> crate::Result<()> {
            let mut staging_file = File::create(&staging_path)?;
            staging_file.write_all(bytes)?;
            staging_file.sync_all()?;
            Ok(())
        })();

        if let Err(error) = result {
            let _ = fs::remove_file(&staging_path);
            return Err(error);
        }

        if let Err(error) = fs::rename(&staging_path, &path) {
            let _ = fs::remove_file(&staging_path);
            return Err(error.into());
        }

        Ok(())
    }

    /// Return the path of the lock directory for the given page.
    pub fn lock_path(&self, name: &PageName) -> PathBuf {
        self.root.join(format!("{},lock", self.file_name(name)))
    }

    /// Run `body` while holding the given page's writer lock.
    ///
    /// The lock is released when `body` returns, whether it succeeds or
    /// fails.
    ///
    /// # Errors
    /// - `Error::Locked`: The lock was held by a rival writer for the whole
    /// retry window.
    /// - `Error::Io`: An I/O error occurred.
    pub fn with_lock<T, F>(&self, name: &PageName, body: F) -> crate::Result<T>
    where
        F: FnOnce() -> crate::Result<T>,
    {
        let _lock = DirLock::acquire(self.lock_path(name))?;
        body()
    }

    /// Return the names of all pages with a file in this store.
    ///
    /// Files whose names this store's encoding does not produce, such as
    /// staging files and lock directories, are skipped.
    pub fn pages(&self) -> crate::Result<Vec<PageName>> {
        let mut names = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let file_name = match file_name.to_str() {
                Some(file_name) => file_name,
                None => continue,
            };
            if let Some(name) = self.encoding.decode(file_name) {
                names.push(name);
            }
        }

        Ok(names)
    }
}
