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

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::ensure;
use tempfile::TempDir;

use wiki_store::repo::RepoConfig;

/// The version control binary the end-to-end tests drive.
pub const VCS_BINARY: &str = "cvs";

/// Return whether the version control binary is available.
///
/// End-to-end tests return early when it isn't, the same way the store
/// backend tests skip without their server credentials.
pub fn vcs_available() -> bool {
    Command::new(VCS_BINARY)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// A scratch wiki: one upstream history, two tracked checkouts for the
/// repository, one extra checkout for simulating out-of-band commits, and a
/// cache directory.
pub struct Scaffold {
    pub read_root: PathBuf,
    pub write_root: PathBuf,
    pub external_root: PathBuf,
    pub cache_dir: PathBuf,
    pub redaction_file: PathBuf,
    directory: TempDir,
}

impl Scaffold {
    /// Return a repository configuration over this scaffold's trees.
    pub fn config(&self) -> RepoConfig {
        RepoConfig::new(&self.read_root, &self.cache_dir).write_root(&self.write_root)
    }

    /// Run the version control binary in the external checkout.
    pub fn run_external(&self, args: &[&str]) -> anyhow::Result<()> {
        run(&self.external_root, args)
    }
}

/// Create a fresh upstream history with empty checkouts.
pub fn scaffold() -> anyhow::Result<Scaffold> {
    let directory = tempfile::tempdir()?;
    let root = directory.path();
    let cvsroot = root.join("cvsroot");
    let cvsroot_arg = cvsroot.to_str().unwrap().to_string();

    let seed = root.join("seed");
    std::fs::create_dir(&seed)?;

    run(root, &["-d", &cvsroot_arg, "init"])?;
    run(
        &seed,
        &["-d", &cvsroot_arg, "import", "-m", "import", "wiki", "vendor", "start"],
    )?;
    run(root, &["-d", &cvsroot_arg, "checkout", "-d", "read", "wiki"])?;
    run(root, &["-d", &cvsroot_arg, "checkout", "-d", "write", "wiki"])?;
    run(root, &["-d", &cvsroot_arg, "checkout", "-d", "external", "wiki"])?;

    Ok(Scaffold {
        read_root: root.join("read"),
        write_root: root.join("write"),
        external_root: root.join("external"),
        cache_dir: root.join("cache"),
        redaction_file: root.join("redacted"),
        directory,
    })
}

/// Run the version control binary in `cwd`, failing on a non-zero exit.
pub fn run(cwd: &Path, args: &[&str]) -> anyhow::Result<()> {
    let output = Command::new(VCS_BINARY)
        .args(args)
        .current_dir(cwd)
        .output()?;
    ensure!(
        output.status.success(),
        "cvs {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(())
}

/// Create a fake checkout directory that passes configuration validation.
///
/// This is enough for tests which never invoke the binary.
pub fn fake_checkout(root: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(root.join("CVS"))?;
    Ok(())
}
