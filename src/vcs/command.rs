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

use std::path::Path;
use std::process::{Command, Stdio};

/// The captured result of one external version control invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Everything the process wrote to standard output.
    pub stdout: String,
    /// Everything the process wrote to standard error.
    pub stderr: String,
    /// The exit status of the process, if it exited normally.
    pub status: Option<i32>,
}

impl CommandOutput {
    /// Return whether the process exited with status 0.
    ///
    /// For most subcommands a non-zero status means failure. The one
    /// exception is `diff`, whose non-zero status may just mean
    /// "differences found"; its callers must not use this as a success
    /// signal.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Fail with `Error::Command` unless the process exited with status 0.
    pub fn check(self) -> crate::Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(crate::Error::Command {
                status: self.status,
                stderr: self.stderr,
            })
        }
    }
}

/// Run `binary` with `args` in the directory `cwd` and capture its output.
///
/// Both output streams are fully drained before the exit status is awaited.
/// Waiting first would deadlock once the process fills a pipe buffer, so
/// every version control invocation in this crate goes through this one
/// function rather than plumbing pipes by hand.
///
/// The exit status is captured, never interpreted; callers decide what a
/// non-zero status means for their subcommand.
///
/// # Errors
/// - `Error::Io`: The process could not be spawned or its output could not
/// be read.
pub fn run_command(binary: &Path, args: &[&str], cwd: &Path) -> crate::Result<CommandOutput> {
    log::debug!(
        target: "wiki_store::vcs",
        "running {} {:?} in {}",
        binary.display(),
        args,
        cwd.display()
    );

    // `output` reads both pipes to the end before waiting on the child.
    let output = Command::new(binary)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        status: output.status.code(),
    })
}
