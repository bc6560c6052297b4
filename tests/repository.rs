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
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

use chrono::Utc;
use maplit::btreeset;

use wiki_store::redaction::REDACTED_TEXT;
use wiki_store::repo::{Notifier, RepoConfig, Repository};
use wiki_store::{Error, PageName};

use common::{fake_checkout, scaffold, vcs_available};

mod common;

fn name(text: &str) -> PageName {
    PageName::new(text).unwrap()
}

#[test]
fn opening_without_a_read_tree_fails() -> anyhow::Result<()> {
    let directory = tempfile::tempdir()?;
    let config = RepoConfig::new(directory.path().join("missing"), directory.path().join("cache"));

    assert!(matches!(Repository::open(config), Err(Error::Config(_))));
    Ok(())
}

#[test]
fn opening_over_a_plain_directory_fails() -> anyhow::Result<()> {
    let directory = tempfile::tempdir()?;
    let read_root = directory.path().join("read");
    fs::create_dir(&read_root)?;

    let config = RepoConfig::new(&read_root, directory.path().join("cache"));

    assert!(matches!(Repository::open(config), Err(Error::Config(_))));
    Ok(())
}

#[test]
fn shared_read_and_write_trees_are_rejected() -> anyhow::Result<()> {
    let directory = tempfile::tempdir()?;
    let read_root = directory.path().join("read");
    fake_checkout(&read_root)?;

    let config = RepoConfig::new(&read_root, directory.path().join("cache")).write_root(&read_root);

    assert!(matches!(Repository::open(config), Err(Error::Config(_))));
    Ok(())
}

#[test]
fn malformed_redaction_lists_are_fatal_at_open() -> anyhow::Result<()> {
    let directory = tempfile::tempdir()?;
    let read_root = directory.path().join("read");
    fake_checkout(&read_root)?;
    let redaction_file = directory.path().join("redacted");
    fs::write(&redaction_file, "FrontPage not-a-range\n")?;

    let config = RepoConfig::new(&read_root, directory.path().join("cache"))
        .redaction_file(&redaction_file);

    assert!(matches!(
        Repository::open(config),
        Err(Error::InvalidRedactionList(_))
    ));
    Ok(())
}

#[test]
fn read_only_repositories_reject_checkins() -> anyhow::Result<()> {
    let directory = tempfile::tempdir()?;
    let read_root = directory.path().join("read");
    fake_checkout(&read_root)?;

    let repo = Repository::open(RepoConfig::new(&read_root, directory.path().join("cache")))?;

    assert!(repo.read_only());
    assert!(matches!(
        repo.checkin(&name("FrontPage"), None, "text\n"),
        Err(Error::Config(_))
    ));
    Ok(())
}

#[test]
fn invalid_names_are_rejected_before_file_access() -> anyhow::Result<()> {
    let directory = tempfile::tempdir()?;
    let read_root = directory.path().join("read");
    fake_checkout(&read_root)?;

    let repo = Repository::open(RepoConfig::new(&read_root, directory.path().join("cache")))?;

    assert!(matches!(repo.get("../escape"), Err(Error::InvalidName)));
    assert!(matches!(repo.fetch(".hidden"), Err(Error::InvalidName)));
    Ok(())
}

#[test]
#[cfg(unix)]
fn present_but_read_only_files_are_not_pages() -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let directory = tempfile::tempdir()?;
    let read_root = directory.path().join("read");
    fake_checkout(&read_root)?;
    let page_path = read_root.join("Frozen");
    fs::write(&page_path, "frozen\n")?;

    let repo = Repository::open(RepoConfig::new(&read_root, directory.path().join("cache")))?;
    let page = name("Frozen");

    assert!(repo.exists(&page));
    assert!(repo.editable(&page));

    fs::set_permissions(&page_path, fs::Permissions::from_mode(0o444))?;

    // Privileged users bypass permission bits; nothing to observe then.
    if fs::OpenOptions::new().write(true).open(&page_path).is_ok() {
        return Ok(());
    }

    // A read-only page neither exists for rendering nor may be created.
    assert!(!repo.exists(&page));
    assert!(!repo.editable(&page));
    assert!(repo.editable(&name("Absent")));
    Ok(())
}

#[test]
fn commits_increment_revisions_without_conflict() -> anyhow::Result<()> {
    if !vcs_available() {
        return Ok(());
    }
    let scaffold = scaffold()?;
    let repo = Repository::open(scaffold.config())?;

    let page = repo.fetch("FrontPage")?;
    assert!(!page.exists());
    assert_eq!(page.revision(), None);

    assert_eq!(page.checkin(None, "hello\n")?, 1);
    assert_eq!(repo.get("FrontPage")?.revision(), Some(1));
    assert_eq!(repo.get("FrontPage")?.source()?, "hello\n");

    assert_eq!(repo.checkin(&name("FrontPage"), Some(1), "hello world\n")?, 2);
    let page = repo.get("FrontPage")?;
    assert_eq!(page.revision(), Some(2));
    assert_eq!(page.source()?, "hello world\n");
    assert!(page.mtime().is_some());

    repo.finish_request();
    Ok(())
}

#[test]
fn page_entities_are_request_scoped_snapshots() -> anyhow::Result<()> {
    if !vcs_available() {
        return Ok(());
    }
    let scaffold = scaffold()?;
    let repo = Repository::open(scaffold.config())?;

    repo.checkin(&name("FrontPage"), None, "hello\n")?;
    let before = repo.get("FrontPage")?;

    repo.checkin(&name("FrontPage"), Some(1), "hello world\n")?;

    // The old handle keeps the state it was constructed with; a fresh
    // lookup observes the commit.
    assert_eq!(before.revision(), Some(1));
    assert_eq!(repo.get("FrontPage")?.revision(), Some(2));
    Ok(())
}

#[test]
fn diffs_carry_revisions_and_text() -> anyhow::Result<()> {
    if !vcs_available() {
        return Ok(());
    }
    let scaffold = scaffold()?;
    let repo = Repository::open(scaffold.config())?;

    repo.checkin(&name("FrontPage"), None, "hello\n")?;
    repo.checkin(&name("FrontPage"), Some(1), "hello world\n")?;

    let diff = repo.get("FrontPage")?.diff(1, 2)?;

    assert_eq!(diff.rev1, 1);
    assert_eq!(diff.rev2, 2);
    assert!(diff.text.contains("-hello"));
    assert!(diff.text.contains("+hello world"));
    assert!(!diff.killed);
    Ok(())
}

#[test]
fn logs_record_the_whole_history() -> anyhow::Result<()> {
    if !vcs_available() {
        return Ok(());
    }
    let scaffold = scaffold()?;
    let repo = Repository::open(scaffold.config())?;

    repo.checkin(&name("FrontPage"), None, "hello\n")?;
    repo.checkin(&name("FrontPage"), Some(1), "hello\nworld\n")?;

    let page = repo.get("FrontPage")?;
    let logs = page.logs()?;

    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].revision, 2);
    assert_eq!(logs[0].added, 1);
    assert_eq!(logs[1].revision, 1);

    let entry = page.log_at(1)?;
    assert_eq!(entry.revision, 1);
    Ok(())
}

#[test]
fn annotations_attribute_lines_to_revisions() -> anyhow::Result<()> {
    if !vcs_available() {
        return Ok(());
    }
    let scaffold = scaffold()?;
    let repo = Repository::open(scaffold.config())?;

    repo.checkin(&name("FrontPage"), None, "hello\n")?;
    repo.checkin(&name("FrontPage"), Some(1), "hello\nworld\n")?;

    let lines = repo.get("FrontPage")?.annotate(None)?;

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].revision, 1);
    assert_eq!(lines[0].text, "hello");
    assert_eq!(lines[1].revision, 2);
    assert_eq!(lines[1].text, "world");
    Ok(())
}

#[test]
fn stale_base_revisions_conflict() -> anyhow::Result<()> {
    if !vcs_available() {
        return Ok(());
    }
    let scaffold = scaffold()?;
    let repo = Repository::open(scaffold.config())?;
    let page = name("FrontPage");

    repo.checkin(&page, None, "hello\n")?;
    repo.checkin(&page, Some(1), "alpha\n")?;

    // A rival edit also based on revision 1 cannot merge.
    let error = repo.checkin(&page, Some(1), "beta\n").unwrap_err();
    match error {
        Error::Conflict { text, revision } => {
            assert_eq!(revision, 2);
            assert!(!text.is_empty());
            assert!(text.contains("<<<<<<<"));
        }
        other => panic!("expected a conflict, got {:?}", other),
    }

    // The working file was reset to the head, so a rebased edit goes
    // through cleanly.
    assert_eq!(repo.get("FrontPage")?.source()?, "alpha\n");
    assert_eq!(repo.checkin(&page, Some(2), "alpha\nbeta\n")?, 3);
    Ok(())
}

#[test]
fn non_conflicting_concurrent_edits_merge() -> anyhow::Result<()> {
    if !vcs_available() {
        return Ok(());
    }
    let scaffold = scaffold()?;
    let repo = Repository::open(scaffold.config())?;
    let page = name("FrontPage");

    repo.checkin(&page, None, "one\ntwo\nthree\n")?;
    repo.checkin(&page, Some(1), "ONE\ntwo\nthree\n")?;

    // An edit of a different line with a stale base merges cleanly.
    let revision = repo.checkin(&page, Some(1), "one\ntwo\nTHREE\n")?;

    assert_eq!(revision, 3);
    assert_eq!(repo.get("FrontPage")?.source()?, "ONE\ntwo\nTHREE\n");
    Ok(())
}

#[test]
fn last_writer_wins_without_a_base_revision() -> anyhow::Result<()> {
    if !vcs_available() {
        return Ok(());
    }
    let scaffold = scaffold()?;
    let repo = Repository::open(scaffold.config())?;
    let page = name("FrontPage");

    repo.checkin(&page, None, "first\n")?;
    let revision = repo.checkin(&page, None, "second\n")?;

    assert_eq!(revision, 2);
    assert_eq!(repo.get("FrontPage")?.source()?, "second\n");
    Ok(())
}

#[test]
fn redacted_revisions_hide_text_but_keep_metadata() -> anyhow::Result<()> {
    if !vcs_available() {
        return Ok(());
    }
    let scaffold = scaffold()?;
    let repo = Repository::open(scaffold.config())?;
    let page = name("FrontPage");

    repo.checkin(&page, None, "hello\n")?;
    repo.checkin(&page, Some(1), "hello\nsecret\n")?;
    drop(repo);

    fs::write(&scaffold.redaction_file, "FrontPage 2\n")?;
    let repo = Repository::open(scaffold.config().redaction_file(&scaffold.redaction_file))?;
    let handle = repo.get("FrontPage")?;

    let diff = handle.diff(1, 2)?;
    assert!(diff.killed);
    assert_eq!(diff.text, REDACTED_TEXT);
    assert_eq!(diff.rev1, 1);
    assert_eq!(diff.rev2, 2);

    let logs = handle.logs()?;
    assert!(logs[0].killed);
    assert_eq!(logs[0].message, REDACTED_TEXT);
    assert_eq!(logs[0].revision, 2);
    assert!(logs[0].added > 0);
    assert!(!logs[1].killed);

    let lines = handle.annotate(None)?;
    assert_eq!(lines[0].text, "hello");
    assert!(lines[1].killed);
    assert_eq!(lines[1].revision, 2);
    assert_eq!(lines[1].text, "");

    assert_eq!(handle.source_at(2)?, REDACTED_TEXT);
    assert_eq!(handle.source_at(1)?, "hello\n");
    Ok(())
}

#[test]
fn checkins_maintain_the_link_index() -> anyhow::Result<()> {
    if !vcs_available() {
        return Ok(());
    }
    let scaffold = scaffold()?;
    let repo = Repository::open(scaffold.config())?;

    repo.checkin(&name("FrontPage"), None, "see [[Sandbox]] and [[News]]\n")?;

    assert_eq!(
        repo.get("FrontPage")?.links()?,
        btreeset![name("Sandbox"), name("News")]
    );
    assert_eq!(
        repo.backlinks_of(&name("Sandbox"))?,
        btreeset![name("FrontPage")]
    );

    repo.checkin(&name("FrontPage"), Some(1), "see [[News]] only\n")?;

    assert!(repo.backlinks_of(&name("Sandbox"))?.is_empty());
    assert_eq!(
        repo.backlinks_of(&name("News"))?,
        btreeset![name("FrontPage")]
    );
    Ok(())
}

#[test]
fn diff_since_reports_recent_changes() -> anyhow::Result<()> {
    if !vcs_available() {
        return Ok(());
    }
    let scaffold = scaffold()?;
    let repo = Repository::open(scaffold.config())?;
    let page = name("FrontPage");

    repo.checkin(&page, None, "hello\n")?;

    // Commit timestamps are second-granular; put the cutoff strictly
    // between the two commits.
    sleep(Duration::from_millis(1100));
    let cutoff = Utc::now();
    sleep(Duration::from_millis(1100));

    repo.checkin(&page, Some(1), "hello world\n")?;

    let diffs = repo.diff_since(cutoff)?;

    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].name, page);
    assert_eq!(diffs[0].rev2, 2);
    assert!(diffs[0].text.contains("+hello world"));
    Ok(())
}

#[test]
fn external_commits_are_reconciled() -> anyhow::Result<()> {
    if !vcs_available() {
        return Ok(());
    }
    let scaffold = scaffold()?;
    let repo = Repository::open(scaffold.config())?;
    let page = name("FrontPage");

    repo.checkin(&page, None, "hello\n")?;

    // An out-of-band commit script edits the page behind our back.
    scaffold.run_external(&["update", "-A", "FrontPage"])?;
    fs::write(scaffold.external_root.join("FrontPage"), "external [[News]]\n")?;
    scaffold.run_external(&["commit", "-m", "external edit", "FrontPage"])?;

    repo.updated_externally(&page)?;

    let handle = repo.get("FrontPage")?;
    assert_eq!(handle.revision(), Some(2));
    assert_eq!(handle.source()?, "external [[News]]\n");
    assert_eq!(repo.backlinks_of(&name("News"))?, btreeset![page]);
    Ok(())
}

#[test]
fn vanished_pages_are_reported_as_not_found() -> anyhow::Result<()> {
    if !vcs_available() {
        return Ok(());
    }
    let scaffold = scaffold()?;
    let repo = Repository::open(scaffold.config())?;
    let page = name("FrontPage");

    repo.checkin(&page, None, "hello\n")?;

    scaffold.run_external(&["update", "-A", "FrontPage"])?;
    scaffold.run_external(&["remove", "-f", "FrontPage"])?;
    scaffold.run_external(&["commit", "-m", "removed", "FrontPage"])?;

    assert!(matches!(
        repo.updated_externally(&page),
        Err(Error::NotFound)
    ));
    Ok(())
}

#[derive(Debug)]
struct ChannelNotifier(Mutex<Sender<wiki_store::vcs::Diff>>);

impl Notifier for ChannelNotifier {
    fn notify(&self, diff: &wiki_store::vcs::Diff) -> anyhow::Result<()> {
        self.0.lock().unwrap().send(diff.clone())?;
        Ok(())
    }
}

#[derive(Debug)]
struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _diff: &wiki_store::vcs::Diff) -> anyhow::Result<()> {
        anyhow::bail!("the mail server is down")
    }
}

#[test]
fn checkins_notify_with_the_committed_diff() -> anyhow::Result<()> {
    if !vcs_available() {
        return Ok(());
    }
    let scaffold = scaffold()?;
    let (sender, receiver) = channel();
    let repo = Repository::open(scaffold.config())?
        .with_notifier(Arc::new(ChannelNotifier(Mutex::new(sender))));
    let page = name("FrontPage");

    repo.checkin(&page, None, "hello\n")?;
    repo.checkin(&page, Some(1), "hello world\n")?;

    let mut diffs = vec![
        receiver.recv_timeout(Duration::from_secs(10))?,
        receiver.recv_timeout(Duration::from_secs(10))?,
    ];
    diffs.sort_by_key(|diff| diff.rev2);
    let (first, second) = (&diffs[0], &diffs[1]);

    assert_eq!(first.rev2, 1);
    assert_eq!(first.text, "hello\n");
    assert_eq!(second.rev1, 1);
    assert_eq!(second.rev2, 2);
    assert!(second.text.contains("+hello world"));
    Ok(())
}

#[test]
fn notification_failures_never_reach_the_committer() -> anyhow::Result<()> {
    if !vcs_available() {
        return Ok(());
    }
    let scaffold = scaffold()?;
    let repo = Repository::open(scaffold.config())?.with_notifier(Arc::new(FailingNotifier));

    assert_eq!(repo.checkin(&name("FrontPage"), None, "hello\n")?, 1);
    Ok(())
}

#[test]
fn rebuilding_the_link_cache_recovers_from_scratch() -> anyhow::Result<()> {
    if !vcs_available() {
        return Ok(());
    }
    let scaffold = scaffold()?;
    let repo = Repository::open(scaffold.config())?;

    repo.checkin(&name("FrontPage"), None, "see [[Sandbox]]\n")?;
    repo.checkin(&name("Sandbox"), None, "back to [[FrontPage]]\n")?;

    repo.rebuild_link_cache()?;

    assert_eq!(
        repo.backlinks_of(&name("Sandbox"))?,
        btreeset![name("FrontPage")]
    );
    assert_eq!(
        repo.backlinks_of(&name("FrontPage"))?,
        btreeset![name("Sandbox")]
    );
    Ok(())
}
