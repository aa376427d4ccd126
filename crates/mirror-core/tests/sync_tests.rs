//! Mirror sync scenarios driven through the dispatcher

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mirror_core::{
    ChangeLogSink, Classifier, CommandHook, DispatchOptions, Dispatcher, LogEntry, LogOperation,
    MemoryChangeLog, MirrorRoots, MirrorSync, RawNotification, RawOp, RenamePolicy, WatchBackend,
    WatchRegistry, init_mirror,
};
use mirror_diff::{DiffRecord, DiffSpan, apply};
use mirror_fs::{NormalizedPath, RobustnessConfig};
use mirror_test_utils::tree::TestTree;
use pretty_assertions::assert_eq;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
struct RecordingBackend {
    watched: Arc<Mutex<Vec<String>>>,
}

impl WatchBackend for RecordingBackend {
    fn watch(&mut self, path: &Path) -> notify::Result<()> {
        self.watched.lock().unwrap().push(path.display().to_string());
        Ok(())
    }

    fn unwatch(&mut self, _path: &Path) -> notify::Result<()> {
        Ok(())
    }
}

/// Holds modification inserts until the test releases them.
struct GatedLog {
    inner: Arc<MemoryChangeLog>,
    entered: mpsc::UnboundedSender<()>,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl ChangeLogSink for GatedLog {
    async fn insert(
        &self,
        path: &str,
        op: LogOperation,
        diff: Option<&DiffRecord>,
    ) -> mirror_core::Result<()> {
        if op == LogOperation::Modify {
            let _ = self.entered.send(());
            self.gate.acquire().await.unwrap().forget();
        }
        self.inner.insert(path, op, diff).await
    }

    async fn recent(&self, limit: usize) -> mirror_core::Result<Vec<LogEntry>> {
        self.inner.recent(limit).await
    }
}

struct Harness {
    tree: TestTree,
    roots: MirrorRoots,
    log: Arc<MemoryChangeLog>,
    registry: Arc<WatchRegistry>,
    backend: RecordingBackend,
    dispatcher: Dispatcher,
}

impl Harness {
    fn new(tree: TestTree) -> Self {
        Self::with_options(tree, RenamePolicy::Silent, CommandHook::default())
    }

    fn with_options(tree: TestTree, policy: RenamePolicy, hook: CommandHook) -> Self {
        Self::build(tree, policy, hook, |log| log as Arc<dyn ChangeLogSink>)
    }

    /// `wrap` decides which sink the sync layer writes through.
    fn build(
        tree: TestTree,
        policy: RenamePolicy,
        hook: CommandHook,
        wrap: impl FnOnce(Arc<MemoryChangeLog>) -> Arc<dyn ChangeLogSink>,
    ) -> Self {
        let roots = MirrorRoots::resolve(tree.source(), tree.backup()).unwrap();
        init_mirror(&roots, RobustnessConfig::default()).unwrap();

        let log = Arc::new(MemoryChangeLog::new());
        let backend = RecordingBackend::default();
        let registry = Arc::new(WatchRegistry::new(backend.clone()));
        let sink = wrap(Arc::clone(&log));
        let sync = MirrorSync::new(sink)
            .with_registry(Arc::clone(&registry))
            .with_rename_policy(policy);
        let classifier = Classifier::new(roots.source.clone(), roots.backup.clone(), vec!['~']);
        let options = DispatchOptions {
            echo_hook_output: false,
            ..DispatchOptions::default()
        };
        let dispatcher =
            Dispatcher::new(classifier, sync, options, CancellationToken::new()).with_hook(hook);

        Self {
            tree,
            roots,
            log,
            registry,
            backend,
            dispatcher,
        }
    }

    fn source(&self, relative: &str) -> NormalizedPath {
        self.roots.source.join(relative)
    }

    async fn notify(&self, relative: &str, op: RawOp) {
        self.dispatcher
            .dispatch(RawNotification::new(self.source(relative).to_native(), op))
            .await;
    }

    async fn settle(&self) {
        self.dispatcher.wait_idle().await;
    }

    fn ops(&self) -> Vec<LogOperation> {
        self.log.entries().iter().map(|e| e.op).collect()
    }
}

#[tokio::test]
async fn modify_records_insert_and_updates_mirror() {
    let h = Harness::new(TestTree::new().with_file("a.txt", "hello"));

    h.tree.write("a.txt", "hello world");
    h.notify("a.txt", RawOp::WRITE).await;
    h.settle().await;

    h.tree.assert_backup_contains("a.txt", "hello world");
    let entries = h.log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].op, LogOperation::Modify);
    assert_eq!(entries[0].path, h.source("a.txt").as_str());
    assert_eq!(
        entries[0].diff.as_ref().map(|d| d.spans().to_vec()),
        Some(vec![DiffSpan::insert(" world", 5)])
    );
}

#[tokio::test]
async fn create_adds_empty_placeholder() {
    let h = Harness::new(TestTree::new().with_file("a.txt", "hello"));

    h.tree.write("b.txt", "not yet mirrored");
    h.notify("b.txt", RawOp::CREATE).await;
    h.settle().await;

    h.tree.assert_backup_contains("b.txt", "");
    let entries = h.log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].op, LogOperation::Create);
    assert_eq!(entries[0].diff, None);
}

#[tokio::test]
async fn created_directory_is_mirrored_and_watched() {
    let h = Harness::new(TestTree::new());

    h.tree.mkdir("sub");
    h.notify("sub", RawOp::CREATE).await;
    h.settle().await;

    assert!(h.tree.backup_path("sub").is_dir());
    assert!(h.registry.contains(&h.source("sub")));
    assert_eq!(h.backend.watched.lock().unwrap().len(), 1);
    assert_eq!(h.ops(), vec![LogOperation::Create]);
}

#[tokio::test]
async fn remove_deletes_mirrored_file() {
    let h = Harness::new(TestTree::new().with_file("a.txt", "hello"));

    h.tree.remove("a.txt");
    h.notify("a.txt", RawOp::REMOVE).await;
    h.settle().await;

    h.tree.assert_backup_missing("a.txt");
    let entries = h.log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].op, LogOperation::Remove);
    assert_eq!(entries[0].diff, None);
}

#[tokio::test]
async fn remove_deletes_whole_directory() {
    let h = Harness::new(
        TestTree::new()
            .with_file("docs/a.md", "a")
            .with_file("docs/deep/b.md", "b"),
    );

    h.tree.remove("docs");
    h.notify("docs", RawOp::REMOVE).await;
    h.settle().await;

    h.tree.assert_backup_missing("docs");
}

#[tokio::test]
async fn back_to_back_modifies_end_with_final_content() {
    let h = Harness::new(TestTree::new().with_file("a.txt", "one"));

    h.tree.write("a.txt", "one two");
    h.notify("a.txt", RawOp::WRITE).await;
    h.tree.write("a.txt", "one two three");
    h.notify("a.txt", RawOp::WRITE).await;
    h.settle().await;

    h.tree.assert_backup_contains("a.txt", "one two three");
    assert_eq!(h.ops(), vec![LogOperation::Modify, LogOperation::Modify]);
}

#[tokio::test]
async fn recorded_diffs_replay_from_initial_content() {
    let h = Harness::new(TestTree::new().with_file("a.txt", "the quick fox"));

    for content in ["the quick brown fox", "a quick brown fox jumps", "fox"] {
        h.tree.write("a.txt", content);
        h.notify("a.txt", RawOp::WRITE).await;
        h.settle().await;
    }

    let mut text = "the quick fox".to_string();
    for entry in h.log.entries() {
        text = apply(&text, entry.diff.as_ref().unwrap()).unwrap();
    }
    assert_eq!(text, "fox");
}

#[tokio::test]
async fn modify_then_remove_applies_in_arrival_order() {
    let h = Harness::new(TestTree::new().with_file("a.txt", "hello"));

    h.tree.write("a.txt", "hello again");
    h.notify("a.txt", RawOp::WRITE).await;
    h.tree.remove("a.txt");
    h.notify("a.txt", RawOp::REMOVE).await;
    h.settle().await;

    h.tree.assert_backup_missing("a.txt");
    assert_eq!(h.ops().last(), Some(&LogOperation::Remove));
}

#[tokio::test]
async fn directory_removal_waits_for_write_beneath_it() {
    let gate = Arc::new(Semaphore::new(0));
    let (entered_tx, mut entered) = mpsc::unbounded_channel();
    let h = Harness::build(
        TestTree::new().with_file("dir/a.txt", "one"),
        RenamePolicy::Silent,
        CommandHook::default(),
        |log| {
            Arc::new(GatedLog {
                inner: log,
                entered: entered_tx,
                gate: Arc::clone(&gate),
            }) as Arc<dyn ChangeLogSink>
        },
    );

    h.tree.write("dir/a.txt", "two");
    h.notify("dir/a.txt", RawOp::WRITE).await;
    // The modification has read the source and is parked on its log insert.
    entered.recv().await.unwrap();

    h.tree.remove("dir");
    h.notify("dir/a.txt", RawOp::REMOVE).await;
    h.notify("dir", RawOp::REMOVE).await;
    gate.add_permits(1);
    h.settle().await;

    assert!(!h.tree.source_path("dir").exists());
    h.tree.assert_backup_missing("dir");
    assert_eq!(
        h.ops(),
        vec![LogOperation::Modify, LogOperation::Remove, LogOperation::Remove]
    );
}

#[tokio::test]
async fn duplicate_create_and_stale_remove_leave_no_trace() {
    let h = Harness::new(TestTree::new().with_file("a.txt", "hello"));

    h.notify("a.txt", RawOp::CREATE).await;
    h.notify("a.txt", RawOp::REMOVE).await;
    h.settle().await;

    h.tree.assert_backup_contains("a.txt", "hello");
    assert!(h.log.is_empty());
    let stats = h.dispatcher.stats();
    assert_eq!(stats.duplicate_create, 1);
    assert_eq!(stats.stale_remove, 1);
    assert_eq!(stats.accepted(), 0);
}

#[tokio::test]
async fn directory_write_is_ignored() {
    let h = Harness::new(TestTree::new().with_dir("sub"));

    h.notify("sub", RawOp::WRITE).await;
    h.settle().await;

    assert!(h.tree.backup_path("sub").is_dir());
    assert!(h.log.is_empty());
}

#[tokio::test]
async fn rename_away_is_silent_by_default() {
    let h = Harness::new(TestTree::new().with_file("a.txt", "hello"));

    h.tree.remove("a.txt");
    h.notify("a.txt", RawOp::RENAME).await;
    h.settle().await;

    h.tree.assert_backup_missing("a.txt");
    assert!(h.log.is_empty());
}

#[tokio::test]
async fn rename_away_can_be_logged_as_remove() {
    let h = Harness::with_options(
        TestTree::new().with_file("a.txt", "hello"),
        RenamePolicy::LogAsRemove,
        CommandHook::default(),
    );

    h.tree.remove("a.txt");
    h.notify("a.txt", RawOp::RENAME).await;
    h.settle().await;

    h.tree.assert_backup_missing("a.txt");
    assert_eq!(h.ops(), vec![LogOperation::Remove]);
}

#[cfg(unix)]
#[tokio::test]
async fn hooks_run_once_per_accepted_event() {
    let tree = TestTree::new().with_file("a.txt", "hello");
    let marker = tree.root().join("hook-ran");
    let hook = CommandHook::new(vec![format!("touch {}", marker.display())]);
    let h = Harness::with_options(tree, RenamePolicy::Silent, hook);

    h.tree.write("a.txt", "hello world");
    h.notify("a.txt", RawOp::WRITE).await;
    h.settle().await;

    assert!(marker.exists());
    assert_eq!(h.dispatcher.stats().hook_failed, 0);
}

#[cfg(unix)]
#[tokio::test]
async fn failing_hook_is_counted_not_fatal() {
    let hook = CommandHook::new(vec!["false".to_string()]);
    let h = Harness::with_options(
        TestTree::new().with_file("a.txt", "hello"),
        RenamePolicy::Silent,
        hook,
    );

    h.tree.write("a.txt", "hello world");
    h.notify("a.txt", RawOp::WRITE).await;
    h.settle().await;

    h.tree.assert_backup_contains("a.txt", "hello world");
    let stats = h.dispatcher.stats();
    assert_eq!(stats.hook_failed, 1);
    assert_eq!(stats.modified, 1);
}
