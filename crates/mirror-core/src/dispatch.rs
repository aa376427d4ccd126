//! Dispatching classified events to sync and hook tasks
//!
//! One loop drains the notification channel. Every accepted event spawns
//! a sync task and, if commands are configured, an independent hook task.
//! Sync tasks for overlapping backup paths run in arrival order; sync
//! tasks for unrelated paths run concurrently up to `max_in_flight`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use mirror_fs::NormalizedPath;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::{CancellationToken, DropGuard};
use tokio_util::task::TaskTracker;

use crate::Error;
use crate::event::{ChangeEvent, Classified, Classifier, RawNotification};
use crate::hooks::{CommandHook, HookContext};
use crate::mirror::{MirrorSync, SyncOutcome};
use crate::stats::{EventStats, StatsSnapshot};

/// Default bound on concurrently running sync tasks
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Default bound on concurrently running hook runs
pub const DEFAULT_MAX_HOOKS_IN_FLIGHT: usize = 4;

#[derive(Debug, Default)]
struct LockState {
    next_seq: u64,
    active: BTreeMap<u64, (NormalizedPath, CancellationToken)>,
}

/// FIFO ordering for mirror mutations on overlapping paths.
///
/// Two paths overlap when one is equal to or lies beneath the other.
/// [`PathLocks::reserve`] takes a place in the queue immediately;
/// [`PathTurn::ready`] waits until every earlier turn on an overlapping
/// path has been dropped. A directory removal therefore runs after
/// in-flight writes below it, and later writes below it run after the
/// removal.
#[derive(Debug, Clone, Default)]
pub struct PathLocks {
    state: Arc<Mutex<LockState>>,
}

/// A reserved place in the queue. Dropping it releases later turns.
#[derive(Debug)]
pub struct PathTurn {
    state: Arc<Mutex<LockState>>,
    seq: u64,
    earlier: Vec<CancellationToken>,
    _done: DropGuard,
}

fn overlaps(a: &NormalizedPath, b: &NormalizedPath) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

fn lock_state(state: &Mutex<LockState>) -> MutexGuard<'_, LockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve(&self, path: &NormalizedPath) -> PathTurn {
        let done = CancellationToken::new();
        let mut state = lock_state(&self.state);
        state.next_seq += 1;
        let seq = state.next_seq;
        let earlier: Vec<_> = state
            .active
            .values()
            .filter(|(held, _)| overlaps(held, path))
            .map(|(_, done)| done.clone())
            .collect();
        state.active.insert(seq, (path.clone(), done.clone()));
        PathTurn {
            state: Arc::clone(&self.state),
            seq,
            earlier,
            _done: done.drop_guard(),
        }
    }

    /// Turns reserved and not yet dropped.
    pub fn pending(&self) -> usize {
        lock_state(&self.state).active.len()
    }
}

impl PathTurn {
    /// Wait for all earlier overlapping turns to finish.
    ///
    /// Cancel safe: a dropped call leaves the remaining waits in place.
    pub async fn ready(&mut self) {
        while let Some(earlier) = self.earlier.last() {
            earlier.cancelled().await;
            self.earlier.pop();
        }
    }
}

impl Drop for PathTurn {
    fn drop(&mut self) {
        lock_state(&self.state).active.remove(&self.seq);
    }
}

/// Concurrency limits for a [`Dispatcher`]
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    pub max_in_flight: usize,
    pub max_hooks_in_flight: usize,
    /// Print hook stdout to the process stdout
    pub echo_hook_output: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            max_hooks_in_flight: DEFAULT_MAX_HOOKS_IN_FLIGHT,
            echo_hook_output: true,
        }
    }
}

/// Routes raw notifications to sync and hook tasks.
#[derive(Debug)]
pub struct Dispatcher {
    classifier: Classifier,
    sync: MirrorSync,
    hook: Option<Arc<CommandHook>>,
    stats: Arc<EventStats>,
    locks: PathLocks,
    sync_permits: Arc<Semaphore>,
    hook_permits: Arc<Semaphore>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    echo_hook_output: bool,
}

impl Dispatcher {
    pub fn new(
        classifier: Classifier,
        sync: MirrorSync,
        options: DispatchOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            classifier,
            sync,
            hook: None,
            stats: Arc::new(EventStats::new()),
            locks: PathLocks::new(),
            sync_permits: Arc::new(Semaphore::new(options.max_in_flight.max(1))),
            hook_permits: Arc::new(Semaphore::new(options.max_hooks_in_flight.max(1))),
            cancel,
            tracker: TaskTracker::new(),
            echo_hook_output: options.echo_hook_output,
        }
    }

    /// Run `hook` after every accepted event. An empty hook is ignored.
    pub fn with_hook(mut self, hook: CommandHook) -> Self {
        self.hook = (!hook.is_empty()).then(|| Arc::new(hook));
        self
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Drain `rx` until it closes, then wait for spawned tasks.
    pub async fn run(&self, mut rx: mpsc::UnboundedReceiver<RawNotification>) {
        while let Some(raw) = rx.recv().await {
            self.dispatch(raw).await;
        }
        tracing::debug!("notification channel closed");
        self.wait_idle().await;
    }

    /// Classify one notification and spawn the resulting work.
    ///
    /// Returns once the tasks are spawned; waits only for a free sync slot.
    pub async fn dispatch(&self, raw: RawNotification) {
        tracing::trace!(path = %raw.path.display(), op = %raw.op, "notification");
        for classified in self.classifier.classify(&raw) {
            match classified {
                Classified::Skipped { path, reason } => {
                    self.stats.record_skipped(reason);
                    tracing::debug!(path = %path, %reason, "skipped notification");
                }
                Classified::Accepted(event) => {
                    self.stats.record_accepted(event.op);
                    self.spawn_sync(event.clone()).await;
                    self.spawn_hook(event);
                }
            }
        }
    }

    /// Wait until every task spawned so far has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    async fn spawn_sync(&self, event: ChangeEvent) {
        let Ok(permit) = Arc::clone(&self.sync_permits).acquire_owned().await else {
            return;
        };
        let mut turn = self.locks.reserve(&event.backup);
        let sync = self.sync.clone();
        let stats = Arc::clone(&self.stats);

        self.tracker.spawn(async move {
            turn.ready().await;
            match sync.apply(&event).await {
                Ok(SyncOutcome::SourceGone) => {
                    tracing::debug!(path = %event.target, op = %event.op, "source vanished before sync");
                }
                Ok(outcome) => {
                    tracing::debug!(path = %event.target, op = %event.op, ?outcome, "synced");
                }
                Err(e) => {
                    stats.record_sync_failure();
                    tracing::error!(path = %event.target, op = %event.op, error = %e, "sync failed");
                }
            }
            drop(turn);
            drop(permit);
        });
    }

    fn spawn_hook(&self, event: ChangeEvent) {
        let Some(hook) = self.hook.clone() else {
            return;
        };
        let permits = Arc::clone(&self.hook_permits);
        let stats = Arc::clone(&self.stats);
        let cancel = self.cancel.clone();
        let echo = self.echo_hook_output;

        self.tracker.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let context = HookContext::for_event(&event);
            match hook.run(&context, &cancel).await {
                Ok(output) => {
                    if echo && !output.is_empty() {
                        print!("{}", output);
                    }
                }
                Err(Error::HookCancelled { command }) => {
                    tracing::debug!(%command, "hook cancelled");
                }
                Err(e) => {
                    stats.record_hook_failure();
                    tracing::error!(path = %event.target, op = %event.op, error = %e, "hook failed");
                }
            }
        });
    }
}
