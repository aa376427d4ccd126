//! Wiring a watched tree into a running monitor

use std::sync::Arc;

use mirror_fs::{RobustnessConfig, directories};
use tokio::sync::mpsc;
use tokio::task::spawn_blocking;
use tokio_util::sync::CancellationToken;

use crate::changelog::ChangeLogSink;
use crate::config::WatchSetting;
use crate::dispatch::{DispatchOptions, Dispatcher};
use crate::event::{Classifier, RawNotification};
use crate::hooks::CommandHook;
use crate::mirror::{InitSummary, MirrorRoots, MirrorSync, init_mirror};
use crate::stats::StatsSnapshot;
use crate::watch::{WatchRegistry, notify_source};
use crate::{Error, Result};

/// Tuning for [`Monitor::bootstrap`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorOptions {
    pub dispatch: DispatchOptions,
    pub io: RobustnessConfig,
}

/// A bootstrapped mirror with its notification stream.
#[derive(Debug)]
pub struct Monitor {
    roots: MirrorRoots,
    summary: InitSummary,
    registry: Arc<WatchRegistry>,
    dispatcher: Dispatcher,
    events: Option<mpsc::UnboundedReceiver<RawNotification>>,
}

impl Monitor {
    /// Copy the source tree into the mirror and watch every directory.
    ///
    /// Every failure here is fatal to the caller.
    pub async fn bootstrap(
        setting: &WatchSetting,
        sink: Arc<dyn ChangeLogSink>,
        options: MonitorOptions,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let roots = MirrorRoots::resolve(&setting.path, &setting.backup)?;

        let (summary, dirs) = {
            let roots = roots.clone();
            let io = options.io;
            spawn_blocking(move || -> Result<_> {
                let summary = init_mirror(&roots, io)?;
                let dirs = directories(roots.source.to_native())?;
                Ok((summary, dirs))
            })
            .await
            .map_err(Error::task)??
        };

        let (registry, events) = notify_source()?;
        let registry = Arc::new(registry);
        let watched = registry.add_all(&dirs)?;
        tracing::info!(source = %roots.source, directories = watched, "watching source tree");

        let classifier = Classifier::new(
            roots.source.clone(),
            roots.backup.clone(),
            setting.temp_markers.clone(),
        );
        let sync = MirrorSync::new(sink)
            .with_registry(Arc::clone(&registry))
            .with_io(options.io)
            .with_rename_policy(setting.rename_policy);
        let hook = CommandHook::new(setting.commands.iter().cloned());
        let dispatcher = Dispatcher::new(classifier, sync, options.dispatch, cancel).with_hook(hook);

        Ok(Self {
            roots,
            summary,
            registry,
            dispatcher,
            events: Some(events),
        })
    }

    pub fn roots(&self) -> &MirrorRoots {
        &self.roots
    }

    pub fn summary(&self) -> InitSummary {
        self.summary
    }

    pub fn registry(&self) -> &Arc<WatchRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.dispatcher.stats()
    }

    /// Process notifications until the watcher goes away.
    ///
    /// Returns immediately on a second call.
    pub async fn run(&mut self) -> StatsSnapshot {
        if let Some(events) = self.events.take() {
            self.dispatcher.run(events).await;
        }
        self.dispatcher.stats()
    }
}
