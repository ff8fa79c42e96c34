// Filesystem watching for the locations the slots show
// Renames, deletions and unmounts underneath a slot are reported as
// `WatchEvent`s for the application to act on.

use super::fs::{is_mountpoint, MountTable};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};

pub const MOUNT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum WatchEvent {
    Moved { from: PathBuf, to: PathBuf },
    Gone(PathBuf),
    Unmounted(PathBuf),
}

enum Signal {
    Fs(Event),
    Unmounted(PathBuf),
}

/// Watches every shown directory and its parent, so renames arrive with both
/// ends.
pub struct DirectoryWatcher {
    watcher: RecommendedWatcher,
    shown: BTreeSet<PathBuf>,
    watched: BTreeSet<PathBuf>,
    signals: Receiver<Signal>,
    alive: Arc<AtomicBool>,
}

impl DirectoryWatcher {
    /// `wake` runs on the watcher threads whenever something arrives.
    pub fn new(
        mounts: MountTable,
        wake: impl Fn() + Clone + Send + 'static,
    ) -> Result<Self, notify::Error> {
        let (tx, signals) = channel();

        let fs_tx = tx.clone();
        let fs_wake = wake.clone();
        let watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if fs_tx.send(Signal::Fs(event)).is_ok() {
                        fs_wake();
                    }
                }
                Err(e) => warn!("watch error: {}", e),
            }
        })?;

        let alive = Arc::new(AtomicBool::new(true));
        spawn_mount_monitor(mounts, Arc::clone(&alive), tx, wake);

        Ok(Self {
            watcher,
            shown: BTreeSet::new(),
            watched: BTreeSet::new(),
            signals,
            alive,
        })
    }

    /// Watch exactly the directories in `shown`.
    pub fn set_shown(&mut self, shown: BTreeSet<PathBuf>) {
        if shown == self.shown {
            return;
        }
        let wanted: BTreeSet<PathBuf> = shown
            .iter()
            .flat_map(|path| std::iter::once(path.clone()).chain(path.parent().map(Path::to_path_buf)))
            .collect();

        for stale in self.watched.difference(&wanted) {
            if let Err(e) = self.watcher.unwatch(stale) {
                trace!("unwatch {}: {}", stale.display(), e);
            }
        }
        for fresh in wanted.difference(&self.watched) {
            if let Err(e) = self.watcher.watch(fresh, RecursiveMode::NonRecursive) {
                debug!("cannot watch {}: {}", fresh.display(), e);
            }
        }
        debug!("watching {} directories for {} shown", wanted.len(), shown.len());
        self.watched = wanted;
        self.shown = shown;
    }

    /// Everything that happened since the last call.
    pub fn poll(&mut self) -> Vec<WatchEvent> {
        let mut events = Vec::new();
        let mut unmounted = Vec::new();
        for signal in self.signals.try_iter() {
            match signal {
                Signal::Fs(event) => events.push(event),
                Signal::Unmounted(path) => unmounted.push(path),
            }
        }
        let mut changes = translate(&events, &self.shown);
        changes.extend(unmounted.into_iter().map(WatchEvent::Unmounted));
        changes
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("shown", &self.shown)
            .field("watched", &self.watched)
            .finish()
    }
}

fn affects(path: &Path, shown: &BTreeSet<PathBuf>) -> bool {
    shown.iter().any(|dir| dir.starts_with(path))
}

/// Reduce raw notify events to the changes that concern `shown`.
///
/// A rename reported without its destination counts as the source going away.
pub fn translate(events: &[Event], shown: &BTreeSet<PathBuf>) -> Vec<WatchEvent> {
    let mut changes: Vec<WatchEvent> = Vec::new();
    let mut renamed: BTreeSet<&Path> = BTreeSet::new();

    for event in events {
        if let EventKind::Modify(ModifyKind::Name(RenameMode::Both)) = event.kind {
            if let [from, to] = event.paths.as_slice() {
                renamed.insert(from.as_path());
                if affects(from, shown) {
                    changes.push(WatchEvent::Moved {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
            }
        }
    }
    for event in events {
        let gone = match event.kind {
            EventKind::Remove(_) => event.paths.first(),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
                .paths
                .first()
                .filter(|path| !renamed.contains(path.as_path())),
            _ => None,
        };
        if let Some(path) = gone.filter(|path| shown.contains(*path)) {
            changes.push(WatchEvent::Gone(path.clone()));
        }
    }

    let mut seen = BTreeSet::new();
    changes.retain(|change| seen.insert(change.clone()));
    changes
}

// Polls the known mountpoints and reports the ones that went away. Stops once
// the watcher is dropped.
fn spawn_mount_monitor(
    mounts: MountTable,
    alive: Arc<AtomicBool>,
    tx: Sender<Signal>,
    wake: impl Fn() + Send + 'static,
) {
    thread::spawn(move || loop {
        thread::sleep(MOUNT_POLL_INTERVAL);
        if !alive.load(Ordering::Relaxed) {
            return;
        }
        for path in mounts.snapshot() {
            if path.parent().is_none() || is_mountpoint(&path) {
                continue;
            }
            mounts.record(&path, false);
            debug!("{} is no longer mounted", path.display());
            if tx.send(Signal::Unmounted(path)).is_err() {
                return;
            }
            wake();
        }
    });
}
