use crate::change::{Completion, Ticket};
use crate::location::Location;
use crate::services::ResolvedLocation;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use tracing::{debug, trace};

use super::fs::{is_mountpoint, load_view, resolve_location, MountTable};
use crate::services::Resolution;

pub enum IoCommand {
    Resolve {
        ticket: Ticket,
        target: Location,
    },
    Mount {
        ticket: Ticket,
        target: Location,
    },
    LoadView {
        ticket: Ticket,
        resolved: ResolvedLocation,
        preferred: Option<String>,
        show_hidden: bool,
        search_root: PathBuf,
    },
}

impl IoCommand {
    pub fn ticket(&self) -> &Ticket {
        match self {
            IoCommand::Resolve { ticket, .. }
            | IoCommand::Mount { ticket, .. }
            | IoCommand::LoadView { ticket, .. } => ticket,
        }
    }
}

impl std::fmt::Debug for IoCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoCommand::Resolve { target, .. } => write!(f, "Resolve({})", target),
            IoCommand::Mount { target, .. } => write!(f, "Mount({})", target),
            IoCommand::LoadView { resolved, .. } => write!(f, "LoadView({})", resolved.location),
        }
    }
}

/// Run one command. Cancelled tickets are dropped without doing the work.
///
/// Resolved directories are checked for being mountpoints and recorded in
/// `mounts`.
pub fn execute(command: IoCommand, mounts: &MountTable) -> Option<Completion> {
    if command.ticket().is_cancelled() {
        trace!("skipping cancelled {:?}", command);
        return None;
    }
    let completion = match command {
        IoCommand::Resolve { ticket, target } => {
            let resolution = resolve_location(&target);
            if let Resolution::Resolved(resolved) = &resolution {
                if let Some(path) = resolved.location.path() {
                    mounts.record(&path, is_mountpoint(&path));
                }
            }
            Completion::resolved(ticket, resolution)
        }
        // Local paths are always mounted
        IoCommand::Mount { ticket, .. } => Completion::mounted(ticket, Ok(())),
        IoCommand::LoadView {
            ticket,
            resolved,
            preferred,
            show_hidden,
            search_root,
        } => {
            let token = ticket.token.clone();
            let view = load_view(
                &resolved,
                preferred.as_deref(),
                show_hidden,
                &search_root,
                || token.is_cancelled(),
            );
            Completion::view_created(ticket, view)
        }
    };
    Some(completion)
}

/// Start the io thread. `notify` runs after every completion is sent, so a
/// GUI can wake up and deliver it.
pub fn spawn_worker(
    mounts: MountTable,
    notify: impl Fn() + Send + 'static,
) -> (Sender<IoCommand>, Receiver<Completion>) {
    let (cmd_tx, cmd_rx) = channel::<IoCommand>();
    let (res_tx, res_rx) = channel();

    thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            let Some(completion) = execute(cmd, &mounts) else {
                continue;
            };
            if res_tx.send(completion).is_err() {
                break;
            }
            notify();
        }
        debug!("io worker stopped");
    });

    (cmd_tx, res_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{CancellationSource, Outcome};
    use crate::ids::SlotId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn ticket(source: &CancellationSource) -> Ticket {
        Ticket {
            slot: SlotId::next(),
            generation: 1,
            token: source.token(),
        }
    }

    #[test]
    fn resolves_on_the_worker_thread() {
        let dir = TempDir::new().unwrap();
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);
        let (tx, rx) = spawn_worker(MountTable::default(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let source = CancellationSource::new();
        tx.send(IoCommand::Resolve {
            ticket: ticket(&source),
            target: Location::from_path(dir.path()),
        })
        .unwrap();

        let completion = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(
            completion.outcome,
            Outcome::Resolved(Resolution::Resolved(_))
        ));
        drop(tx);
        // The worker notifies after sending
        for _ in 0..50 {
            if notified.load(Ordering::SeqCst) == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancelled_commands_are_skipped() {
        let source = CancellationSource::new();
        let command = IoCommand::Mount {
            ticket: ticket(&source),
            target: Location::from("/"),
        };
        source.cancel();
        assert!(execute(command, &MountTable::default()).is_none());
    }

    #[test]
    fn resolving_records_mountpoints() {
        let mounts = MountTable::default();
        let source = CancellationSource::new();
        let root = IoCommand::Resolve {
            ticket: ticket(&source),
            target: Location::from("/"),
        };
        assert!(execute(root, &mounts).is_some());
        assert!(mounts.contains(std::path::Path::new("/")));

        let dir = TempDir::new().unwrap();
        let plain = IoCommand::Resolve {
            ticket: ticket(&source),
            target: Location::from_path(dir.path()),
        };
        assert!(execute(plain, &mounts).is_some());
        assert!(!mounts.contains(dir.path()));
    }
}
