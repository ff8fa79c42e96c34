// Filesystem collaborators
// Resolution and view loading are queued to the worker thread. Metadata is
// answered from what the worker already found out, without touching the disk.

use super::views::{DirectoryView, ErrorView, SearchView};
use super::worker::IoCommand;
use crate::change::Ticket;
use crate::error::{ResolveError, ViewError};
use crate::location::Location;
use crate::services::{
    ContentView, FileMetadata, FileMetadataProvider, LocationResolver, Resolution,
    ResolvedLocation, Step, ViewFactory, DIRECTORY_TYPE, SEARCH_TYPE,
};
use std::fs;
use std::io::ErrorKind;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, trace};

/// Mountpoints seen by the io worker, shared with metadata lookups and the
/// unmount monitor.
#[derive(Clone, Debug, Default)]
pub struct MountTable {
    inner: Arc<Mutex<BTreeSet<PathBuf>>>,
}

impl MountTable {
    fn lock(&self) -> MutexGuard<'_, BTreeSet<PathBuf>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, path: &Path, mounted: bool) {
        let mut mounts = self.lock();
        if mounted {
            mounts.insert(path.to_path_buf());
        } else {
            mounts.remove(path);
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.lock().iter().cloned().collect()
    }
}

pub fn resolve_location(target: &Location) -> Resolution {
    if target.is_search() {
        return Resolution::Resolved(ResolvedLocation::new(target.clone(), SEARCH_TYPE));
    }
    let Some(path) = target.path() else {
        return Resolution::Failed(ResolveError::Unreachable(format!(
            "{} locations are not supported",
            target.scheme()
        )));
    };
    match fs::metadata(&path) {
        Ok(meta) if meta.is_dir() => {
            Resolution::Resolved(ResolvedLocation::new(target.clone(), DIRECTORY_TYPE))
        }
        Ok(_) => Resolution::Failed(ResolveError::NotADirectory(target.clone())),
        Err(e) => Resolution::Failed(match e.kind() {
            ErrorKind::NotFound => ResolveError::NotFound(target.clone()),
            ErrorKind::PermissionDenied => ResolveError::PermissionDenied(target.clone()),
            _ => ResolveError::Unreachable(format!("{}: {}", target, e)),
        }),
    }
}

/// Build the view for `resolved`. `preferred` picks the directory layout.
pub fn load_view(
    resolved: &ResolvedLocation,
    preferred: Option<&str>,
    show_hidden: bool,
    search_root: &Path,
    cancelled: impl Fn() -> bool,
) -> Result<Box<dyn ContentView>, ViewError> {
    match resolved.content_type.as_str() {
        SEARCH_TYPE => Ok(Box::new(SearchView::run(
            resolved.location.clone(),
            search_root,
            cancelled,
        ))),
        DIRECTORY_TYPE => Ok(Box::new(
            DirectoryView::load(resolved.location.clone(), show_hidden)?.with_layout(preferred),
        )),
        other => Err(ViewError::NoViewForType(other.to_string())),
    }
}

fn queue<T>(commands: &Sender<IoCommand>, command: IoCommand, stopped: impl FnOnce() -> T) -> Step<T> {
    match commands.send(command) {
        Ok(()) => Step::Pending,
        Err(_) => {
            error!("io worker is gone");
            Step::Ready(stopped())
        }
    }
}

#[derive(Debug)]
pub struct FsResolver {
    commands: Sender<IoCommand>,
}

impl FsResolver {
    pub fn new(commands: Sender<IoCommand>) -> Self {
        Self { commands }
    }
}

impl LocationResolver for FsResolver {
    fn resolve(&mut self, ticket: &Ticket, target: &Location) -> Step<Resolution> {
        trace!("queueing resolve of {}", target);
        let command = IoCommand::Resolve {
            ticket: ticket.clone(),
            target: target.clone(),
        };
        queue(&self.commands, command, || {
            Resolution::Failed(ResolveError::Unreachable("io worker stopped".into()))
        })
    }

    fn mount(&mut self, ticket: &Ticket, target: &Location) -> Step<Result<(), ResolveError>> {
        let command = IoCommand::Mount {
            ticket: ticket.clone(),
            target: target.clone(),
        };
        queue(&self.commands, command, || {
            Err(ResolveError::Unreachable("io worker stopped".into()))
        })
    }
}

#[derive(Debug)]
pub struct DirectoryViewFactory {
    commands: Sender<IoCommand>,
    search_root: PathBuf,
    pub show_hidden: bool,
}

impl DirectoryViewFactory {
    pub fn new(commands: Sender<IoCommand>, search_root: PathBuf) -> Self {
        Self {
            commands,
            search_root,
            show_hidden: false,
        }
    }
}

impl ViewFactory for DirectoryViewFactory {
    fn create_view(
        &mut self,
        ticket: &Ticket,
        resolved: &ResolvedLocation,
        preferred: Option<&str>,
    ) -> Step<Result<Box<dyn ContentView>, ViewError>> {
        let command = IoCommand::LoadView {
            ticket: ticket.clone(),
            resolved: resolved.clone(),
            preferred: preferred.map(str::to_string),
            show_hidden: self.show_hidden,
            search_root: self.search_root.clone(),
        };
        queue(&self.commands, command, || {
            Err(ViewError::Failed("io worker stopped".into()))
        })
    }

    fn error_view(&self, location: &Location, error: &ViewError) -> Box<dyn ContentView> {
        Box::new(ErrorView::new(location.clone(), error))
    }
}

#[derive(Debug)]
pub struct FsMetadata {
    home: Location,
    mounts: MountTable,
}

impl FsMetadata {
    pub fn new(home: Location, mounts: MountTable) -> Self {
        Self { home, mounts }
    }
}

impl FileMetadataProvider for FsMetadata {
    fn get(&self, location: &Location) -> FileMetadata {
        let is_mountpoint = location
            .path()
            .is_some_and(|path| path.parent().is_none() || self.mounts.contains(&path));
        let icon = if location.is_search() {
            "folder-saved-search"
        } else if location.is_trash() {
            "user-trash"
        } else if location == &self.home {
            "user-home"
        } else if is_mountpoint {
            "drive-harddisk"
        } else {
            "folder"
        };
        let mime_type = if location.is_search() {
            SEARCH_TYPE
        } else {
            DIRECTORY_TYPE
        };
        FileMetadata {
            display_name: location.display_name(),
            icon: icon.to_string(),
            is_trash: location.is_trash(),
            is_mountpoint,
            mime_type: mime_type.to_string(),
        }
    }
}

#[cfg(unix)]
pub(crate) fn is_mountpoint(path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    let Some(parent) = path.parent() else {
        return true;
    };
    match (fs::metadata(path), fs::metadata(parent)) {
        (Ok(own), Ok(above)) => own.dev() != above.dev(),
        _ => false,
    }
}

#[cfg(not(unix))]
pub(crate) fn is_mountpoint(path: &Path) -> bool {
    path.parent().is_none()
}
