// In-memory collaborators
// A scripted location tree for headless embedding and tests. Answers can be
// immediate or queued as completions the caller delivers in any order.

use super::{
    ContentView, FileMetadata, FileMetadataProvider, LocationResolver, Resolution,
    ResolvedLocation, Services, Step, ViewFactory, DIRECTORY_TYPE, SEARCH_TYPE,
};
use crate::change::{Completion, Ticket};
use crate::error::{ResolveError, ViewError};
use crate::history::{HistoryList, DEFAULT_MAX_ENTRIES};
use crate::location::Location;
use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

#[derive(Debug, Default)]
struct Tree {
    locations: BTreeMap<Location, String>,
    unmounted: BTreeSet<Location>,
    mountpoints: BTreeSet<Location>,
    ineffective_mounts: BTreeSet<Location>,
    failing_mounts: BTreeSet<Location>,
    broken_views: BTreeSet<Location>,
    rebuilt_views: BTreeSet<Location>,
    asynchronous: bool,
    queue: Vec<Completion>,
    resolve_calls: usize,
    mount_calls: usize,
}

impl Tree {
    fn unmounted_root(&self, target: &Location) -> Option<Location> {
        self.unmounted
            .iter()
            .find(|root| target.has_prefix(root))
            .cloned()
    }

    fn resolve(&mut self, target: &Location) -> Resolution {
        self.resolve_calls += 1;
        if target.is_search() {
            return Resolution::Resolved(ResolvedLocation::new(target.clone(), SEARCH_TYPE));
        }
        if self.unmounted_root(target).is_some() {
            return Resolution::MountRequired;
        }
        match self.locations.get(target) {
            Some(content_type) => {
                Resolution::Resolved(ResolvedLocation::new(target.clone(), content_type.clone()))
            }
            None => Resolution::Failed(ResolveError::NotFound(target.clone())),
        }
    }

    fn mount(&mut self, target: &Location) -> Result<(), ResolveError> {
        self.mount_calls += 1;
        let Some(root) = self.unmounted_root(target) else {
            return Ok(());
        };
        if self.failing_mounts.contains(&root) {
            return Err(ResolveError::MountFailed {
                location: root,
                reason: "device is busy".into(),
            });
        }
        if !self.ineffective_mounts.contains(&root) {
            self.unmounted.remove(&root);
            self.mountpoints.insert(root);
        }
        Ok(())
    }

    fn create_view(
        &self,
        resolved: &ResolvedLocation,
        preferred: Option<&str>,
    ) -> Result<Box<dyn ContentView>, ViewError> {
        if self.broken_views.contains(&resolved.location) {
            return Err(ViewError::Failed(format!(
                "{} could not be displayed",
                resolved.location
            )));
        }
        let id = match resolved.content_type.as_str() {
            SEARCH_TYPE => "search",
            DIRECTORY_TYPE => match preferred {
                Some("grid") => "grid",
                _ => "list",
            },
            other => return Err(ViewError::NoViewForType(other.to_string())),
        };
        let mut view = MemoryView::new(id, resolved.location.clone());
        view.rebuilds = self.rebuilt_views.contains(&resolved.location);
        Ok(Box::new(view))
    }
}

/// Shared handle on the scripted tree. Clones observe the same state.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    tree: Rc<RefCell<Tree>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_directory(&self, location: impl Into<Location>) {
        self.add_location(location, DIRECTORY_TYPE);
    }

    pub fn add_location(&self, location: impl Into<Location>, content_type: &str) {
        self.tree
            .borrow_mut()
            .locations
            .insert(location.into(), content_type.to_string());
    }

    pub fn remove(&self, location: impl Into<Location>) {
        let location = location.into();
        self.tree
            .borrow_mut()
            .locations
            .retain(|known, _| !known.has_prefix(&location));
    }

    /// A directory that only resolves after it has been mounted.
    pub fn add_unmounted(&self, location: impl Into<Location>) {
        let location = location.into();
        let mut tree = self.tree.borrow_mut();
        tree.locations
            .insert(location.clone(), DIRECTORY_TYPE.to_string());
        tree.unmounted.insert(location);
    }

    /// Mounting reports success but the volume never shows up.
    pub fn mount_without_effect(&self, location: impl Into<Location>) {
        self.tree
            .borrow_mut()
            .ineffective_mounts
            .insert(location.into());
    }

    pub fn fail_mount(&self, location: impl Into<Location>) {
        self.tree.borrow_mut().failing_mounts.insert(location.into());
    }

    /// Views for this location fail to build.
    pub fn break_view(&self, location: impl Into<Location>) {
        self.tree.borrow_mut().broken_views.insert(location.into());
    }

    /// Views for this location cannot refresh in place; reloads build a new one.
    pub fn rebuild_on_reload(&self, location: impl Into<Location>) {
        self.tree.borrow_mut().rebuilt_views.insert(location.into());
    }

    /// Queue every answer instead of returning it immediately.
    pub fn set_asynchronous(&self, asynchronous: bool) {
        self.tree.borrow_mut().asynchronous = asynchronous;
    }

    pub fn take_completions(&self) -> Vec<Completion> {
        std::mem::take(&mut self.tree.borrow_mut().queue)
    }

    pub fn pending(&self) -> usize {
        self.tree.borrow().queue.len()
    }

    pub fn resolve_calls(&self) -> usize {
        self.tree.borrow().resolve_calls
    }

    pub fn mount_calls(&self) -> usize {
        self.tree.borrow().mount_calls
    }

    pub fn resolver(&self) -> MemoryResolver {
        MemoryResolver {
            tree: Rc::clone(&self.tree),
        }
    }

    pub fn views(&self) -> MemoryViewFactory {
        MemoryViewFactory {
            tree: Rc::clone(&self.tree),
        }
    }

    pub fn metadata(&self, home: Location) -> MemoryMetadata {
        MemoryMetadata {
            tree: Rc::clone(&self.tree),
            home,
        }
    }

    /// Services wired to this tree with an unpersisted history list.
    pub fn services(&self, home: Location) -> Services {
        Services::new(
            Box::new(self.resolver()),
            Box::new(self.views()),
            Box::new(self.metadata(home.clone())),
            HistoryList::in_memory(DEFAULT_MAX_ENTRIES),
            home,
        )
    }
}

#[derive(Debug)]
pub struct MemoryResolver {
    tree: Rc<RefCell<Tree>>,
}

impl LocationResolver for MemoryResolver {
    fn resolve(&mut self, ticket: &Ticket, target: &Location) -> Step<Resolution> {
        let mut tree = self.tree.borrow_mut();
        let resolution = tree.resolve(target);
        if tree.asynchronous {
            tree.queue.push(Completion::resolved(ticket.clone(), resolution));
            return Step::Pending;
        }
        Step::Ready(resolution)
    }

    fn mount(&mut self, ticket: &Ticket, target: &Location) -> Step<Result<(), ResolveError>> {
        let mut tree = self.tree.borrow_mut();
        let result = tree.mount(target);
        if tree.asynchronous {
            tree.queue.push(Completion::mounted(ticket.clone(), result));
            return Step::Pending;
        }
        Step::Ready(result)
    }
}

#[derive(Debug)]
pub struct MemoryViewFactory {
    tree: Rc<RefCell<Tree>>,
}

impl ViewFactory for MemoryViewFactory {
    fn create_view(
        &mut self,
        ticket: &Ticket,
        resolved: &ResolvedLocation,
        preferred: Option<&str>,
    ) -> Step<Result<Box<dyn ContentView>, ViewError>> {
        let mut tree = self.tree.borrow_mut();
        let view = tree.create_view(resolved, preferred);
        if tree.asynchronous {
            tree.queue.push(Completion::view_created(ticket.clone(), view));
            return Step::Pending;
        }
        Step::Ready(view)
    }

    fn error_view(&self, location: &Location, error: &ViewError) -> Box<dyn ContentView> {
        let mut view = MemoryView::new("error", location.clone());
        view.message = Some(error.to_string());
        Box::new(view)
    }
}

#[derive(Debug)]
pub struct MemoryMetadata {
    tree: Rc<RefCell<Tree>>,
    home: Location,
}

impl FileMetadataProvider for MemoryMetadata {
    fn get(&self, location: &Location) -> FileMetadata {
        let tree = self.tree.borrow();
        let is_mountpoint = tree.mountpoints.contains(location);
        let icon = if location.is_search() {
            "folder-saved-search"
        } else if location.is_trash() {
            "user-trash"
        } else if location == &self.home {
            "user-home"
        } else if is_mountpoint {
            "drive-removable-media"
        } else {
            "folder"
        };
        FileMetadata {
            display_name: location.display_name(),
            icon: icon.to_string(),
            is_trash: location.is_trash(),
            is_mountpoint,
            mime_type: tree
                .locations
                .get(location)
                .cloned()
                .unwrap_or_else(|| DIRECTORY_TYPE.to_string()),
        }
    }
}

/// View that records what was asked of it.
#[derive(Debug, Clone)]
pub struct MemoryView {
    id: String,
    location: Location,
    pub reloads: usize,
    pub selection: Vec<Location>,
    pub message: Option<String>,
    pub rebuilds: bool,
}

impl MemoryView {
    pub fn new(id: &str, location: Location) -> Self {
        Self {
            id: id.to_string(),
            location,
            reloads: 0,
            selection: Vec::new(),
            message: None,
            rebuilds: false,
        }
    }
}

impl ContentView for MemoryView {
    fn view_id(&self) -> &str {
        &self.id
    }

    fn location(&self) -> &Location {
        &self.location
    }

    fn reload(&mut self, _resolved: &ResolvedLocation) -> bool {
        if self.message.is_some() || self.rebuilds {
            return false;
        }
        self.reloads += 1;
        true
    }

    fn select(&mut self, selection: &[Location]) {
        self.selection = selection.to_vec();
    }

    fn selection(&self) -> Vec<Location> {
        self.selection.clone()
    }

    fn zoom_level(&self) -> Option<i32> {
        (self.id == "grid").then_some(100)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
