// Collaborators of the navigation core
// Resolution, view construction and metadata live behind these traits so the
// core can run against the filesystem, a remote backend, or a test script.

pub mod memory;

use crate::change::Ticket;
use crate::error::{ResolveError, ViewError};
use crate::history::HistoryList;
use crate::location::Location;
use std::any::Any;
use std::fmt;

pub const DIRECTORY_TYPE: &str = "inode/directory";
pub const SEARCH_TYPE: &str = "x-heike/search";

/// Result of a collaborator call that may finish later.
///
/// `Pending` means the collaborator kept the ticket and will hand a
/// [`Completion`](crate::change::Completion) to the application once done.
#[derive(Debug)]
pub enum Step<T> {
    Ready(T),
    Pending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub location: Location,
    pub content_type: String,
}

impl ResolvedLocation {
    pub fn new(location: Location, content_type: impl Into<String>) -> Self {
        Self {
            location,
            content_type: content_type.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedLocation),
    MountRequired,
    Failed(ResolveError),
}

pub trait LocationResolver {
    fn resolve(&mut self, ticket: &Ticket, target: &Location) -> Step<Resolution>;
    fn mount(&mut self, ticket: &Ticket, target: &Location) -> Step<Result<(), ResolveError>>;
}

pub trait ViewFactory {
    /// `preferred` is the id of the view the caller would like to keep using.
    fn create_view(
        &mut self,
        ticket: &Ticket,
        resolved: &ResolvedLocation,
        preferred: Option<&str>,
    ) -> Step<Result<Box<dyn ContentView>, ViewError>>;

    /// Stand-in shown when no real view could be built.
    fn error_view(&self, location: &Location, error: &ViewError) -> Box<dyn ContentView>;
}

/// Presentation of one location inside a slot.
pub trait ContentView: fmt::Debug + Send {
    fn view_id(&self) -> &str;

    fn location(&self) -> &Location;

    /// Refresh in place. Returning false asks the slot to build a new view.
    fn reload(&mut self, resolved: &ResolvedLocation) -> bool;

    fn select(&mut self, _selection: &[Location]) {}

    fn selection(&self) -> Vec<Location> {
        Vec::new()
    }

    fn zoom_level(&self) -> Option<i32> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileMetadata {
    pub display_name: String,
    pub icon: String,
    pub is_trash: bool,
    pub is_mountpoint: bool,
    pub mime_type: String,
}

pub trait FileMetadataProvider {
    fn get(&self, location: &Location) -> FileMetadata;
}

/// Everything a slot needs to navigate, shared by all windows of an
/// application.
pub struct Services {
    pub resolver: Box<dyn LocationResolver>,
    pub views: Box<dyn ViewFactory>,
    pub metadata: Box<dyn FileMetadataProvider>,
    pub history: HistoryList,
    pub home: Location,
}

impl Services {
    pub fn new(
        resolver: Box<dyn LocationResolver>,
        views: Box<dyn ViewFactory>,
        metadata: Box<dyn FileMetadataProvider>,
        history: HistoryList,
        home: Location,
    ) -> Self {
        Self {
            resolver,
            views,
            metadata,
            history,
            home,
        }
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("history", &self.history.len())
            .field("home", &self.home)
            .finish()
    }
}
