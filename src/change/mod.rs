// Location changes
// Requests, completions and the per-slot controller that sequences them.

mod cancel;
mod controller;

pub use cancel::{CancellationSource, CancellationToken, Ticket};
pub use controller::{Commit, LocationChangeController, Phase, Transition, ViewChange};

use crate::error::{ResolveError, ViewError};
use crate::location::Location;
use crate::services::{ContentView, Resolution};
use bitflags::bitflags;

/// How a committed change rewrites the slot's back and forward lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Standard,
    Back,
    Forward,
    Reload,
    Redirect,
    Fallback,
}

impl ChangeKind {
    /// Reloads and redirects leave both history lists alone.
    pub fn keeps_history(self) -> bool {
        matches!(self, ChangeKind::Reload | ChangeKind::Redirect)
    }
}

/// Which content view the slot should try to use for the new location.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OpenMode {
    #[default]
    Default,
    /// Keep the kind of view currently shown, if the factory can.
    ReuseView,
    View(String),
}

bitflags! {
    /// Where a location opens.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const NEW_TAB = 1 << 0;
        const NEW_WINDOW = 1 << 1;
        /// Close the originating slot once the new one has committed.
        const CLOSE_BEHIND = 1 << 2;
        /// New tabs go to the end of the strip instead of after the current one.
        const SLOT_APPEND = 1 << 3;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NavigationRequest {
    pub target: Location,
    pub kind: ChangeKind,
    /// Extra history entries skipped by Back/Forward.
    pub distance: usize,
    pub mode: OpenMode,
    pub selection: Vec<Location>,
}

impl NavigationRequest {
    pub fn new(target: Location, kind: ChangeKind) -> Self {
        Self {
            target,
            kind,
            distance: 0,
            mode: OpenMode::Default,
            selection: Vec::new(),
        }
    }

    pub fn standard(target: Location) -> Self {
        Self::new(target, ChangeKind::Standard)
    }

    pub fn with_distance(mut self, distance: usize) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_selection(mut self, selection: Vec<Location>) -> Self {
        self.selection = selection;
        self
    }
}

#[derive(Debug)]
pub enum Outcome {
    Resolved(Resolution),
    Mounted(Result<(), ResolveError>),
    ViewCreated(Result<Box<dyn ContentView>, ViewError>),
}

/// Late answer from a collaborator that returned [`Step::Pending`](crate::services::Step).
#[derive(Debug)]
pub struct Completion {
    pub ticket: Ticket,
    pub outcome: Outcome,
}

impl Completion {
    pub fn resolved(ticket: Ticket, resolution: Resolution) -> Self {
        Self {
            ticket,
            outcome: Outcome::Resolved(resolution),
        }
    }

    pub fn mounted(ticket: Ticket, result: Result<(), ResolveError>) -> Self {
        Self {
            ticket,
            outcome: Outcome::Mounted(result),
        }
    }

    pub fn view_created(ticket: Ticket, view: Result<Box<dyn ContentView>, ViewError>) -> Self {
        Self {
            ticket,
            outcome: Outcome::ViewCreated(view),
        }
    }
}
