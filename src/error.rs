use crate::ids::{PaneId, SlotId, WindowId};
use crate::location::Location;
use thiserror::Error;

/// The target could not be reached. Navigation does not commit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{0} does not exist")]
    NotFound(Location),
    #[error("{0} is not a folder")]
    NotADirectory(Location),
    #[error("{0} needs to be mounted")]
    MountRequired(Location),
    #[error("unable to mount {location}: {reason}")]
    MountFailed { location: Location, reason: String },
    #[error("permission denied for {0}")]
    PermissionDenied(Location),
    #[error("{0}")]
    Unreachable(String),
}

/// The location resolved but no view could present it. Navigation still
/// commits and an error view is shown instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("no view can display content of type {0}")]
    NoViewForType(String),
    #[error("view failed: {0}")]
    Failed(String),
}

/// Caller errors for window/pane/slot operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("cannot move {requested} steps, only {available} history entries")]
    HistoryOutOfRange { requested: usize, available: usize },
    #[error("unknown slot {0:?}")]
    UnknownSlot(SlotId),
    #[error("unknown pane {0:?}")]
    UnknownPane(PaneId),
    #[error("unknown window {0:?}")]
    UnknownWindow(WindowId),
    #[error("window has no active slot")]
    NoActiveSlot,
    #[error("{0} is not supported by this window")]
    Unsupported(&'static str),
    #[error("split view is already showing")]
    SplitViewActive,
    #[error("split view is not showing")]
    SplitViewInactive,
    #[error("window is closed")]
    WindowClosed,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Error, Debug)]
pub enum HistoryStoreError {
    #[error("could not determine data directory")]
    NoDataDir,
    #[error("history io: {0}")]
    Io(#[from] std::io::Error),
    #[error("history parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("history serialize: {0}")]
    Serialize(#[from] toml::ser::Error),
}
