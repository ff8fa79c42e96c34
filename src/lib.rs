//! Navigation core of the heike-nav file manager: windows split into panes,
//! panes holding slots (tabs), and the asynchronous location-change machine
//! that moves a slot from one location to the next.

pub mod app;
pub mod change;
pub mod config;
pub mod entry;
pub mod error;
pub mod event;
pub mod history;
pub mod ids;
pub mod input;
pub mod io;
pub mod location;
pub mod services;
pub mod state;

pub use app::Application;
pub use change::{ChangeKind, Completion, NavigationRequest, OpenFlags, OpenMode};
pub use config::Config;
pub use error::{NavigationError, ResolveError, ViewError};
pub use event::{HistoryEvent, WindowEvent};
pub use history::{HistoryEntry, HistoryList};
pub use ids::{PaneId, SlotId, WindowId};
pub use location::Location;
pub use services::Services;
pub use state::{Capabilities, Pane, Slot, Window};
