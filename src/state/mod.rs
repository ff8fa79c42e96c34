pub mod chrome;
pub mod navigation;
pub mod pane;
pub mod slot;
pub mod window;

pub use chrome::{PaneChrome, WindowChrome};
pub use navigation::NavigationHistory;
pub use pane::Pane;
pub use slot::{Delivery, Slot, LOADING_TITLE};
pub use window::{Capabilities, Closed, Lifecycle, NewWindowRequest, Window, WindowSettings};
