pub mod directory;
pub mod fs;
pub mod views;
pub mod watcher;
pub mod worker;

pub use directory::{fuzzy_match, read_directory, search_directory};
pub use fs::{DirectoryViewFactory, FsMetadata, FsResolver, MountTable};
pub use views::{DirectoryView, ErrorView, SearchView, GRID_VIEW, LIST_VIEW};
pub use watcher::{DirectoryWatcher, WatchEvent};
pub use worker::{spawn_worker, IoCommand};
