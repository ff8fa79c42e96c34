// Content views for the filesystem backend
use super::directory::{read_directory, search_directory};
use crate::entry::FileEntry;
use crate::error::ViewError;
use crate::location::Location;
use crate::services::{ContentView, ResolvedLocation};
use std::any::Any;
use std::path::Path;

pub const LIST_VIEW: &str = "list";
pub const GRID_VIEW: &str = "grid";
pub const SEARCH_VIEW: &str = "search";
pub const ERROR_VIEW: &str = "error";

pub const SEARCH_LIMIT: usize = 500;

/// Listing of one directory, shown as a table or as a grid of icons.
#[derive(Debug)]
pub struct DirectoryView {
    location: Location,
    layout: &'static str,
    pub entries: Vec<FileEntry>,
    pub selection: Vec<Location>,
    pub show_hidden: bool,
}

impl DirectoryView {
    pub fn load(location: Location, show_hidden: bool) -> Result<Self, ViewError> {
        let entries = list(&location, show_hidden)?;
        Ok(Self {
            location,
            layout: LIST_VIEW,
            entries,
            selection: Vec::new(),
            show_hidden,
        })
    }

    /// Switch to the layout named by `view_id`. Unknown ids keep the list.
    pub fn with_layout(mut self, view_id: Option<&str>) -> Self {
        self.layout = match view_id {
            Some(GRID_VIEW) => GRID_VIEW,
            _ => LIST_VIEW,
        };
        self
    }

    pub fn is_grid(&self) -> bool {
        self.layout == GRID_VIEW
    }

    pub fn is_selected(&self, entry: &FileEntry) -> bool {
        self.selection
            .iter()
            .any(|loc| loc.path().as_deref() == Some(entry.path.as_path()))
    }
}

fn list(location: &Location, show_hidden: bool) -> Result<Vec<FileEntry>, ViewError> {
    let path = location
        .path()
        .ok_or_else(|| ViewError::NoViewForType(location.scheme().to_string()))?;
    read_directory(&path, show_hidden).map_err(|e| ViewError::Failed(e.to_string()))
}

impl ContentView for DirectoryView {
    fn view_id(&self) -> &str {
        self.layout
    }

    fn location(&self) -> &Location {
        &self.location
    }

    // Listings are re-read on the io worker; the slot carries the selection over
    fn reload(&mut self, _resolved: &ResolvedLocation) -> bool {
        false
    }

    fn select(&mut self, selection: &[Location]) {
        self.selection = selection.to_vec();
    }

    fn selection(&self) -> Vec<Location> {
        self.selection.clone()
    }

    fn zoom_level(&self) -> Option<i32> {
        self.is_grid().then_some(100)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Files under the search root whose names match the query.
#[derive(Debug)]
pub struct SearchView {
    location: Location,
    pub query: String,
    pub hits: Vec<FileEntry>,
    pub truncated: bool,
}

impl SearchView {
    pub fn run(location: Location, root: &Path, cancelled: impl Fn() -> bool) -> Self {
        let query = location.search_query().unwrap_or_default().to_string();
        let hits = search_directory(root, &query, SEARCH_LIMIT, cancelled);
        Self {
            truncated: hits.len() >= SEARCH_LIMIT,
            location,
            query,
            hits,
        }
    }
}

impl ContentView for SearchView {
    fn view_id(&self) -> &str {
        SEARCH_VIEW
    }

    fn location(&self) -> &Location {
        &self.location
    }

    // Searches are re-run by building a new view
    fn reload(&mut self, _resolved: &ResolvedLocation) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Shown in place of a view that could not be built.
#[derive(Debug)]
pub struct ErrorView {
    location: Location,
    pub message: String,
}

impl ErrorView {
    pub fn new(location: Location, error: &ViewError) -> Self {
        Self {
            location,
            message: error.to_string(),
        }
    }
}

impl ContentView for ErrorView {
    fn view_id(&self) -> &str {
        ERROR_VIEW
    }

    fn location(&self) -> &Location {
        &self.location
    }

    fn reload(&mut self, _resolved: &ResolvedLocation) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::DIRECTORY_TYPE;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn directory_view_never_rereads_on_the_caller_thread() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("one"), b"").unwrap();
        let location = Location::from_path(dir.path());
        let mut view = DirectoryView::load(location.clone(), false).unwrap();
        view.select(&[Location::from_path(&dir.path().join("one"))]);

        fs::write(dir.path().join("two"), b"").unwrap();
        let resolved = ResolvedLocation::new(location, DIRECTORY_TYPE);
        assert!(!view.reload(&resolved));
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.selection().len(), 1);
    }

    #[test]
    fn layout_follows_the_requested_view() {
        let dir = TempDir::new().unwrap();
        let location = Location::from_path(dir.path());
        let grid = DirectoryView::load(location.clone(), false)
            .unwrap()
            .with_layout(Some(GRID_VIEW));
        assert_eq!(grid.view_id(), GRID_VIEW);
        assert_eq!(grid.zoom_level(), Some(100));

        let list = DirectoryView::load(location, false)
            .unwrap()
            .with_layout(Some("columns"));
        assert_eq!(list.view_id(), LIST_VIEW);
        assert_eq!(list.zoom_level(), None);
    }

    #[test]
    fn selection_matches_entries() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        let mut view = DirectoryView::load(Location::from_path(dir.path()), false).unwrap();
        view.select(&[Location::from_path(&dir.path().join("docs"))]);
        let entry = view.entries[0].clone();
        assert!(view.is_selected(&entry));
    }

    #[test]
    fn unreadable_directory_is_a_view_error() {
        let dir = TempDir::new().unwrap();
        let missing = Location::from_path(&dir.path().join("missing"));
        assert!(matches!(
            DirectoryView::load(missing, false),
            Err(ViewError::Failed(_))
        ));
        assert!(matches!(
            DirectoryView::load(Location::from("trash:///"), false),
            Err(ViewError::NoViewForType(_))
        ));
    }

    #[test]
    fn search_view_collects_hits() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("report.pdf"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        let mut view = SearchView::run(Location::search("rep"), dir.path(), || false);
        assert_eq!(view.hits.len(), 1);
        assert!(!view.truncated);
        let resolved = ResolvedLocation::new(Location::search("rep"), "x");
        assert!(!view.reload(&resolved));
    }
}
