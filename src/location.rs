// Navigable locations
// URI-like identifiers for everything a slot can point at

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const FILE_SCHEME: &str = "file";
pub const SEARCH_SCHEME: &str = "x-heike-search";
pub const TRASH_SCHEME: &str = "trash";

/// A navigable target.
///
/// Locations are stored as URIs. Plain absolute paths are normalized into
/// `file://` URIs so `Location::from("/home")` and
/// `Location::from("file:///home")` compare equal.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Location(String);

impl Location {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.contains("://") {
            return Self(normalize_uri(raw));
        }
        Self::from_path(Path::new(raw))
    }

    pub fn from_path(path: &Path) -> Self {
        let text = path.to_string_lossy();
        let trimmed = text.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed };
        Self(format!("{}://{}", FILE_SCHEME, trimmed))
    }

    /// Transient search pseudo-location. Never recorded in history and never
    /// propagated to a new pane.
    pub fn search(query: &str) -> Self {
        Self(format!("{}://{}", SEARCH_SCHEME, query.trim()))
    }

    pub fn as_uri(&self) -> &str {
        &self.0
    }

    pub fn scheme(&self) -> &str {
        self.0.split_once("://").map(|(s, _)| s).unwrap_or(FILE_SCHEME)
    }

    fn rest(&self) -> &str {
        self.0.split_once("://").map(|(_, r)| r).unwrap_or(&self.0)
    }

    pub fn is_search(&self) -> bool {
        self.scheme() == SEARCH_SCHEME
    }

    pub fn is_trash(&self) -> bool {
        self.scheme() == TRASH_SCHEME
    }

    pub fn is_local(&self) -> bool {
        self.scheme() == FILE_SCHEME
    }

    /// Filesystem path for `file://` locations.
    pub fn path(&self) -> Option<PathBuf> {
        if self.is_local() {
            Some(PathBuf::from(self.rest()))
        } else {
            None
        }
    }

    /// Search text of a search pseudo-location.
    pub fn search_query(&self) -> Option<&str> {
        if self.is_search() {
            Some(self.rest())
        } else {
            None
        }
    }

    pub fn parent(&self) -> Option<Location> {
        if self.is_search() {
            return None;
        }
        if let Some(path) = self.path() {
            return path.parent().map(Location::from_path);
        }
        let rest = self.rest();
        if rest == "/" {
            return None;
        }
        let (head, _) = rest.rsplit_once('/')?;
        if head.is_empty() {
            // "trash:///file" -> "trash:///"
            return rest
                .starts_with('/')
                .then(|| Self(format!("{}:///", self.scheme())));
        }
        Some(Self(format!("{}://{}", self.scheme(), head)))
    }

    /// True if `self` equals `root` or lies underneath it.
    pub fn has_prefix(&self, root: &Location) -> bool {
        if self == root {
            return true;
        }
        if self.scheme() != root.scheme() {
            return false;
        }
        let base = root.rest();
        let rest = self.rest();
        if base == "/" {
            return rest.starts_with('/');
        }
        rest.strip_prefix(base)
            .map(|tail| tail.starts_with('/'))
            .unwrap_or(false)
    }

    /// Rewrite `self` as if `from` had been moved to `to`.
    ///
    /// Returns `None` when `self` does not lie under `from`.
    pub fn rebase(&self, from: &Location, to: &Location) -> Option<Location> {
        if !self.has_prefix(from) {
            return None;
        }
        let tail = self.rest()[from.rest().len()..].trim_start_matches('/');
        if tail.is_empty() {
            return Some(to.clone());
        }
        let base = to.0.trim_end_matches('/');
        Some(Self(format!("{}/{}", base, tail)))
    }

    /// Last path component, or the whole remainder for roots and searches.
    pub fn display_name(&self) -> String {
        if let Some(query) = self.search_query() {
            return format!("Search for \u{201c}{}\u{201d}", query);
        }
        let rest = self.rest();
        match rest.rsplit_once('/') {
            Some((_, name)) if !name.is_empty() => name.to_string(),
            _ if rest.is_empty() || rest == "/" => "/".to_string(),
            _ => rest.trim_matches('/').to_string(),
        }
    }
}

fn normalize_uri(raw: &str) -> String {
    match raw.split_once("://") {
        Some((scheme, rest)) => {
            let trimmed = rest.trim_end_matches('/');
            let rest = if trimmed.is_empty() && rest.starts_with('/') {
                "/"
            } else {
                trimmed
            };
            format!("{}://{}", scheme, rest)
        }
        None => raw.to_string(),
    }
}

impl From<&str> for Location {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for Location {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&Path> for Location {
    fn from(value: &Path) -> Self {
        Self::from_path(value)
    }
}

impl From<PathBuf> for Location {
    fn from(value: PathBuf) -> Self {
        Self::from_path(&value)
    }
}

impl From<Location> for String {
    fn from(value: Location) -> Self {
        value.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path() {
            Some(path) => write!(f, "{}", path.display()),
            None => f.write_str(&self.0),
        }
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location({})", self.0)
    }
}
