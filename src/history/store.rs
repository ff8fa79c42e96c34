// Backing stores for the history list
use super::HistoryEntry;
use crate::error::HistoryStoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Where visited locations are remembered between runs.
///
/// `all` returns entries oldest first, in the order they were appended.
pub trait HistoryStore: fmt::Debug {
    fn append(&mut self, entry: &HistoryEntry) -> Result<(), HistoryStoreError>;
    fn all(&self) -> Result<Vec<HistoryEntry>, HistoryStoreError>;
    fn replace_all(&mut self, entries: &[HistoryEntry]) -> Result<(), HistoryStoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    entries: Vec<HistoryEntry>,
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&mut self, entry: &HistoryEntry) -> Result<(), HistoryStoreError> {
        self.entries.push(entry.clone());
        Ok(())
    }

    fn all(&self) -> Result<Vec<HistoryEntry>, HistoryStoreError> {
        Ok(self.entries.clone())
    }

    fn replace_all(&mut self, entries: &[HistoryEntry]) -> Result<(), HistoryStoreError> {
        self.entries = entries.to_vec();
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Default)]
struct HistoryFile {
    #[serde(default)]
    entry: Vec<HistoryEntry>,
}

/// History kept in a TOML file as an array of `[[entry]]` tables.
///
/// Appends write a single table to the end of the file, so a crash never
/// loses more than the entry being written.
#[derive(Debug, Clone)]
pub struct TomlHistoryStore {
    path: PathBuf,
}

impl TomlHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the path to the history file
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "heike-nav")
            .map(|dirs| dirs.data_dir().join("history.toml"))
    }

    pub fn open_default() -> Result<Self, HistoryStoreError> {
        Self::default_path()
            .map(Self::new)
            .ok_or(HistoryStoreError::NoDataDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(&self) -> Result<(), HistoryStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl HistoryStore for TomlHistoryStore {
    fn append(&mut self, entry: &HistoryEntry) -> Result<(), HistoryStoreError> {
        self.ensure_parent()?;
        let chunk = toml::to_string(&HistoryFile {
            entry: vec![entry.clone()],
        })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", chunk)?;
        Ok(())
    }

    fn all(&self) -> Result<Vec<HistoryEntry>, HistoryStoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        let file: HistoryFile = toml::from_str(&contents)?;
        Ok(file.entry)
    }

    fn replace_all(&mut self, entries: &[HistoryEntry]) -> Result<(), HistoryStoreError> {
        self.ensure_parent()?;
        let contents = toml::to_string_pretty(&HistoryFile {
            entry: entries.to_vec(),
        })?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryList;

    #[test]
    fn toml_store_appends_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TomlHistoryStore::new(dir.path().join("nested/history.toml"));
        store.append(&HistoryEntry::new("/a".into())).unwrap();
        store
            .append(&HistoryEntry::new("/b".into()).with_icon("folder"))
            .unwrap();

        let all = store.all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].location, "/a".into());
        assert_eq!(all[1].icon.as_deref(), Some("folder"));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlHistoryStore::new(dir.path().join("history.toml"));
        assert!(store.all().unwrap().is_empty());
    }

    #[test]
    fn history_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.toml");
        {
            let mut list = HistoryList::new(Box::new(TomlHistoryStore::new(&path)), 3);
            for loc in ["/a", "/b", "/c", "/d", "/b"] {
                list.add(HistoryEntry::new(loc.into()));
            }
        }
        let list = HistoryList::load(Box::new(TomlHistoryStore::new(&path)), 3);
        let names: Vec<String> = list.entries().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["b", "d", "c"]);
    }

    #[test]
    fn revisits_do_not_grow_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.toml");
        let mut list = HistoryList::new(Box::new(TomlHistoryStore::new(&path)), 3);
        for round in 0..200 {
            let loc = if round % 2 == 0 { "/a" } else { "/b" };
            list.add(HistoryEntry::new(loc.into()));
        }
        assert_eq!(list.len(), 2);

        let stored = TomlHistoryStore::new(&path).all().unwrap();
        assert!(stored.len() <= list.len() + list.max_entries(), "{} entries on disk", stored.len());
        let reloaded = HistoryList::load(Box::new(TomlHistoryStore::new(&path)), 3);
        let names: Vec<String> = reloaded.entries().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn oversized_file_is_compacted_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.toml");
        let mut store = TomlHistoryStore::new(&path);
        for round in 0..20 {
            let loc = if round % 2 == 0 { "/a" } else { "/b" };
            store.append(&HistoryEntry::new(loc.into())).unwrap();
        }
        let list = HistoryList::load(Box::new(TomlHistoryStore::new(&path)), 3);
        assert_eq!(list.len(), 2);
        assert_eq!(TomlHistoryStore::new(&path).all().unwrap().len(), 2);
    }

    #[test]
    fn corrupt_file_loads_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.toml");
        fs::write(&path, "this is = = not toml").unwrap();
        let list = HistoryList::load(Box::new(TomlHistoryStore::new(&path)), 3);
        assert!(list.is_empty());
    }
}
