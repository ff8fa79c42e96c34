// Process-wide history list
// Most-recent-first record of visited locations, shared by every window.

mod store;

pub use store::{HistoryStore, MemoryHistoryStore, TomlHistoryStore};

use crate::event::{EventBus, HistoryEvent};
use crate::location::Location;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Receiver;
use tracing::{debug, warn};

pub const DEFAULT_MAX_ENTRIES: usize = 50;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub location: Location,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub has_custom_name: bool,
    pub visited: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(location: Location) -> Self {
        let name = location.display_name();
        Self {
            location,
            name,
            icon: None,
            has_custom_name: false,
            visited: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

#[derive(Debug)]
pub struct HistoryList {
    entries: Vec<HistoryEntry>,
    max_entries: usize,
    store: Box<dyn HistoryStore>,
    appended_since_compaction: usize,
    bus: EventBus<HistoryEvent>,
}

impl HistoryList {
    pub fn new(store: Box<dyn HistoryStore>, max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max_entries.max(1),
            store,
            appended_since_compaction: 0,
            bus: EventBus::new(),
        }
    }

    /// In-memory list that is never persisted.
    pub fn in_memory(max_entries: usize) -> Self {
        Self::new(Box::new(MemoryHistoryStore::default()), max_entries)
    }

    /// Build the list from everything the store remembers.
    ///
    /// A broken store yields an empty list; history is never worth failing
    /// startup over.
    pub fn load(store: Box<dyn HistoryStore>, max_entries: usize) -> Self {
        let mut list = Self::new(store, max_entries);
        match list.store.all() {
            Ok(saved) => {
                let stored = saved.len();
                for entry in saved {
                    list.insert_front(entry);
                }
                debug!("Loaded {} history entries", list.entries.len());
                if stored > list.entries.len() + list.max_entries {
                    list.compact();
                }
            }
            Err(e) => warn!("Failed to load history: {}", e),
        }
        list
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn get(&self, location: &Location) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| &e.location == location)
    }

    pub fn subscribe(&mut self) -> Receiver<HistoryEvent> {
        self.bus.subscribe()
    }

    /// Record a visit. Returns false when nothing changed: search
    /// pseudo-locations are skipped and revisiting the most recent location
    /// only refreshes its metadata.
    pub fn add(&mut self, entry: HistoryEntry) -> bool {
        if entry.location.is_search() {
            return false;
        }

        if let Some(front) = self.entries.first_mut() {
            if front.location == entry.location {
                if front.name != entry.name || front.icon != entry.icon {
                    front.name = entry.name;
                    front.icon = entry.icon;
                    front.has_custom_name = entry.has_custom_name;
                    self.bus.emit(HistoryEvent::Changed);
                }
                return false;
            }
        }

        self.insert_front(entry.clone());

        match self.store.append(&entry) {
            Ok(()) => self.appended_since_compaction += 1,
            Err(e) => warn!("Failed to persist history entry {}: {}", entry.location, e),
        }
        // Revisits append too, so the store can outgrow the list without evictions
        if self.appended_since_compaction >= self.max_entries {
            self.compact();
        }

        self.bus.emit(HistoryEvent::Changed);
        true
    }

    pub fn remove(&mut self, location: &Location) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.location != location);
        if self.entries.len() == before {
            return false;
        }
        self.compact();
        self.bus.emit(HistoryEvent::Changed);
        true
    }

    fn insert_front(&mut self, entry: HistoryEntry) {
        self.entries.retain(|e| e.location != entry.location);
        self.entries.insert(0, entry);
        self.entries.truncate(self.max_entries);
    }

    fn compact(&mut self) {
        let oldest_first: Vec<HistoryEntry> = self.entries.iter().rev().cloned().collect();
        match self.store.replace_all(&oldest_first) {
            Ok(()) => self.appended_since_compaction = 0,
            Err(e) => warn!("Failed to compact history: {}", e),
        }
    }
}
