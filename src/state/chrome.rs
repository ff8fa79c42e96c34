// Chrome state - what the toolbars, title bar and status bar show
// Written only on behalf of the active slot; widgets render from here.

use super::slot::Slot;
use crate::ids::SlotId;
use crate::location::Location;

pub const MAX_TITLE_CHARS: usize = 180;
const BROWSER_SUFFIX: &str = " - File Browser";

/// Shared by every slot of a pane; mirrors the pane's active slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PaneChrome {
    pub location_bar: String,
    pub path_bar: Option<Location>,
    pub search_bar_visible: bool,
    /// Dimmed styling for the pane that does not have focus in split view.
    pub inactive: bool,
}

impl PaneChrome {
    pub(crate) fn sync(&mut self, slot: &Slot) {
        match slot.location() {
            Some(location) if location.is_search() => {
                self.search_bar_visible = true;
                self.location_bar = location.search_query().unwrap_or_default().to_string();
                self.path_bar = None;
            }
            Some(location) => {
                self.search_bar_visible = false;
                self.location_bar = location.to_string();
                self.path_bar = Some(location.clone());
            }
            None => {
                self.search_bar_visible = false;
                self.location_bar.clear();
                self.path_bar = None;
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WindowChrome {
    pub title: String,
    pub icon: Option<String>,
    pub status: Option<String>,
    pub allow_stop: bool,
    pub back_enabled: bool,
    pub forward_enabled: bool,
    pub up_enabled: bool,
    /// Zoom widgets are hidden when the view has no zoom level.
    pub zoom: Option<i32>,
    pub sidebar_visible: bool,
    /// Slot whose view is wired to the window's menus and shortcuts.
    pub connected: Option<SlotId>,
}

impl WindowChrome {
    pub(crate) fn sync(&mut self, slot: &Slot, always_use_browser: bool) {
        self.connected = Some(slot.id());
        self.title = window_title(slot.title(), always_use_browser);
        self.icon = slot.viewed_file().map(|meta| meta.icon.clone());
        self.status = slot.status().map(str::to_string);
        self.allow_stop = slot.allow_stop();
        self.back_enabled = slot.history().can_go_back();
        self.forward_enabled = slot.history().can_go_forward();
        self.up_enabled = slot.location().and_then(Location::parent).is_some();
        self.zoom = slot.view().and_then(|view| view.zoom_level());
    }

    pub(crate) fn disconnect(&mut self) {
        self.connected = None;
    }
}

pub fn window_title(slot_title: &str, always_use_browser: bool) -> String {
    let title = middle_truncate(slot_title, MAX_TITLE_CHARS);
    if always_use_browser {
        title
    } else {
        format!("{}{}", title, BROWSER_SUFFIX)
    }
}

/// Shorten `text` to at most `max_chars` characters by cutting out its middle.
pub fn middle_truncate(text: &str, max_chars: usize) -> String {
    const ELLIPSIS: &str = "...";
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    if max_chars <= ELLIPSIS.len() {
        return text.chars().take(max_chars).collect();
    }
    let keep = max_chars - ELLIPSIS.len();
    let head = keep - keep / 2;
    let tail = keep / 2;
    let mut out: String = text.chars().take(head).collect();
    out.push_str(ELLIPSIS);
    out.extend(text.chars().skip(count - tail));
    out
}
