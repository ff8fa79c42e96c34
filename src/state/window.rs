// Window - split-view panes and the global chrome
use super::chrome::WindowChrome;
use super::pane::Pane;
use super::slot::{Delivery, Slot, SlotNotice};
use crate::change::{Completion, NavigationRequest, OpenFlags, OpenMode};
use crate::config::{Config, NewTabPosition};
use crate::error::NavigationError;
use crate::event::{EventBus, WindowEvent};
use crate::history::HistoryEntry;
use crate::ids::{PaneId, SlotId, WindowId};
use crate::location::Location;
use crate::services::Services;
use std::collections::VecDeque;
use std::sync::mpsc::Receiver;
use tracing::{debug, info, trace, warn};

/// What a window variant can do, chosen when it is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub tabs: bool,
    pub split_view: bool,
    pub sidebar: bool,
    /// Survives closing its last slot by reopening at home.
    pub persistent: bool,
}

impl Capabilities {
    /// Browser window with tabs, split view and a sidebar.
    pub fn navigation() -> Self {
        Self {
            tabs: true,
            split_view: true,
            sidebar: true,
            persistent: false,
        }
    }

    /// One folder per window, nothing else.
    pub fn spatial() -> Self {
        Self {
            tabs: false,
            split_view: false,
            sidebar: false,
            persistent: false,
        }
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindowSettings {
    pub new_tab_position: NewTabPosition,
    pub always_use_browser: bool,
    pub start_with_sidebar: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl WindowSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            new_tab_position: config.navigation.new_tab_position,
            always_use_browser: config.navigation.always_use_browser,
            start_with_sidebar: config.window.start_with_sidebar,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Constructing,
    Showing,
    Closing,
    Destroyed,
}

/// What closing a slot ended up closing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Closed {
    Slot,
    Pane(PaneId),
    Window,
}

/// A location that has to open in a window of its own.
#[derive(Debug)]
pub struct NewWindowRequest {
    pub request: NavigationRequest,
    pub close_behind: Option<SlotId>,
}

#[derive(Debug)]
pub struct Window {
    id: WindowId,
    capabilities: Capabilities,
    settings: WindowSettings,
    lifecycle: Lifecycle,
    panes: Vec<Pane>,
    active_pane: Option<PaneId>,
    primary_pane: Option<PaneId>,
    chrome: WindowChrome,
    events: EventBus<WindowEvent>,
    close_behind: Vec<SlotId>,
    window_requests: Vec<NewWindowRequest>,
}

impl Window {
    pub fn new(capabilities: Capabilities, settings: WindowSettings) -> Self {
        let id = WindowId::next();
        let pane = Pane::new(id);
        let primary = pane.id();
        let chrome = WindowChrome {
            sidebar_visible: capabilities.sidebar && settings.start_with_sidebar,
            ..WindowChrome::default()
        };
        info!("Created {:?} ({:?})", id, capabilities);
        Self {
            id,
            capabilities,
            settings,
            lifecycle: Lifecycle::Constructing,
            panes: vec![pane],
            active_pane: None,
            primary_pane: Some(primary),
            chrome,
            events: EventBus::new(),
            close_behind: Vec::new(),
            window_requests: Vec::new(),
        }
    }

    /// Open the first slot at `request.target` and start showing.
    pub fn show(
        &mut self,
        services: &mut Services,
        request: NavigationRequest,
    ) -> Result<SlotId, NavigationError> {
        self.show_behind(services, request, None)
    }

    pub(crate) fn show_behind(
        &mut self,
        services: &mut Services,
        request: NavigationRequest,
        close_behind: Option<SlotId>,
    ) -> Result<SlotId, NavigationError> {
        if self.lifecycle != Lifecycle::Constructing {
            return Err(NavigationError::Unsupported("showing a window twice"));
        }
        let pane = self.primary_pane.ok_or(NavigationError::WindowClosed)?;
        let slot = self.open_slot(pane, OpenFlags::SLOT_APPEND)?;
        self.set_active_slot(slot)?;
        self.lifecycle = Lifecycle::Showing;
        if let Some(origin) = close_behind {
            if let Some(new_slot) = self.slot_mut(slot) {
                new_slot.set_close_behind(origin);
            }
        }
        self.navigate(services, slot, request)?;
        Ok(slot)
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn settings(&self) -> &WindowSettings {
        &self.settings
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn chrome(&self) -> &WindowChrome {
        &self.chrome
    }

    pub fn subscribe(&mut self) -> Receiver<WindowEvent> {
        self.events.subscribe()
    }

    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    pub fn pane(&self, pane: PaneId) -> Option<&Pane> {
        self.panes.iter().find(|p| p.id() == pane)
    }

    fn pane_mut(&mut self, pane: PaneId) -> Option<&mut Pane> {
        self.panes.iter_mut().find(|p| p.id() == pane)
    }

    pub fn active_pane_id(&self) -> Option<PaneId> {
        self.active_pane
    }

    pub fn active_pane(&self) -> Option<&Pane> {
        self.active_pane.and_then(|id| self.pane(id))
    }

    pub fn primary_pane_id(&self) -> Option<PaneId> {
        self.primary_pane
    }

    pub fn active_slot_id(&self) -> Option<SlotId> {
        self.active_pane().and_then(Pane::active_slot_id)
    }

    pub fn active_slot(&self) -> Option<&Slot> {
        self.active_pane().and_then(Pane::active_slot)
    }

    pub fn is_split(&self) -> bool {
        self.panes.len() > 1
    }

    pub fn contains_slot(&self, slot: SlotId) -> bool {
        self.pane_of(slot).is_some()
    }

    pub fn pane_of(&self, slot: SlotId) -> Option<PaneId> {
        self.panes
            .iter()
            .find(|pane| pane.contains(slot))
            .map(Pane::id)
    }

    pub fn slot(&self, slot: SlotId) -> Option<&Slot> {
        self.panes.iter().find_map(|pane| pane.slot(slot))
    }

    fn slot_mut(&mut self, slot: SlotId) -> Option<&mut Slot> {
        self.panes.iter_mut().find_map(|pane| pane.slot_mut(slot))
    }

    pub fn slot_ids(&self) -> Vec<SlotId> {
        self.panes.iter().flat_map(Pane::slot_ids).collect()
    }

    pub fn slot_count(&self) -> usize {
        self.panes.iter().map(Pane::len).sum()
    }

    pub fn slots(&self, pane: PaneId) -> Result<&[Slot], NavigationError> {
        self.pane(pane)
            .map(Pane::slots)
            .ok_or(NavigationError::UnknownPane(pane))
    }

    pub fn back_list(&self, slot: SlotId) -> Result<&VecDeque<HistoryEntry>, NavigationError> {
        self.slot(slot)
            .map(Slot::back_list)
            .ok_or(NavigationError::UnknownSlot(slot))
    }

    pub fn forward_list(&self, slot: SlotId) -> Result<&VecDeque<HistoryEntry>, NavigationError> {
        self.slot(slot)
            .map(Slot::forward_list)
            .ok_or(NavigationError::UnknownSlot(slot))
    }

    fn ensure_open(&self) -> Result<(), NavigationError> {
        match self.lifecycle {
            Lifecycle::Closing | Lifecycle::Destroyed => Err(NavigationError::WindowClosed),
            _ => Ok(()),
        }
    }

    // Active pane / slot

    pub fn set_active_pane(&mut self, pane: PaneId) -> Result<(), NavigationError> {
        let target = self.pane(pane).ok_or(NavigationError::UnknownPane(pane))?;
        if let Some(slot) = target.active_slot_id() {
            return self.set_active_slot(slot);
        }
        if self.active_pane != Some(pane) {
            self.promote_pane(pane);
        }
        Ok(())
    }

    fn promote_pane(&mut self, pane: PaneId) {
        if let Some(old) = self.active_pane.filter(|old| *old != pane) {
            if let Some(old) = self.pane_mut(old) {
                old.set_active(false);
            }
        }
        if let Some(new) = self.pane_mut(pane) {
            new.set_active(true);
        }
        self.active_pane = Some(pane);
        debug!("{:?}: active pane is now {:?}", self.id, pane);
        self.events.emit(WindowEvent::PaneActivated(pane));
    }

    /// Make `slot` the window's active slot, promoting its pane first.
    pub fn set_active_slot(&mut self, slot: SlotId) -> Result<(), NavigationError> {
        let pane = self.pane_of(slot).ok_or(NavigationError::UnknownSlot(slot))?;
        let previous = self.active_slot_id();
        if previous == Some(slot) {
            return Ok(());
        }

        if let Some(previous) = previous {
            self.chrome.disconnect();
            self.events.emit(WindowEvent::SlotDeactivated(previous));
        }
        // Pane chrome is shared per pane: promote before refreshing widgets.
        if self.active_pane != Some(pane) {
            self.promote_pane(pane);
        }
        if let Some(target) = self.pane_mut(pane) {
            target.set_active_slot(Some(slot));
        }
        self.sync_window_chrome();
        trace!("{:?}: active slot is now {:?}", self.id, slot);
        self.events.emit(WindowEvent::SlotActivated(slot));
        Ok(())
    }

    // Slots

    pub fn open_slot(&mut self, pane: PaneId, flags: OpenFlags) -> Result<SlotId, NavigationError> {
        self.ensure_open()?;
        let target = self
            .pane_mut(pane)
            .ok_or(NavigationError::UnknownPane(pane))?;
        let slot = target.open_slot(flags);
        self.events.emit(WindowEvent::SlotOpened { pane, slot });
        Ok(slot)
    }

    /// Open `target` in the active slot, a new tab or a new window.
    ///
    /// Returns the slot that is navigating, or `None` when the location was
    /// handed off to a new window.
    pub fn open_location(
        &mut self,
        services: &mut Services,
        target: Location,
        mode: OpenMode,
        flags: OpenFlags,
        selection: Vec<Location>,
    ) -> Result<Option<SlotId>, NavigationError> {
        self.ensure_open()?;
        let origin = self.active_slot_id();
        let request = NavigationRequest::standard(target)
            .with_mode(mode)
            .with_selection(selection);
        let close_behind = origin.filter(|_| flags.contains(OpenFlags::CLOSE_BEHIND));

        let new_window = flags.contains(OpenFlags::NEW_WINDOW)
            || (flags.contains(OpenFlags::NEW_TAB) && !self.capabilities.tabs);
        if new_window {
            debug!("{:?}: {} goes to a new window", self.id, request.target);
            self.window_requests.push(NewWindowRequest {
                request,
                close_behind,
            });
            return Ok(None);
        }

        if flags.contains(OpenFlags::NEW_TAB) {
            let pane = self.active_pane.ok_or(NavigationError::NoActiveSlot)?;
            let slot = self.open_slot(pane, flags)?;
            if let Some(origin) = close_behind {
                if let Some(new_slot) = self.slot_mut(slot) {
                    new_slot.set_close_behind(origin);
                }
                self.set_active_slot(slot)?;
            }
            self.navigate(services, slot, request)?;
            return Ok(Some(slot));
        }

        let slot = origin.ok_or(NavigationError::NoActiveSlot)?;
        self.navigate(services, slot, request)?;
        Ok(Some(slot))
    }

    /// Open a tab next to the active one, showing the same location.
    pub fn new_tab(&mut self, services: &mut Services) -> Result<SlotId, NavigationError> {
        self.ensure_open()?;
        if !self.capabilities.tabs {
            return Err(NavigationError::Unsupported("tabs"));
        }
        let origin = self.active_slot().ok_or(NavigationError::NoActiveSlot)?;
        let location = origin
            .location()
            .filter(|location| !location.is_search())
            .cloned()
            .unwrap_or_else(|| services.home.clone());
        let pane = origin.pane();

        let flags = match self.settings.new_tab_position {
            NewTabPosition::End => OpenFlags::SLOT_APPEND,
            NewTabPosition::AfterCurrent => OpenFlags::empty(),
        };
        let slot = self.open_slot(pane, flags)?;
        self.set_active_slot(slot)?;
        self.navigate(services, slot, NavigationRequest::standard(location))?;
        Ok(slot)
    }

    pub fn move_slot(&mut self, slot: SlotId, offset: isize) -> Result<usize, NavigationError> {
        let pane = self.pane_of(slot).ok_or(NavigationError::UnknownSlot(slot))?;
        match self.pane_mut(pane) {
            Some(pane) => pane.move_slot(slot, offset),
            None => Err(NavigationError::UnknownSlot(slot)),
        }
    }

    /// Activate the tab `offset` places from the active one.
    pub fn cycle_slot(&mut self, offset: isize) -> Result<SlotId, NavigationError> {
        let active = self.active_slot_id().ok_or(NavigationError::NoActiveSlot)?;
        let next = self
            .active_pane()
            .and_then(|pane| pane.neighbour(active, offset))
            .ok_or(NavigationError::NoActiveSlot)?;
        self.set_active_slot(next)?;
        Ok(next)
    }

    /// Close `slot`; an emptied pane closes with it, and so does the window
    /// when that was its last pane.
    pub fn close_slot(
        &mut self,
        services: &mut Services,
        slot: SlotId,
    ) -> Result<Closed, NavigationError> {
        let pane_id = self.pane_of(slot).ok_or(NavigationError::UnknownSlot(slot))?;
        let window_active = self.active_slot_id() == Some(slot);

        let replacement = self
            .pane(pane_id)
            .filter(|pane| pane.active_slot_id() == Some(slot))
            .and_then(Pane::first_inactive_slot);
        match replacement {
            Some(next) if window_active => self.set_active_slot(next)?,
            Some(next) => {
                if let Some(pane) = self.pane_mut(pane_id) {
                    pane.set_active_slot(Some(next));
                }
            }
            None if window_active => self.deactivate(slot),
            None => {}
        }

        let pane = self
            .pane_mut(pane_id)
            .ok_or(NavigationError::UnknownPane(pane_id))?;
        pane.close_slot(slot)?;
        let emptied = pane.is_empty();
        self.events.emit(WindowEvent::SlotClosed {
            pane: pane_id,
            slot,
        });

        if !emptied {
            return Ok(Closed::Slot);
        }

        if self.panes.len() > 1 {
            debug!("{:?}: last slot of {:?} closed, closing the pane", self.id, pane_id);
            self.remove_pane(pane_id);
            self.activate_surviving_pane()?;
            self.events.emit(WindowEvent::SplitViewChanged(self.is_split()));
            return Ok(Closed::Pane(pane_id));
        }

        if self.capabilities.persistent && self.lifecycle == Lifecycle::Showing {
            debug!("{:?}: persistent window emptied, reopening at home", self.id);
            self.reopen_at_home(services, pane_id)?;
            return Ok(Closed::Slot);
        }

        debug!("{:?}: last slot closed, closing the window", self.id);
        self.close();
        Ok(Closed::Window)
    }

    /// Close every slot of `pane` and remove it.
    ///
    /// The last pane of a persistent window is kept and reopened at home,
    /// reported as [`Closed::Slot`].
    pub fn close_pane(
        &mut self,
        services: &mut Services,
        pane: PaneId,
    ) -> Result<Closed, NavigationError> {
        if self.pane(pane).is_none() {
            return Err(NavigationError::UnknownPane(pane));
        }
        if self.panes.len() > 1 {
            self.remove_pane(pane);
            self.activate_surviving_pane()?;
            self.events.emit(WindowEvent::SplitViewChanged(self.is_split()));
            return Ok(Closed::Pane(pane));
        }
        if self.capabilities.persistent && self.lifecycle == Lifecycle::Showing {
            debug!("{:?}: last pane of a persistent window closed, reopening at home", self.id);
            self.empty_pane(pane);
            self.reopen_at_home(services, pane)?;
            return Ok(Closed::Slot);
        }
        self.close();
        Ok(Closed::Window)
    }

    fn reopen_at_home(&mut self, services: &mut Services, pane: PaneId) -> Result<(), NavigationError> {
        let fresh = self.open_slot(pane, OpenFlags::SLOT_APPEND)?;
        self.set_active_slot(fresh)?;
        let home = services.home.clone();
        self.navigate(services, fresh, NavigationRequest::standard(home))
    }

    // The window's active slot is going away without a successor.
    fn deactivate(&mut self, slot: SlotId) {
        self.chrome.disconnect();
        self.events.emit(WindowEvent::SlotDeactivated(slot));
    }

    // Closes every slot of `pane` but keeps the pane itself.
    fn empty_pane(&mut self, pane: PaneId) {
        if self.active_pane == Some(pane) {
            if let Some(active) = self.active_slot_id() {
                self.deactivate(active);
            }
        }
        let Some(target) = self.pane_mut(pane) else {
            return;
        };
        let mut closed = Vec::new();
        for slot in target.slot_ids() {
            if target.close_slot(slot).is_ok() {
                closed.push(slot);
            }
        }
        for slot in closed {
            self.events.emit(WindowEvent::SlotClosed { pane, slot });
        }
    }

    // Leaves `active_pane` empty when the removed pane was active.
    fn remove_pane(&mut self, pane: PaneId) {
        let Some(index) = self.panes.iter().position(|p| p.id() == pane) else {
            return;
        };
        self.empty_pane(pane);
        self.panes.remove(index);
        if self.active_pane == Some(pane) {
            self.active_pane = None;
            self.chrome.disconnect();
        }
        if self.primary_pane == Some(pane) {
            self.primary_pane = self.panes.first().map(Pane::id);
        }
        debug!("{:?}: removed {:?}", self.id, pane);
        self.events.emit(WindowEvent::PaneClosed(pane));
    }

    fn activate_surviving_pane(&mut self) -> Result<(), NavigationError> {
        if self.active_pane.is_some() {
            return Ok(());
        }
        let Some(first) = self.panes.first_mut() else {
            return Ok(());
        };
        if first.active_slot_id().is_none() {
            let slot = first.first_inactive_slot();
            first.set_active_slot(slot);
        }
        let id = first.id();
        self.set_active_pane(id)
    }

    // Split view

    /// Appends an empty pane. It stays inactive until one of its slots is activated.
    pub fn create_extra_pane(&mut self) -> PaneId {
        let pane = Pane::new(self.id);
        let pane_id = pane.id();
        self.panes.push(pane);
        pane_id
    }

    pub fn split_view_on(&mut self, services: &mut Services) -> Result<SlotId, NavigationError> {
        self.ensure_open()?;
        if !self.capabilities.split_view {
            return Err(NavigationError::Unsupported("split view"));
        }
        if self.is_split() {
            return Err(NavigationError::SplitViewActive);
        }

        let location = self
            .active_slot()
            .and_then(Slot::location)
            .filter(|location| !location.is_search())
            .cloned()
            .unwrap_or_else(|| services.home.clone());

        let pane_id = self.create_extra_pane();
        let slot = self.open_slot(pane_id, OpenFlags::SLOT_APPEND)?;
        if let Some(pane) = self.pane_mut(pane_id) {
            pane.set_active_slot(Some(slot));
        }
        self.navigate(services, slot, NavigationRequest::standard(location))?;
        self.set_active_slot(slot)?;

        info!("{:?}: split view on", self.id);
        self.events.emit(WindowEvent::SplitViewChanged(true));
        Ok(slot)
    }

    /// Drop every pane but the primary one. Slots in dropped panes are closed.
    pub fn split_view_off(&mut self) -> Result<(), NavigationError> {
        self.ensure_open()?;
        if !self.is_split() {
            return Err(NavigationError::SplitViewInactive);
        }
        let primary = self
            .primary_pane
            .or_else(|| self.panes.first().map(Pane::id))
            .ok_or(NavigationError::WindowClosed)?;

        let others: Vec<PaneId> = self
            .panes
            .iter()
            .map(Pane::id)
            .filter(|id| *id != primary)
            .collect();
        for pane in others {
            self.remove_pane(pane);
        }
        self.set_active_pane(primary)?;

        info!("{:?}: split view off", self.id);
        self.events.emit(WindowEvent::SplitViewChanged(false));
        Ok(())
    }

    pub fn toggle_split_view(&mut self, services: &mut Services) -> Result<(), NavigationError> {
        if self.is_split() {
            self.split_view_off()
        } else {
            self.split_view_on(services).map(|_| ())
        }
    }

    /// Activate the pane after the active one, wrapping around.
    pub fn next_pane(&mut self) -> Result<PaneId, NavigationError> {
        let next = self.neighbour_pane().ok_or(NavigationError::SplitViewInactive)?;
        self.set_active_pane(next)?;
        Ok(next)
    }

    fn neighbour_pane(&self) -> Option<PaneId> {
        if !self.is_split() {
            return None;
        }
        let index = self
            .active_pane
            .and_then(|active| self.panes.iter().position(|p| p.id() == active))
            .unwrap_or(0);
        self.panes
            .get((index + 1) % self.panes.len())
            .map(Pane::id)
    }

    /// Active slot of the pane that is not focused, in split view.
    pub fn extra_slot(&self) -> Option<SlotId> {
        self.neighbour_pane()
            .and_then(|pane| self.pane(pane))
            .and_then(Pane::active_slot_id)
    }

    pub fn set_sidebar_visible(&mut self, visible: bool) -> Result<(), NavigationError> {
        if visible && !self.capabilities.sidebar {
            return Err(NavigationError::Unsupported("sidebar"));
        }
        self.chrome.sidebar_visible = visible;
        Ok(())
    }

    // Navigation on a given slot

    pub fn go_back(
        &mut self,
        services: &mut Services,
        slot: SlotId,
        distance: usize,
    ) -> Result<(), NavigationError> {
        self.with_slot(slot, |slot| slot.go_back(services, distance))?
    }

    pub fn go_forward(
        &mut self,
        services: &mut Services,
        slot: SlotId,
        distance: usize,
    ) -> Result<(), NavigationError> {
        self.with_slot(slot, |slot| slot.go_forward(services, distance))?
    }

    pub fn reload(&mut self, services: &mut Services, slot: SlotId) -> Result<(), NavigationError> {
        self.with_slot(slot, |slot| slot.reload(services))
    }

    pub fn stop_loading(&mut self, slot: SlotId) -> Result<(), NavigationError> {
        self.with_slot(slot, Slot::stop_loading)
    }

    pub fn go_up(&mut self, services: &mut Services, slot: SlotId) -> Result<(), NavigationError> {
        self.with_slot(slot, |slot| slot.go_up(services))?
    }

    pub fn go_home(&mut self, services: &mut Services, slot: SlotId) -> Result<(), NavigationError> {
        self.with_slot(slot, |slot| slot.go_home(services))
    }

    pub fn navigate(
        &mut self,
        services: &mut Services,
        slot: SlotId,
        request: NavigationRequest,
    ) -> Result<(), NavigationError> {
        self.with_slot(slot, |slot| slot.navigate(services, request))
    }

    /// Route a completion to the slot it belongs to.
    pub fn deliver(&mut self, services: &mut Services, completion: Completion) -> Delivery {
        let slot = completion.ticket.slot;
        self.with_slot(slot, |target| target.deliver(services, completion))
            .unwrap_or(Delivery::Stale)
    }

    // Locations changing underneath the slots

    /// Follow a moved location in every slot showing it or something below it.
    pub fn location_moved(&mut self, services: &mut Services, from: &Location, to: &Location) -> usize {
        let moved: Vec<(SlotId, Location)> = self
            .panes
            .iter()
            .flat_map(Pane::slots)
            .filter_map(|slot| {
                let target = slot.location()?.rebase(from, to)?;
                Some((slot.id(), target))
            })
            .collect();
        for (slot, target) in &moved {
            if let Err(e) = self.with_slot(*slot, |s| s.redirect(services, target.clone())) {
                warn!("{:?}: could not follow {} to {}: {}", self.id, from, to, e);
            }
        }
        moved.len()
    }

    /// Move every slot showing `gone` (or below it) to its parent, or home.
    pub fn location_gone(&mut self, services: &mut Services, gone: &Location) -> usize {
        let target = gone.parent().unwrap_or_else(|| services.home.clone());
        let affected = self.slots_under(gone);
        for slot in &affected {
            if let Err(e) = self.with_slot(*slot, |s| s.fall_back(services, target.clone())) {
                warn!("{:?}: could not leave {} for {}: {}", self.id, gone, target, e);
            }
        }
        affected.len()
    }

    /// Close the slots under an unmounted `root`. The window's last slot
    /// goes home instead.
    pub fn close_slots_under(&mut self, services: &mut Services, root: &Location) -> usize {
        let affected = self.slots_under(root);
        for slot in &affected {
            if self.slot_count() == 1 {
                if let Err(e) = self.go_home(services, *slot) {
                    warn!("{:?}: could not send {:?} home: {}", self.id, slot, e);
                }
            } else if let Err(e) = self.close_slot(services, *slot) {
                warn!("{:?}: could not close {:?}: {}", self.id, slot, e);
            }
        }
        affected.len()
    }

    fn slots_under(&self, root: &Location) -> Vec<SlotId> {
        self.panes
            .iter()
            .flat_map(Pane::slots)
            .filter(|slot| slot.location().is_some_and(|loc| loc.has_prefix(root)))
            .map(Slot::id)
            .collect()
    }

    /// Tear down: sidebar, then panes, then the window itself.
    pub fn close(&mut self) {
        if matches!(self.lifecycle, Lifecycle::Closing | Lifecycle::Destroyed) {
            return;
        }
        info!("Closing {:?}", self.id);
        self.lifecycle = Lifecycle::Closing;

        self.chrome.sidebar_visible = false;
        let panes: Vec<PaneId> = self.panes.iter().map(Pane::id).collect();
        for pane in panes {
            self.remove_pane(pane);
        }
        self.active_pane = None;
        self.primary_pane = None;
        self.chrome.disconnect();

        self.lifecycle = Lifecycle::Destroyed;
        self.events.emit(WindowEvent::WindowClosed(self.id));
    }

    pub(crate) fn take_close_behind(&mut self) -> Vec<SlotId> {
        std::mem::take(&mut self.close_behind)
    }

    pub(crate) fn take_window_requests(&mut self) -> Vec<NewWindowRequest> {
        std::mem::take(&mut self.window_requests)
    }

    /// Active pointers are members of their collections and back-references
    /// point at their owners.
    pub fn check_invariants(&self) -> bool {
        match self.lifecycle {
            Lifecycle::Destroyed => return self.panes.is_empty() && self.active_pane.is_none(),
            Lifecycle::Constructing | Lifecycle::Closing => return true,
            Lifecycle::Showing => {}
        }
        if self.panes.is_empty() {
            return false;
        }
        let Some(active) = self.active_pane() else {
            return false;
        };
        if self.panes.iter().filter(|pane| pane.is_active()).count() != 1 || !active.is_active() {
            return false;
        }
        self.panes.iter().all(|pane| {
            pane.window() == self.id
                && pane.slots().iter().all(|slot| slot.pane() == pane.id())
                && (pane.is_empty() || pane.active_slot().is_some())
        })
    }

    // Runs `f` on the slot, then publishes what it reported.
    fn with_slot<R>(
        &mut self,
        slot: SlotId,
        f: impl FnOnce(&mut Slot) -> R,
    ) -> Result<R, NavigationError> {
        let target = self.slot_mut(slot).ok_or(NavigationError::UnknownSlot(slot))?;
        let result = f(target);
        self.flush(slot);
        Ok(result)
    }

    fn flush(&mut self, slot: SlotId) {
        let Some(pane_id) = self.pane_of(slot) else {
            return;
        };
        let notices = match self.slot_mut(slot) {
            Some(target) => target.take_notices(),
            None => return,
        };
        if notices.is_empty() {
            return;
        }

        for notice in notices {
            let event = match notice {
                SlotNotice::LoadingChanged(allow_stop) => {
                    WindowEvent::LoadingStateChanged { slot, allow_stop }
                }
                SlotNotice::TitleChanged(title) => WindowEvent::TitleChanged { slot, title },
                SlotNotice::StatusChanged(status) => WindowEvent::StatusChanged { slot, status },
                SlotNotice::Failed(message) => WindowEvent::LocationFailed { slot, message },
                SlotNotice::Committed {
                    location,
                    close_behind,
                } => {
                    if let Some(origin) = close_behind {
                        self.close_behind.push(origin);
                    }
                    WindowEvent::LocationChanged { slot, location }
                }
            };
            self.events.emit(event);
        }

        if let Some(pane) = self.pane_mut(pane_id) {
            if pane.active_slot_id() == Some(slot) {
                pane.sync_chrome();
            }
        }
        if self.active_slot_id() == Some(slot) {
            self.sync_window_chrome();
        }
    }

    fn sync_window_chrome(&mut self) {
        let active = self
            .active_pane
            .and_then(|id| self.panes.iter().find(|pane| pane.id() == id))
            .and_then(Pane::active_slot);
        match active {
            Some(slot) => self.chrome.sync(slot, self.settings.always_use_browser),
            None => self.chrome.disconnect(),
        }
    }
}
