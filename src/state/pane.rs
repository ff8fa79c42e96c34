// Pane - a tab strip of slots
use super::chrome::PaneChrome;
use super::slot::Slot;
use crate::change::OpenFlags;
use crate::error::NavigationError;
use crate::ids::{PaneId, SlotId, WindowId};
use tracing::debug;

/// Ordered slots plus the one that is showing.
///
/// The pane never picks a replacement when its active slot closes; that is
/// the window's call.
#[derive(Debug)]
pub struct Pane {
    id: PaneId,
    window: WindowId,
    slots: Vec<Slot>,
    active_slot: Option<SlotId>,
    is_active: bool,
    chrome: PaneChrome,
}

impl Pane {
    pub(crate) fn new(window: WindowId) -> Self {
        let id = PaneId::next();
        debug!("Created {:?} in {:?}", id, window);
        Self {
            id,
            window,
            slots: Vec::new(),
            active_slot: None,
            is_active: false,
            chrome: PaneChrome::default(),
        }
    }

    pub fn id(&self) -> PaneId {
        self.id
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot_ids(&self) -> Vec<SlotId> {
        self.slots.iter().map(Slot::id).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.position(slot).is_some()
    }

    pub fn position(&self, slot: SlotId) -> Option<usize> {
        self.slots.iter().position(|s| s.id() == slot)
    }

    pub fn slot(&self, slot: SlotId) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id() == slot)
    }

    pub(crate) fn slot_mut(&mut self, slot: SlotId) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|s| s.id() == slot)
    }

    pub fn active_slot_id(&self) -> Option<SlotId> {
        self.active_slot
    }

    pub fn active_slot(&self) -> Option<&Slot> {
        self.active_slot.and_then(|id| self.slot(id))
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn chrome(&self) -> &PaneChrome {
        &self.chrome
    }

    /// Add a slot after the current tab, or at the end with `SLOT_APPEND`.
    /// The active slot is left alone.
    pub fn open_slot(&mut self, flags: OpenFlags) -> SlotId {
        let slot = Slot::new(self.id);
        let id = slot.id();
        let after_current = self
            .active_slot
            .and_then(|active| self.position(active))
            .map(|index| index + 1);
        match after_current {
            Some(index) if !flags.contains(OpenFlags::SLOT_APPEND) => self.slots.insert(index, slot),
            _ => self.slots.push(slot),
        }
        id
    }

    /// Remove and destroy `slot`, cancelling any load it has in flight.
    pub fn close_slot(&mut self, slot: SlotId) -> Result<(), NavigationError> {
        let index = self
            .position(slot)
            .ok_or(NavigationError::UnknownSlot(slot))?;
        let mut removed = self.slots.remove(index);
        removed.stop_loading();
        if self.active_slot == Some(slot) {
            self.active_slot = None;
        }
        debug!("Closed {:?} in {:?}", slot, self.id);
        Ok(())
    }

    /// Presentation only: toggles the inactive-pane styling.
    pub fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
        self.chrome.inactive = !is_active;
    }

    pub(crate) fn set_active_slot(&mut self, slot: Option<SlotId>) {
        debug_assert!(slot.map_or(true, |id| self.contains(id)));
        self.active_slot = slot;
        self.sync_chrome();
    }

    pub fn first_inactive_slot(&self) -> Option<SlotId> {
        self.slots
            .iter()
            .map(Slot::id)
            .find(|id| Some(*id) != self.active_slot)
    }

    /// Slot `offset` places away from `slot`, wrapping around the strip.
    pub fn neighbour(&self, slot: SlotId, offset: isize) -> Option<SlotId> {
        let index = self.position(slot)? as isize;
        let len = self.slots.len() as isize;
        let target = (index + offset).rem_euclid(len) as usize;
        self.slots.get(target).map(Slot::id)
    }

    /// Move a tab `offset` places, clamped to the strip. Returns its new index.
    pub fn move_slot(&mut self, slot: SlotId, offset: isize) -> Result<usize, NavigationError> {
        let index = self
            .position(slot)
            .ok_or(NavigationError::UnknownSlot(slot))?;
        let last = self.slots.len() as isize - 1;
        let target = (index as isize + offset).clamp(0, last) as usize;
        let moved = self.slots.remove(index);
        self.slots.insert(target, moved);
        Ok(target)
    }

    pub(crate) fn sync_chrome(&mut self) {
        let active = self.active_slot.and_then(|id| self.slots.iter().find(|s| s.id() == id));
        match active {
            Some(slot) => self.chrome.sync(slot),
            None => {
                let inactive = self.chrome.inactive;
                self.chrome = PaneChrome {
                    inactive,
                    ..PaneChrome::default()
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_slots_follow_the_current_tab() {
        let mut pane = Pane::new(WindowId::next());
        let a = pane.open_slot(OpenFlags::empty());
        let b = pane.open_slot(OpenFlags::empty());
        pane.set_active_slot(Some(a));
        let c = pane.open_slot(OpenFlags::empty());
        assert_eq!(pane.slot_ids(), vec![a, c, b]);

        let d = pane.open_slot(OpenFlags::SLOT_APPEND);
        assert_eq!(pane.slot_ids(), vec![a, c, b, d]);
        assert_eq!(pane.active_slot_id(), Some(a));
    }

    #[test]
    fn closing_active_slot_leaves_no_active() {
        let mut pane = Pane::new(WindowId::next());
        let a = pane.open_slot(OpenFlags::empty());
        let b = pane.open_slot(OpenFlags::empty());
        pane.set_active_slot(Some(a));
        pane.close_slot(a).unwrap();
        assert_eq!(pane.active_slot_id(), None);
        assert_eq!(pane.slot_ids(), vec![b]);
        assert_eq!(pane.close_slot(a), Err(NavigationError::UnknownSlot(a)));
    }

    #[test]
    fn first_inactive_skips_active() {
        let mut pane = Pane::new(WindowId::next());
        let a = pane.open_slot(OpenFlags::empty());
        let b = pane.open_slot(OpenFlags::SLOT_APPEND);
        pane.set_active_slot(Some(a));
        assert_eq!(pane.first_inactive_slot(), Some(b));
    }

    #[test]
    fn move_and_wrap() {
        let mut pane = Pane::new(WindowId::next());
        let a = pane.open_slot(OpenFlags::SLOT_APPEND);
        let b = pane.open_slot(OpenFlags::SLOT_APPEND);
        let c = pane.open_slot(OpenFlags::SLOT_APPEND);
        assert_eq!(pane.move_slot(a, 5).unwrap(), 2);
        assert_eq!(pane.slot_ids(), vec![b, c, a]);
        assert_eq!(pane.neighbour(a, 1), Some(b));
        assert_eq!(pane.neighbour(b, -1), Some(a));
    }

    #[test]
    fn set_active_only_touches_styling() {
        let mut pane = Pane::new(WindowId::next());
        let a = pane.open_slot(OpenFlags::empty());
        pane.set_active_slot(Some(a));
        pane.set_active(false);
        assert!(pane.chrome().inactive);
        assert_eq!(pane.active_slot_id(), Some(a));
    }
}
