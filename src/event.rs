// Typed notifications
// Slots report upwards through their window; collaborators (toolbar, menus,
// sidebars) subscribe to the window's bus instead of hooking into widgets.

use crate::ids::{PaneId, SlotId, WindowId};
use crate::location::Location;
use std::sync::mpsc::{channel, Receiver, Sender};

#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    SlotActivated(SlotId),
    SlotDeactivated(SlotId),
    SlotOpened { pane: PaneId, slot: SlotId },
    SlotClosed { pane: PaneId, slot: SlotId },
    PaneActivated(PaneId),
    PaneClosed(PaneId),
    LocationChanged { slot: SlotId, location: Location },
    LoadingStateChanged { slot: SlotId, allow_stop: bool },
    TitleChanged { slot: SlotId, title: String },
    StatusChanged { slot: SlotId, status: Option<String> },
    LocationFailed { slot: SlotId, message: String },
    SplitViewChanged(bool),
    WindowClosed(WindowId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEvent {
    Changed,
}

/// Fan-out of events to any number of channel subscribers.
///
/// Disconnected receivers are pruned on the next emit.
pub struct EventBus<E> {
    subscribers: Vec<Sender<E>>,
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<E> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: E) {
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
