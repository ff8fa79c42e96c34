// Application - owns the windows and the services they share
use crate::change::{Completion, NavigationRequest, OpenFlags, OpenMode};
use crate::config::Config;
use crate::error::NavigationError;
use crate::ids::{SlotId, WindowId};
use crate::input::{Gesture, GestureInterpreter, NavCommand};
use crate::location::Location;
use crate::services::Services;
use crate::state::{Capabilities, Delivery, Lifecycle, Window, WindowSettings};
use tracing::{debug, info, warn};

pub struct Application {
    services: Services,
    settings: WindowSettings,
    interpreter: GestureInterpreter,
    windows: Vec<Window>,
    primary: Option<WindowId>,
}

impl Application {
    pub fn new(services: Services, config: &Config) -> Self {
        Self {
            services,
            settings: WindowSettings::from_config(config),
            interpreter: GestureInterpreter::new(config.input.clone()),
            windows: Vec::new(),
            primary: None,
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut Services {
        &mut self.services
    }

    pub fn interpreter(&self) -> &GestureInterpreter {
        &self.interpreter
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.iter().find(|w| w.id() == id)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| w.id() == id)
    }

    pub fn primary_window(&self) -> Option<WindowId> {
        self.primary
    }

    /// True while at least one window is open.
    pub fn is_running(&self) -> bool {
        !self.windows.is_empty()
    }

    /// Window holding `slot`.
    pub fn find_slot(&self, slot: SlotId) -> Option<WindowId> {
        self.windows
            .iter()
            .find(|w| w.contains_slot(slot))
            .map(Window::id)
    }

    /// Run `f` on a window with the shared services, then settle.
    pub fn with_window<R>(
        &mut self,
        id: WindowId,
        f: impl FnOnce(&mut Window, &mut Services) -> R,
    ) -> Result<R, NavigationError> {
        let window = self
            .windows
            .iter_mut()
            .find(|w| w.id() == id)
            .ok_or(NavigationError::UnknownWindow(id))?;
        let result = f(window, &mut self.services);
        self.settle();
        Ok(result)
    }

    pub fn open_window(
        &mut self,
        location: Location,
        capabilities: Capabilities,
    ) -> Result<WindowId, NavigationError> {
        let id = self.spawn_window(NavigationRequest::standard(location), capabilities, None)?;
        self.settle();
        Ok(id)
    }

    /// The persistent browser window, opened at home when there is none.
    pub fn open_primary_window(&mut self) -> Result<WindowId, NavigationError> {
        if let Some(id) = self.primary.filter(|id| self.window(*id).is_some()) {
            return Ok(id);
        }
        let home = self.services.home.clone();
        let id = self.open_window(home, Capabilities::navigation().persistent())?;
        self.primary = Some(id);
        Ok(id)
    }

    fn spawn_window(
        &mut self,
        request: NavigationRequest,
        capabilities: Capabilities,
        close_behind: Option<SlotId>,
    ) -> Result<WindowId, NavigationError> {
        let mut window = Window::new(capabilities, self.settings.clone());
        let id = window.id();
        window.show_behind(&mut self.services, request, close_behind)?;
        self.windows.push(window);
        Ok(id)
    }

    pub fn open_location(
        &mut self,
        window: WindowId,
        target: Location,
        mode: OpenMode,
        flags: OpenFlags,
    ) -> Result<Option<SlotId>, NavigationError> {
        self.with_window(window, |w, services| {
            w.open_location(services, target, mode, flags, Vec::new())
        })?
    }

    /// Interpret an input gesture and run the resulting command, if any.
    pub fn handle_gesture(&mut self, window: WindowId, gesture: Gesture) -> Result<bool, NavigationError> {
        match self.interpreter.interpret(gesture) {
            Some(command) => self.dispatch(window, command).map(|_| true),
            None => Ok(false),
        }
    }

    /// Run `command` against the window's active slot.
    pub fn dispatch(&mut self, window: WindowId, command: NavCommand) -> Result<(), NavigationError> {
        debug!("{:?}: {:?}", window, command);
        self.with_window(window, |w, services| run_command(w, services, command))?
    }

    /// Route a completion to whichever window owns its slot.
    pub fn deliver(&mut self, completion: Completion) -> Delivery {
        let Some(id) = self.find_slot(completion.ticket.slot) else {
            tracing::trace!("completion for vanished {:?}", completion.ticket.slot);
            return Delivery::Stale;
        };
        self.with_window(id, |w, services| w.deliver(services, completion))
            .unwrap_or(Delivery::Stale)
    }

    /// Carry out the work windows queued for the application: new windows,
    /// slots closed behind a commit, and windows that finished closing.
    pub fn settle(&mut self) {
        loop {
            let mut requests = Vec::new();
            let mut close_behind = Vec::new();
            for window in &mut self.windows {
                requests.extend(window.take_window_requests());
                close_behind.extend(window.take_close_behind());
            }
            if requests.is_empty() && close_behind.is_empty() {
                break;
            }

            for request in requests {
                let target = request.request.target.clone();
                if let Err(e) =
                    self.spawn_window(request.request, Capabilities::navigation(), request.close_behind)
                {
                    warn!("could not open a window for {}: {}", target, e);
                }
            }
            for slot in close_behind {
                self.close_slot(slot);
            }
        }
        self.reap();
    }

    fn close_slot(&mut self, slot: SlotId) {
        let Some(window) = self.windows.iter_mut().find(|w| w.contains_slot(slot)) else {
            return;
        };
        debug!("closing {:?} behind a new location", slot);
        if let Err(e) = window.close_slot(&mut self.services, slot) {
            warn!("could not close {:?}: {}", slot, e);
        }
    }

    fn reap(&mut self) {
        let before = self.windows.len();
        self.windows
            .retain(|w| w.lifecycle() != Lifecycle::Destroyed);
        if before != self.windows.len() {
            debug!("reaped {} window(s)", before - self.windows.len());
        }
        if let Some(primary) = self.primary {
            if self.window(primary).is_none() {
                self.primary = None;
            }
        }
    }

    pub fn close_window(&mut self, id: WindowId) -> Result<(), NavigationError> {
        self.with_window(id, |w, _| w.close())?;
        info!("closed {:?}", id);
        Ok(())
    }

    /// A volume at `root` went away: close what showed it.
    pub fn mount_removed(&mut self, root: &Location) -> usize {
        info!("{} unmounted", root);
        let mut affected = 0;
        for window in &mut self.windows {
            affected += window.close_slots_under(&mut self.services, root);
        }
        self.settle();
        affected
    }

    pub fn location_moved(&mut self, from: &Location, to: &Location) -> usize {
        let mut affected = 0;
        for window in &mut self.windows {
            affected += window.location_moved(&mut self.services, from, to);
        }
        self.settle();
        affected
    }

    pub fn location_gone(&mut self, gone: &Location) -> usize {
        self.services.history.remove(gone);
        let mut affected = 0;
        for window in &mut self.windows {
            affected += window.location_gone(&mut self.services, gone);
        }
        self.settle();
        affected
    }
}

fn run_command(
    window: &mut Window,
    services: &mut Services,
    command: NavCommand,
) -> Result<(), NavigationError> {
    if let NavCommand::CloseWindow = command {
        window.close();
        return Ok(());
    }
    let active = window.active_slot_id().ok_or(NavigationError::NoActiveSlot)?;
    match command {
        NavCommand::Back(distance) => window.go_back(services, active, distance),
        NavCommand::Forward(distance) => window.go_forward(services, active, distance),
        NavCommand::Up => window.go_up(services, active),
        NavCommand::Home => window.go_home(services, active),
        NavCommand::Reload => window.reload(services, active),
        NavCommand::Stop => window.stop_loading(active),
        NavCommand::OpenLocation { target, flags } => window
            .open_location(services, target, OpenMode::Default, flags, Vec::new())
            .map(|_| ()),
        NavCommand::NewTab => window.new_tab(services).map(|_| ()),
        NavCommand::CloseTab => window.close_slot(services, active).map(|_| ()),
        NavCommand::NextTab => window.cycle_slot(1).map(|_| ()),
        NavCommand::PreviousTab => window.cycle_slot(-1).map(|_| ()),
        NavCommand::SelectTab(index) => {
            let slot = window
                .active_pane()
                .and_then(|pane| pane.slots().get(index))
                .map(|slot| slot.id())
                .ok_or(NavigationError::NoActiveSlot)?;
            window.set_active_slot(slot)
        }
        NavCommand::MoveTab(offset) => window.move_slot(active, offset).map(|_| ()),
        NavCommand::ToggleSplitView => window.toggle_split_view(services),
        NavCommand::NextPane => window.next_pane().map(|_| ()),
        NavCommand::ToggleSidebar => {
            let visible = window.chrome().sidebar_visible;
            window.set_sidebar_visible(!visible)
        }
        NavCommand::ActivateSlot(slot) => window.set_active_slot(slot),
        NavCommand::CloseWindow => Ok(()),
    }
}
