// Slot - one navigable view context (a tab)
use super::navigation::NavigationHistory;
use crate::change::{
    ChangeKind, Commit, Completion, LocationChangeController, NavigationRequest, OpenMode, Phase,
    Transition, ViewChange,
};
use crate::error::{NavigationError, ResolveError};
use crate::history::HistoryEntry;
use crate::ids::{PaneId, SlotId};
use crate::location::Location;
use crate::services::{ContentView, FileMetadata, Services};
use std::collections::VecDeque;
use tracing::{debug, info, trace, warn};

pub const LOADING_TITLE: &str = "Loading...";

/// Outcome of handing a completion to a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Applied,
    /// Cancelled, superseded or addressed to a slot that no longer exists.
    Stale,
}

/// Change notices a slot reports to its window, drained after every call.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SlotNotice {
    LoadingChanged(bool),
    TitleChanged(String),
    StatusChanged(Option<String>),
    Committed {
        location: Location,
        close_behind: Option<SlotId>,
    },
    Failed(String),
}

#[derive(Debug)]
pub struct Slot {
    id: SlotId,
    pane: PaneId,
    location: Option<Location>,
    history: NavigationHistory,
    view: Option<Box<dyn ContentView>>,
    viewed_file: Option<FileMetadata>,
    controller: LocationChangeController,
    title: String,
    status: Option<String>,
    allow_stop: bool,
    close_behind: Option<SlotId>,
    notices: Vec<SlotNotice>,
}

impl Slot {
    pub(crate) fn new(pane: PaneId) -> Self {
        let id = SlotId::next();
        debug!("Created {:?} in {:?}", id, pane);
        Self {
            id,
            pane,
            location: None,
            history: NavigationHistory::new(),
            view: None,
            viewed_file: None,
            controller: LocationChangeController::new(id),
            title: LOADING_TITLE.to_string(),
            status: None,
            allow_stop: false,
            close_behind: None,
            notices: Vec::new(),
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn pane(&self) -> PaneId {
        self.pane
    }

    /// The committed location; `None` until the first navigation lands.
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn pending_location(&self) -> Option<&Location> {
        self.controller.request().map(|request| &request.target)
    }

    /// Kind of the change in flight, if any.
    pub fn change_kind(&self) -> Option<ChangeKind> {
        self.controller.request().map(|request| request.kind)
    }

    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_running()
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    pub fn back_list(&self) -> &VecDeque<HistoryEntry> {
        self.history.back()
    }

    pub fn forward_list(&self) -> &VecDeque<HistoryEntry> {
        self.history.forward()
    }

    pub fn view(&self) -> Option<&dyn ContentView> {
        self.view.as_deref()
    }

    pub fn view_mut(&mut self) -> Option<&mut (dyn ContentView + 'static)> {
        self.view.as_deref_mut()
    }

    pub fn viewed_file(&self) -> Option<&FileMetadata> {
        self.viewed_file.as_ref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn allow_stop(&self) -> bool {
        self.allow_stop
    }

    pub fn open_location(
        &mut self,
        services: &mut Services,
        target: Location,
        mode: OpenMode,
        selection: Vec<Location>,
    ) {
        let request = NavigationRequest::standard(target)
            .with_mode(mode)
            .with_selection(selection);
        self.navigate(services, request);
    }

    pub fn go_back(&mut self, services: &mut Services, distance: usize) -> Result<(), NavigationError> {
        self.go_to(services, ChangeKind::Back, distance)
    }

    pub fn go_forward(&mut self, services: &mut Services, distance: usize) -> Result<(), NavigationError> {
        self.go_to(services, ChangeKind::Forward, distance)
    }

    fn go_to(
        &mut self,
        services: &mut Services,
        kind: ChangeKind,
        distance: usize,
    ) -> Result<(), NavigationError> {
        let target = self.history.target(kind, distance)?.location.clone();
        self.navigate(
            services,
            NavigationRequest::new(target, kind)
                .with_distance(distance)
                .with_mode(OpenMode::ReuseView),
        );
        Ok(())
    }

    /// Re-resolve the current location. Does nothing before the first load.
    pub fn reload(&mut self, services: &mut Services) {
        match self.location.clone() {
            Some(location) => self.navigate(
                services,
                NavigationRequest::new(location, ChangeKind::Reload).with_mode(OpenMode::ReuseView),
            ),
            None => trace!("{:?}: nothing to reload", self.id),
        }
    }

    pub fn stop_loading(&mut self) {
        if self.controller.cancel() {
            self.close_behind = None;
            self.set_allow_stop(false);
        }
    }

    /// Open the parent location with the current one selected.
    pub fn go_up(&mut self, services: &mut Services) -> Result<(), NavigationError> {
        let current = self.location.clone().ok_or(NavigationError::NoActiveSlot)?;
        let parent = current
            .parent()
            .ok_or(NavigationError::Unsupported("going up from a root location"))?;
        self.navigate(
            services,
            NavigationRequest::standard(parent)
                .with_mode(OpenMode::ReuseView)
                .with_selection(vec![current]),
        );
        Ok(())
    }

    pub fn go_home(&mut self, services: &mut Services) {
        let home = services.home.clone();
        self.navigate(services, NavigationRequest::standard(home));
    }

    /// The viewed location was moved; follow it without touching history.
    pub fn redirect(&mut self, services: &mut Services, target: Location) {
        self.navigate(
            services,
            NavigationRequest::new(target, ChangeKind::Redirect).with_mode(OpenMode::ReuseView),
        );
    }

    /// Leave a location that can no longer be shown.
    pub fn fall_back(&mut self, services: &mut Services, target: Location) {
        self.navigate(services, NavigationRequest::new(target, ChangeKind::Fallback));
    }

    pub fn deliver(&mut self, services: &mut Services, completion: Completion) -> Delivery {
        if !self.controller.accepts(&completion.ticket) {
            trace!(
                "{:?}: discarding stale completion (generation {})",
                self.id,
                completion.ticket.generation
            );
            return Delivery::Stale;
        }
        let transition =
            self.controller
                .complete(services, self.view.as_deref_mut(), completion.outcome);
        self.apply(services, transition);
        Delivery::Applied
    }

    pub(crate) fn navigate(&mut self, services: &mut Services, request: NavigationRequest) {
        self.controller.begin(request);
        if self.location.is_none() {
            self.set_title(LOADING_TITLE.to_string());
        }
        self.set_allow_stop(true);
        let transition = self.controller.start(services, self.view.as_deref_mut());
        self.apply(services, transition);
    }

    pub(crate) fn set_close_behind(&mut self, origin: SlotId) {
        self.close_behind = Some(origin);
    }

    pub(crate) fn take_notices(&mut self) -> Vec<SlotNotice> {
        std::mem::take(&mut self.notices)
    }

    fn apply(&mut self, services: &mut Services, transition: Transition) {
        match transition {
            Transition::Suspended => {}
            Transition::Commit(commit) => self.commit(services, commit),
            Transition::Failed { request, error } => self.fail(services, request, error),
        }
    }

    fn commit(&mut self, services: &mut Services, commit: Commit) {
        let Commit {
            request,
            resolved,
            view,
            view_error,
        } = commit;

        let previous = self.location.take().map(|location| self.history_entry(location));
        if let Err(e) = self.history.commit(
            request.kind,
            request.distance,
            previous,
            &resolved.location,
        ) {
            debug_assert!(false, "history rewrite failed: {}", e);
            warn!("{:?}: history left unchanged: {}", self.id, e);
        }

        let location = resolved.location;
        let mut selection = request.selection;
        if let ViewChange::Replace(view) = view {
            // A rebuilt view starts empty; keep what was selected before the reload.
            if request.kind == ChangeKind::Reload && selection.is_empty() {
                if let Some(old) = self.view.as_deref().filter(|old| old.location() == &location) {
                    selection = old.selection();
                }
            }
            self.view = Some(view);
        }
        self.location = Some(location.clone());
        if !selection.is_empty() {
            if let Some(view) = self.view.as_deref_mut() {
                view.select(&selection);
            }
        }

        let metadata = services.metadata.get(&location);
        services.history.add(
            HistoryEntry::new(location.clone())
                .with_name(metadata.display_name.clone())
                .with_icon(metadata.icon.clone()),
        );
        let title = metadata.display_name.clone();
        self.viewed_file = Some(metadata);
        self.controller.finish();

        info!("{:?}: showing {} ({:?})", self.id, location, request.kind);
        self.set_allow_stop(false);
        self.notices.push(SlotNotice::Committed {
            location,
            close_behind: self.close_behind.take(),
        });
        self.set_title(title);
        if request.kind != ChangeKind::Fallback || view_error.is_some() {
            self.set_status(view_error.map(|e| e.to_string()));
        }
    }

    fn fail(&mut self, services: &mut Services, request: NavigationRequest, error: ResolveError) {
        warn!("{:?}: unable to show {}: {}", self.id, request.target, error);
        self.close_behind = None;
        self.set_allow_stop(false);
        let message = error.to_string();
        self.set_status(Some(message.clone()));
        self.notices.push(SlotNotice::Failed(message));

        // A slot that never showed anything must not stay empty.
        if self.location.is_none()
            && request.kind != ChangeKind::Fallback
            && request.target != services.home
        {
            info!("{:?}: falling back to {}", self.id, services.home);
            let home = services.home.clone();
            self.fall_back(services, home);
        }
    }

    fn history_entry(&self, location: Location) -> HistoryEntry {
        let entry = HistoryEntry::new(location);
        match &self.viewed_file {
            Some(meta) => entry
                .with_name(meta.display_name.clone())
                .with_icon(meta.icon.clone()),
            None => entry,
        }
    }

    fn set_allow_stop(&mut self, allow_stop: bool) {
        if self.allow_stop != allow_stop {
            self.allow_stop = allow_stop;
            self.notices.push(SlotNotice::LoadingChanged(allow_stop));
        }
    }

    fn set_title(&mut self, title: String) {
        if self.title != title {
            self.title = title.clone();
            self.notices.push(SlotNotice::TitleChanged(title));
        }
    }

    fn set_status(&mut self, status: Option<String>) {
        if self.status != status {
            self.status = status.clone();
            self.notices.push(SlotNotice::StatusChanged(status));
        }
    }
}
