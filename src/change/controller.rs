// Location-change state machine
//
//   Idle -> Resolving -> [Mounting -> Resolving] -> DeterminingView -> Committing -> Idle
//
// Any phase can drop back to Idle on cancel or resolution failure. Resolving,
// Mounting and DeterminingView may suspend until a completion arrives.

use super::{CancellationSource, ChangeKind, NavigationRequest, OpenMode, Outcome, Ticket};
use crate::error::{ResolveError, ViewError};
use crate::ids::SlotId;
use crate::services::{ContentView, Resolution, ResolvedLocation, Services, Step};
use tracing::{debug, trace, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Resolving,
    Mounting,
    DeterminingView,
    Committing,
}

#[derive(Debug)]
pub enum ViewChange {
    /// The current view refreshed itself in place.
    Keep,
    Replace(Box<dyn ContentView>),
}

/// Everything the slot needs to swap in the new location atomically.
#[derive(Debug)]
pub struct Commit {
    pub request: NavigationRequest,
    pub resolved: ResolvedLocation,
    pub view: ViewChange,
    /// Set when an error view stands in for the real one.
    pub view_error: Option<ViewError>,
}

#[derive(Debug)]
pub enum Transition {
    /// Waiting on a collaborator.
    Suspended,
    Commit(Commit),
    Failed {
        request: NavigationRequest,
        error: ResolveError,
    },
}

#[derive(Debug)]
struct Run {
    request: NavigationRequest,
    source: CancellationSource,
    ticket: Ticket,
    mount_attempted: bool,
    resolved: Option<ResolvedLocation>,
}

enum Flow {
    Continue(Outcome),
    Stop(Transition),
}

#[derive(Debug)]
pub struct LocationChangeController {
    slot: SlotId,
    generation: u64,
    phase: Phase,
    run: Option<Run>,
}

impl LocationChangeController {
    pub fn new(slot: SlotId) -> Self {
        Self {
            slot,
            generation: 0,
            phase: Phase::Idle,
            run: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    pub fn request(&self) -> Option<&NavigationRequest> {
        self.run.as_ref().map(|run| &run.request)
    }

    pub fn ticket(&self) -> Option<&Ticket> {
        self.run.as_ref().map(|run| &run.ticket)
    }

    /// Start a new run, cancelling whatever was in flight.
    pub fn begin(&mut self, request: NavigationRequest) -> Ticket {
        if self.cancel() {
            debug!("{:?}: previous location change superseded", self.slot);
        }

        self.generation += 1;
        let source = CancellationSource::new();
        let ticket = Ticket {
            slot: self.slot,
            generation: self.generation,
            token: source.token(),
        };
        debug!(
            "{:?}: begin {:?} change to {} (generation {})",
            self.slot, request.kind, request.target, self.generation
        );

        self.run = Some(Run {
            request,
            source,
            ticket: ticket.clone(),
            mount_attempted: false,
            resolved: None,
        });
        self.phase = Phase::Resolving;
        ticket
    }

    /// Cancel the current run. Returns false if nothing was in flight.
    pub fn cancel(&mut self) -> bool {
        match self.run.take() {
            Some(run) => {
                run.source.cancel();
                debug!(
                    "{:?}: cancelled change to {} in {:?}",
                    self.slot, run.request.target, self.phase
                );
                self.phase = Phase::Idle;
                true
            }
            None => false,
        }
    }

    /// True if a completion for `ticket` belongs to the run in flight.
    pub fn accepts(&self, ticket: &Ticket) -> bool {
        ticket.slot == self.slot
            && !ticket.is_cancelled()
            && self
                .run
                .as_ref()
                .is_some_and(|run| run.ticket.generation == ticket.generation)
    }

    /// Kick off resolution for the run created by [`begin`](Self::begin).
    pub fn start(
        &mut self,
        services: &mut Services,
        current_view: Option<&mut (dyn ContentView + 'static)>,
    ) -> Transition {
        let (ticket, target) = match &self.run {
            Some(run) if self.phase == Phase::Resolving => {
                (run.ticket.clone(), run.request.target.clone())
            }
            _ => return Transition::Suspended,
        };
        match services.resolver.resolve(&ticket, &target) {
            Step::Ready(resolution) => {
                self.drive(services, current_view, Outcome::Resolved(resolution))
            }
            Step::Pending => {
                trace!("{:?}: waiting for resolution of {}", self.slot, target);
                Transition::Suspended
            }
        }
    }

    /// Feed a late completion. The caller checks [`accepts`](Self::accepts) first.
    pub fn complete(
        &mut self,
        services: &mut Services,
        current_view: Option<&mut (dyn ContentView + 'static)>,
        outcome: Outcome,
    ) -> Transition {
        self.drive(services, current_view, outcome)
    }

    /// Called by the slot once a [`Transition::Commit`] has been applied.
    pub fn finish(&mut self) {
        if self.phase == Phase::Committing {
            self.phase = Phase::Idle;
        }
    }

    fn drive(
        &mut self,
        services: &mut Services,
        mut current_view: Option<&mut (dyn ContentView + 'static)>,
        mut outcome: Outcome,
    ) -> Transition {
        loop {
            let flow = match (self.phase, outcome) {
                (Phase::Resolving, Outcome::Resolved(resolution)) => {
                    self.on_resolved(services, current_view.as_deref_mut(), resolution)
                }
                (Phase::Mounting, Outcome::Mounted(Ok(()))) => self.retry_resolve(services),
                (Phase::Mounting, Outcome::Mounted(Err(error))) => Flow::Stop(self.fail(error)),
                (Phase::DeterminingView, Outcome::ViewCreated(view)) => {
                    Flow::Stop(self.on_view(services, view))
                }
                (phase, other) => {
                    warn!(
                        "{:?}: ignoring {:?} completion while {:?}",
                        self.slot, other, phase
                    );
                    Flow::Stop(Transition::Suspended)
                }
            };
            match flow {
                Flow::Continue(next) => outcome = next,
                Flow::Stop(transition) => return transition,
            }
        }
    }

    fn on_resolved(
        &mut self,
        services: &mut Services,
        current_view: Option<&mut (dyn ContentView + 'static)>,
        resolution: Resolution,
    ) -> Flow {
        let Some(run) = self.run.as_mut() else {
            return Flow::Stop(Transition::Suspended);
        };

        match resolution {
            Resolution::Resolved(resolved) => {
                if run.request.kind == ChangeKind::Reload {
                    let preferred = match current_view {
                        Some(view) => {
                            if view.location() == &resolved.location && view.reload(&resolved) {
                                trace!("{:?}: view reloaded in place", self.slot);
                                return Flow::Stop(self.commit(resolved, ViewChange::Keep, None));
                            }
                            Some(view.view_id().to_string())
                        }
                        None => None,
                    };
                    return self.determine_view(services, preferred, resolved);
                }
                let preferred = match &run.request.mode {
                    OpenMode::Default => None,
                    OpenMode::ReuseView => current_view.map(|view| view.view_id().to_string()),
                    OpenMode::View(id) => Some(id.clone()),
                };
                self.determine_view(services, preferred, resolved)
            }
            Resolution::MountRequired if !run.mount_attempted => {
                run.mount_attempted = true;
                self.phase = Phase::Mounting;
                debug!("{:?}: mounting {}", self.slot, run.request.target);
                match services.resolver.mount(&run.ticket, &run.request.target) {
                    Step::Ready(result) => Flow::Continue(Outcome::Mounted(result)),
                    Step::Pending => Flow::Stop(Transition::Suspended),
                }
            }
            Resolution::MountRequired => {
                let error = ResolveError::MountRequired(run.request.target.clone());
                Flow::Stop(self.fail(error))
            }
            Resolution::Failed(error) => Flow::Stop(self.fail(error)),
        }
    }

    fn retry_resolve(&mut self, services: &mut Services) -> Flow {
        let Some(run) = self.run.as_ref() else {
            return Flow::Stop(Transition::Suspended);
        };
        self.phase = Phase::Resolving;
        match services.resolver.resolve(&run.ticket, &run.request.target) {
            Step::Ready(resolution) => Flow::Continue(Outcome::Resolved(resolution)),
            Step::Pending => Flow::Stop(Transition::Suspended),
        }
    }

    fn determine_view(
        &mut self,
        services: &mut Services,
        preferred: Option<String>,
        resolved: ResolvedLocation,
    ) -> Flow {
        let Some(run) = self.run.as_mut() else {
            return Flow::Stop(Transition::Suspended);
        };
        self.phase = Phase::DeterminingView;
        let step = services
            .views
            .create_view(&run.ticket, &resolved, preferred.as_deref());
        run.resolved = Some(resolved);
        match step {
            Step::Ready(view) => Flow::Continue(Outcome::ViewCreated(view)),
            Step::Pending => Flow::Stop(Transition::Suspended),
        }
    }

    fn on_view(
        &mut self,
        services: &mut Services,
        view: Result<Box<dyn ContentView>, ViewError>,
    ) -> Transition {
        let resolved = self.run.as_mut().and_then(|run| run.resolved.take());
        let Some(resolved) = resolved else {
            debug_assert!(false, "view completion without a resolved location");
            return self.fail(ResolveError::Unreachable("view arrived before resolution".into()));
        };
        match view {
            Ok(view) => self.commit(resolved, ViewChange::Replace(view), None),
            Err(error) => {
                warn!("{:?}: no view for {}: {}", self.slot, resolved.location, error);
                let fallback = services.views.error_view(&resolved.location, &error);
                self.commit(resolved, ViewChange::Replace(fallback), Some(error))
            }
        }
    }

    fn commit(
        &mut self,
        resolved: ResolvedLocation,
        view: ViewChange,
        view_error: Option<ViewError>,
    ) -> Transition {
        match self.run.take() {
            Some(run) => {
                self.phase = Phase::Committing;
                Transition::Commit(Commit {
                    request: run.request,
                    resolved,
                    view,
                    view_error,
                })
            }
            None => {
                self.phase = Phase::Idle;
                Transition::Suspended
            }
        }
    }

    fn fail(&mut self, error: ResolveError) -> Transition {
        self.phase = Phase::Idle;
        match self.run.take() {
            Some(run) => {
                debug!("{:?}: change to {} failed: {}", self.slot, run.request.target, error);
                Transition::Failed {
                    request: run.request,
                    error,
                }
            }
            None => Transition::Suspended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::Completion;
    use crate::location::Location;
    use crate::services::memory::MemoryBackend;

    fn setup() -> (MemoryBackend, Services, LocationChangeController) {
        let backend = MemoryBackend::new();
        backend.add_directory("/home");
        backend.add_directory("/home/docs");
        let services = backend.services("/home".into());
        (backend, services, LocationChangeController::new(SlotId::next()))
    }

    fn committed(transition: Transition) -> Commit {
        match transition {
            Transition::Commit(commit) => commit,
            other => panic!("expected commit, got {:?}", other),
        }
    }

    #[test]
    fn synchronous_run_commits() {
        let (_backend, mut services, mut controller) = setup();
        controller.begin(NavigationRequest::standard("/home/docs".into()));
        assert_eq!(controller.phase(), Phase::Resolving);

        let commit = committed(controller.start(&mut services, None));
        assert_eq!(commit.resolved.location, Location::from("/home/docs"));
        assert!(matches!(commit.view, ViewChange::Replace(_)));
        assert_eq!(controller.phase(), Phase::Committing);
        controller.finish();
        assert_eq!(controller.phase(), Phase::Idle);
    }

    #[test]
    fn missing_location_fails_without_commit() {
        let (_backend, mut services, mut controller) = setup();
        controller.begin(NavigationRequest::standard("/nowhere".into()));
        match controller.start(&mut services, None) {
            Transition::Failed { error, .. } => {
                assert_eq!(error, ResolveError::NotFound("/nowhere".into()))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(!controller.is_running());
    }

    #[test]
    fn superseded_ticket_is_rejected() {
        let (backend, mut services, mut controller) = setup();
        backend.set_asynchronous(true);

        let first = controller.begin(NavigationRequest::standard("/home".into()));
        assert!(matches!(controller.start(&mut services, None), Transition::Suspended));
        let second = controller.begin(NavigationRequest::standard("/home/docs".into()));

        assert!(first.is_cancelled());
        assert!(!controller.accepts(&first));
        assert!(controller.accepts(&second));
    }

    #[test]
    fn cancel_is_safe_when_idle() {
        let (_backend, _services, mut controller) = setup();
        assert!(!controller.cancel());
        assert_eq!(controller.phase(), Phase::Idle);
    }

    #[test]
    fn mount_is_attempted_once() {
        let (backend, mut services, mut controller) = setup();
        backend.add_unmounted("/media/usb");
        controller.begin(NavigationRequest::standard("/media/usb".into()));
        let commit = committed(controller.start(&mut services, None));
        assert_eq!(commit.resolved.location, Location::from("/media/usb"));
        assert_eq!(backend.mount_calls(), 1);
    }

    #[test]
    fn mount_without_effect_is_an_error() {
        let (backend, mut services, mut controller) = setup();
        backend.add_unmounted("/media/stuck");
        backend.mount_without_effect("/media/stuck");
        controller.begin(NavigationRequest::standard("/media/stuck".into()));
        match controller.start(&mut services, None) {
            Transition::Failed { error, .. } => {
                assert_eq!(error, ResolveError::MountRequired("/media/stuck".into()))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(backend.mount_calls(), 1);
    }

    #[test]
    fn view_failure_still_commits() {
        let (backend, mut services, mut controller) = setup();
        backend.add_location("/home/blob", "application/x-unknown");
        controller.begin(NavigationRequest::standard("/home/blob".into()));
        let commit = committed(controller.start(&mut services, None));
        assert!(commit.view_error.is_some());
        match commit.view {
            ViewChange::Replace(view) => assert_eq!(view.view_id(), "error"),
            ViewChange::Keep => panic!("error view expected"),
        }
    }

    #[test]
    fn asynchronous_run_resumes_on_completion() {
        let (backend, mut services, mut controller) = setup();
        backend.set_asynchronous(true);
        let ticket = controller.begin(NavigationRequest::standard("/home/docs".into()));
        assert!(matches!(controller.start(&mut services, None), Transition::Suspended));

        let mut pending = backend.take_completions();
        assert_eq!(pending.len(), 1);
        let Completion { ticket: t, outcome } = pending.remove(0);
        assert_eq!(t.generation, ticket.generation);
        assert!(matches!(
            controller.complete(&mut services, None, outcome),
            Transition::Suspended
        ));
        assert_eq!(controller.phase(), Phase::DeterminingView);

        let Completion { outcome, .. } = backend.take_completions().remove(0);
        let commit = committed(controller.complete(&mut services, None, outcome));
        assert_eq!(commit.resolved.location, Location::from("/home/docs"));
    }

    #[test]
    fn reload_keeps_view_that_refreshes() {
        let (_backend, mut services, mut controller) = setup();
        controller.begin(NavigationRequest::standard("/home".into()));
        let mut view = match committed(controller.start(&mut services, None)).view {
            ViewChange::Replace(view) => view,
            ViewChange::Keep => unreachable!(),
        };
        controller.finish();

        controller.begin(NavigationRequest::new("/home".into(), ChangeKind::Reload));
        let commit = committed(controller.start(&mut services, Some(view.as_mut())));
        assert!(matches!(commit.view, ViewChange::Keep));
    }
}
