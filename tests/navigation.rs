use heike_nav::config::Config;
use heike_nav::input::NavCommand;
use heike_nav::services::memory::{MemoryBackend, MemoryView};
use heike_nav::state::{Delivery, Lifecycle, Slot, Window};
use heike_nav::{Application, Capabilities, Completion, Location, OpenFlags, OpenMode, WindowId};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const TREE: &[&str] = &[
    "/home",
    "/home/docs",
    "/home/music",
    "/home/pictures",
    "/home/docs/2024",
    "/media/usb",
    "/media/usb/photos",
];

fn setup() -> (MemoryBackend, Application) {
    let backend = MemoryBackend::new();
    for dir in TREE {
        backend.add_directory(*dir);
    }
    let app = Application::new(backend.services("/home".into()), &Config::default());
    (backend, app)
}

/// Deliver queued completions until the backend has nothing left.
fn drain(backend: &MemoryBackend, app: &mut Application) {
    loop {
        let completions = backend.take_completions();
        if completions.is_empty() {
            break;
        }
        for completion in completions {
            app.deliver(completion);
        }
    }
}

fn active(app: &Application, window: WindowId) -> &Slot {
    app.window(window)
        .and_then(Window::active_slot)
        .expect("window has an active slot")
}

fn locations<'a>(entries: impl IntoIterator<Item = &'a heike_nav::HistoryEntry>) -> Vec<String> {
    entries
        .into_iter()
        .map(|entry| entry.location.to_string())
        .collect()
}

fn open(app: &mut Application, window: WindowId, path: &str) {
    app.open_location(window, path.into(), OpenMode::Default, OpenFlags::empty())
        .unwrap();
}

#[test]
fn back_and_forward_rotate_history() {
    let (_backend, mut app) = setup();
    let window = app.open_window("/home".into(), Capabilities::navigation()).unwrap();

    open(&mut app, window, "/home/docs");
    let slot = active(&app, window);
    assert_eq!(slot.location(), Some(&Location::from("/home/docs")));
    assert_eq!(locations(slot.back_list()), vec!["/home"]);
    assert!(slot.forward_list().is_empty());

    app.dispatch(window, NavCommand::Back(0)).unwrap();
    let slot = active(&app, window);
    assert_eq!(slot.location(), Some(&Location::from("/home")));
    assert!(slot.back_list().is_empty());
    assert_eq!(locations(slot.forward_list()), vec!["/home/docs"]);

    app.dispatch(window, NavCommand::Forward(0)).unwrap();
    let slot = active(&app, window);
    assert_eq!(slot.location(), Some(&Location::from("/home/docs")));
    assert_eq!(locations(slot.back_list()), vec!["/home"]);
    assert!(slot.forward_list().is_empty());
}

#[test]
fn jumping_several_steps_keeps_order() {
    let (_backend, mut app) = setup();
    let window = app.open_window("/home".into(), Capabilities::navigation()).unwrap();
    for path in ["/home/docs", "/home/music", "/home/pictures"] {
        open(&mut app, window, path);
    }
    app.dispatch(window, NavCommand::Back(1)).unwrap();
    let slot = active(&app, window);
    assert_eq!(slot.location(), Some(&Location::from("/home/docs")));
    assert_eq!(locations(slot.back_list()), vec!["/home"]);
    assert_eq!(
        locations(slot.forward_list()),
        vec!["/home/music", "/home/pictures"]
    );
}

#[test]
fn superseded_resolution_is_discarded() {
    let (backend, mut app) = setup();
    let window = app.open_window("/home".into(), Capabilities::navigation()).unwrap();
    backend.set_asynchronous(true);

    open(&mut app, window, "/home/docs");
    open(&mut app, window, "/home/music");
    let mut queued = backend.take_completions();
    assert_eq!(queued.len(), 2);

    // The newer run answers first, the older one after it
    let late = queued.remove(0);
    let current = queued.remove(0);
    assert_eq!(app.deliver(current), Delivery::Applied);
    drain(&backend, &mut app);
    assert_eq!(app.deliver(late), Delivery::Stale);

    let slot = active(&app, window);
    assert_eq!(slot.location(), Some(&Location::from("/home/music")));
    assert_eq!(locations(slot.back_list()), vec!["/home"]);
    assert!(!slot.is_loading());
}

#[test]
fn completions_for_closed_slots_are_stale() {
    let (backend, mut app) = setup();
    let window = app.open_window("/home".into(), Capabilities::navigation()).unwrap();
    app.dispatch(window, NavCommand::NewTab).unwrap();
    backend.set_asynchronous(true);
    open(&mut app, window, "/home/docs");
    app.dispatch(window, NavCommand::CloseTab).unwrap();
    for completion in backend.take_completions() {
        assert_eq!(app.deliver(completion), Delivery::Stale);
    }
}

#[test]
fn stop_cancels_the_pending_run() {
    let (backend, mut app) = setup();
    let window = app.open_window("/home".into(), Capabilities::navigation()).unwrap();
    backend.set_asynchronous(true);
    open(&mut app, window, "/home/docs");
    assert!(active(&app, window).is_loading());
    assert!(app.window(window).unwrap().chrome().allow_stop);

    app.dispatch(window, NavCommand::Stop).unwrap();
    assert!(!app.window(window).unwrap().chrome().allow_stop);
    for completion in backend.take_completions() {
        assert_eq!(app.deliver(completion), Delivery::Stale);
    }
    assert_eq!(
        active(&app, window).location(),
        Some(&Location::from("/home"))
    );
}

#[test]
fn reload_keeps_history_and_view() {
    let (_backend, mut app) = setup();
    let window = app.open_window("/home".into(), Capabilities::navigation()).unwrap();
    open(&mut app, window, "/home/docs");
    open(&mut app, window, "/home/music");
    app.dispatch(window, NavCommand::Back(0)).unwrap();

    let before = active(&app, window);
    let back = locations(before.back_list());
    let forward = locations(before.forward_list());

    app.dispatch(window, NavCommand::Reload).unwrap();
    app.dispatch(window, NavCommand::Reload).unwrap();

    let slot = active(&app, window);
    assert_eq!(locations(slot.back_list()), back);
    assert_eq!(locations(slot.forward_list()), forward);
    let view = slot
        .view()
        .and_then(|view| view.as_any().downcast_ref::<MemoryView>())
        .unwrap();
    assert_eq!(view.reloads, 2);
}

#[test]
fn failed_navigation_keeps_the_old_location() {
    let (_backend, mut app) = setup();
    let window = app.open_window("/home/docs".into(), Capabilities::navigation()).unwrap();
    open(&mut app, window, "/nowhere");
    let slot = active(&app, window);
    assert_eq!(slot.location(), Some(&Location::from("/home/docs")));
    assert!(slot.status().unwrap().contains("does not exist"));
    assert!(slot.back_list().is_empty());
}

#[test]
fn first_failure_falls_back_home() {
    let (_backend, mut app) = setup();
    let window = app.open_window("/nowhere".into(), Capabilities::navigation()).unwrap();
    let slot = active(&app, window);
    assert_eq!(slot.location(), Some(&Location::from("/home")));
    assert!(slot.status().is_some());
}

#[test]
fn broken_view_still_commits() {
    let (backend, mut app) = setup();
    backend.break_view("/home/docs");
    let window = app.open_window("/home".into(), Capabilities::navigation()).unwrap();
    open(&mut app, window, "/home/docs");
    let slot = active(&app, window);
    assert_eq!(slot.location(), Some(&Location::from("/home/docs")));
    assert_eq!(slot.view().map(|view| view.view_id()), Some("error"));
    assert!(slot.status().is_some());
}

#[test]
fn unmounted_locations_are_mounted_once() {
    let (backend, mut app) = setup();
    backend.add_unmounted("/media/usb");
    backend.set_asynchronous(true);
    let window = app.open_window("/home".into(), Capabilities::navigation()).unwrap();
    drain(&backend, &mut app);

    open(&mut app, window, "/media/usb/photos");
    drain(&backend, &mut app);
    assert_eq!(backend.mount_calls(), 1);
    assert_eq!(
        active(&app, window).location(),
        Some(&Location::from("/media/usb/photos"))
    );
}

#[test]
fn ineffective_mount_gives_up() {
    let (backend, mut app) = setup();
    backend.add_unmounted("/media/usb");
    backend.mount_without_effect("/media/usb");
    let window = app.open_window("/home".into(), Capabilities::navigation()).unwrap();
    open(&mut app, window, "/media/usb");
    assert_eq!(backend.mount_calls(), 1);
    let slot = active(&app, window);
    assert_eq!(slot.location(), Some(&Location::from("/home")));
    assert!(slot.status().unwrap().contains("mounted"));
}

#[test]
fn background_tab_closes_origin_after_commit() {
    let (backend, mut app) = setup();
    let window = app.open_window("/home".into(), Capabilities::navigation()).unwrap();
    let origin = active(&app, window).id();
    backend.set_asynchronous(true);

    let flags = OpenFlags::NEW_TAB | OpenFlags::CLOSE_BEHIND;
    let opened = app
        .open_location(window, "/home/docs".into(), OpenMode::Default, flags)
        .unwrap()
        .unwrap();
    // Nothing closes until the new tab commits
    assert!(app.window(window).unwrap().contains_slot(origin));

    drain(&backend, &mut app);
    let w = app.window(window).unwrap();
    assert!(!w.contains_slot(origin));
    assert_eq!(w.active_slot_id(), Some(opened));
    assert!(w.check_invariants());
}

#[test]
fn split_view_on_then_off() {
    let (_backend, mut app) = setup();
    let window = app.open_window("/home/docs".into(), Capabilities::navigation()).unwrap();
    let primary = app.window(window).unwrap().active_pane_id().unwrap();

    app.dispatch(window, NavCommand::ToggleSplitView).unwrap();
    let w = app.window(window).unwrap();
    assert_eq!(w.panes().len(), 2);
    assert_ne!(w.active_pane_id(), Some(primary));
    let location = w.active_slot().and_then(Slot::location).unwrap();
    assert!(!location.is_search());

    app.dispatch(window, NavCommand::ToggleSplitView).unwrap();
    let w = app.window(window).unwrap();
    assert_eq!(w.panes().len(), 1);
    assert_eq!(w.active_pane_id(), Some(primary));
}

#[test]
fn closing_last_slots() {
    let (_backend, mut app) = setup();
    let window = app.open_window("/home".into(), Capabilities::navigation()).unwrap();
    app.dispatch(window, NavCommand::ToggleSplitView).unwrap();
    // Only slot of the extra pane
    app.dispatch(window, NavCommand::CloseTab).unwrap();
    assert_eq!(app.window(window).unwrap().panes().len(), 1);
    // Only slot of the only pane
    app.dispatch(window, NavCommand::CloseTab).unwrap();
    assert!(app.window(window).is_none());
}

#[test]
fn moved_folder_is_followed_without_history() {
    let (backend, mut app) = setup();
    let window = app.open_window("/home".into(), Capabilities::navigation()).unwrap();
    open(&mut app, window, "/home/docs/2024");
    backend.add_directory("/home/papers");
    backend.add_directory("/home/papers/2024");

    assert_eq!(app.location_moved(&"/home/docs".into(), &"/home/papers".into()), 1);
    let slot = active(&app, window);
    assert_eq!(slot.location(), Some(&Location::from("/home/papers/2024")));
    assert_eq!(locations(slot.back_list()), vec!["/home"]);
}

#[derive(Clone, Debug)]
enum Op {
    Open(usize),
    Back(usize),
    Forward(usize),
    NewTab,
    CloseTab,
    NextTab,
    Split,
    NextPane,
    Reload,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..TREE.len()).prop_map(Op::Open),
        (0..4usize).prop_map(Op::Back),
        (0..4usize).prop_map(Op::Forward),
        Just(Op::NewTab),
        Just(Op::CloseTab),
        Just(Op::NextTab),
        Just(Op::Split),
        Just(Op::NextPane),
        Just(Op::Reload),
    ]
}

/// Window churn while answers are still outstanding.
#[derive(Clone, Debug)]
enum Churn {
    Open(usize),
    NewTab,
    CloseSlot,
    ClosePane,
    Split(bool),
    Activate(usize),
    NextPane,
    /// Hand back one held answer, whichever is at this position.
    Answer(usize),
}

fn churn() -> impl Strategy<Value = Churn> {
    prop_oneof![
        (0..TREE.len()).prop_map(Churn::Open),
        Just(Churn::NewTab),
        Just(Churn::CloseSlot),
        Just(Churn::ClosePane),
        any::<bool>().prop_map(Churn::Split),
        (0..8usize).prop_map(Churn::Activate),
        Just(Churn::NextPane),
        (0..8usize).prop_map(Churn::Answer),
    ]
}

fn run_churn(app: &mut Application, window: WindowId, held: &mut Vec<Completion>, churn: Churn) {
    if let Churn::Answer(index) = churn {
        if !held.is_empty() {
            let completion = held.remove(index % held.len());
            app.deliver(completion);
        }
        return;
    }
    // Refusals such as closing an unknown slot are fine here
    let _ = app.with_window(window, |w, services| match churn {
        Churn::Open(index) => w
            .open_location(services, TREE[index].into(), OpenMode::Default, OpenFlags::empty(), Vec::new())
            .map(drop),
        Churn::NewTab => w.new_tab(services).map(drop),
        Churn::CloseSlot => match w.active_slot_id() {
            Some(slot) => w.close_slot(services, slot).map(drop),
            None => Ok(()),
        },
        Churn::ClosePane => match w.active_pane_id() {
            Some(pane) => w.close_pane(services, pane).map(drop),
            None => Ok(()),
        },
        Churn::Split(true) => w.split_view_on(services).map(drop),
        Churn::Split(false) => w.split_view_off(),
        Churn::Activate(index) => {
            let slots = w.slot_ids();
            match slots.get(index % slots.len().max(1)) {
                Some(slot) => w.set_active_slot(*slot),
                None => Ok(()),
            }
        }
        Churn::NextPane => w.next_pane().map(drop),
        Churn::Answer(_) => Ok(()),
    });
}

fn multiset(slot: &Slot) -> Vec<String> {
    let mut all = locations(slot.back_list().iter().chain(slot.forward_list()));
    all.extend(slot.location().map(Location::to_string));
    all.sort();
    all
}

proptest! {
    #[test]
    fn history_moves_never_lose_entries(
        visits in proptest::collection::vec(0..TREE.len(), 1..8),
        moves in proptest::collection::vec((any::<bool>(), 0..6usize), 0..12),
    ) {
        let (_backend, mut app) = setup();
        let window = app.open_window("/home".into(), Capabilities::navigation()).unwrap();
        for index in visits {
            open(&mut app, window, TREE[index]);
        }
        let expected = multiset(active(&app, window));

        for (back, distance) in moves {
            let slot = active(&app, window);
            let available = if back { slot.back_list().len() } else { slot.forward_list().len() };
            if available == 0 {
                continue;
            }
            let distance = distance % available;
            let command = if back { NavCommand::Back(distance) } else { NavCommand::Forward(distance) };
            app.dispatch(window, command).unwrap();
            prop_assert_eq!(multiset(active(&app, window)), expected.clone());
        }
    }

    #[test]
    fn one_active_pane_and_slot_after_any_operation(ops in proptest::collection::vec(op(), 1..30)) {
        let (_backend, mut app) = setup();
        let window = app
            .open_window("/home".into(), Capabilities::navigation().persistent())
            .unwrap();
        for op in ops {
            let command = match op {
                Op::Open(index) => NavCommand::OpenLocation {
                    target: TREE[index].into(),
                    flags: OpenFlags::empty(),
                },
                Op::Back(distance) => NavCommand::Back(distance),
                Op::Forward(distance) => NavCommand::Forward(distance),
                Op::NewTab => NavCommand::NewTab,
                Op::CloseTab => NavCommand::CloseTab,
                Op::NextTab => NavCommand::NextTab,
                Op::Split => NavCommand::ToggleSplitView,
                Op::NextPane => NavCommand::NextPane,
                Op::Reload => NavCommand::Reload,
            };
            // Out-of-range history moves are allowed to fail
            let _ = app.dispatch(window, command);
            let w = app.window(window).unwrap();
            prop_assert!(w.check_invariants());
            prop_assert!(w.active_slot().is_some());
        }
    }

    #[test]
    fn late_answers_never_break_a_persistent_window(
        steps in proptest::collection::vec(churn(), 1..40),
    ) {
        let (backend, mut app) = setup();
        backend.set_asynchronous(true);
        let window = app
            .open_window("/home".into(), Capabilities::navigation().persistent())
            .unwrap();

        let mut held = Vec::new();
        for step in steps {
            held.extend(backend.take_completions());
            run_churn(&mut app, window, &mut held, step);

            let w = app.window(window).unwrap();
            prop_assert_eq!(w.lifecycle(), Lifecycle::Showing);
            prop_assert!(w.check_invariants());
            prop_assert!(w.active_slot().is_some());
        }

        for completion in held.drain(..).rev() {
            app.deliver(completion);
        }
        drain(&backend, &mut app);

        let w = app.window(window).unwrap();
        prop_assert_eq!(w.lifecycle(), Lifecycle::Showing);
        prop_assert!(w.check_invariants());
        for pane in w.panes() {
            for slot in pane.slots() {
                prop_assert!(slot.location().is_some(), "{:?} never settled", slot.id());
            }
        }
    }
}
