use eframe::egui;
use egui_extras::{Column, TableBuilder};
use heike_nav::change::Completion;
use heike_nav::config::Config;
use heike_nav::history::{HistoryList, TomlHistoryStore};
use heike_nav::ids::{PaneId, SlotId, WindowId};
use heike_nav::input::{Gesture, Modifiers, NavCommand, NavKey, MIDDLE_BUTTON, PRIMARY_BUTTON};
use heike_nav::io::{
    spawn_worker, DirectoryView, DirectoryViewFactory, DirectoryWatcher, ErrorView, FsMetadata,
    FsResolver, MountTable, SearchView, WatchEvent, GRID_VIEW, LIST_VIEW,
};
use heike_nav::services::Services;
use heike_nav::state::{Pane, Window};
use heike_nav::{Application, Location, OpenFlags, OpenMode};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Work collected while drawing, applied once the frame is laid out.
enum Action {
    Command(NavCommand),
    OpenFile(PathBuf),
    FocusWindow(WindowId),
    SwitchView(&'static str),
}

struct HeikeNav {
    app: Application,
    completions: Receiver<Completion>,
    watcher: Option<DirectoryWatcher>,
    current: Option<WindowId>,
    address: String,
    address_for: Option<Location>,
    search: String,
    title: String,
    error_message: Option<String>,
}

impl HeikeNav {
    fn new(cc: &eframe::CreationContext<'_>, config: Config) -> Self {
        let mounts = MountTable::default();
        let ctx = cc.egui_ctx.clone();
        let (commands, completions) = spawn_worker(mounts.clone(), move || ctx.request_repaint());
        let ctx = cc.egui_ctx.clone();
        let watcher = match DirectoryWatcher::new(mounts.clone(), move || ctx.request_repaint()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("directories will not be watched: {}", e);
                None
            }
        };

        let home = config.home_location();
        let history = if config.history.persist {
            match TomlHistoryStore::open_default() {
                Ok(store) => HistoryList::load(Box::new(store), config.history.max_entries),
                Err(e) => {
                    warn!("history will not be saved: {}", e);
                    HistoryList::in_memory(config.history.max_entries)
                }
            }
        } else {
            HistoryList::in_memory(config.history.max_entries)
        };
        let search_root = home.path().unwrap_or_else(|| PathBuf::from("/"));
        let services = Services::new(
            Box::new(FsResolver::new(commands.clone())),
            Box::new(DirectoryViewFactory::new(commands, search_root)),
            Box::new(FsMetadata::new(home.clone(), mounts)),
            history,
            home,
        );

        let mut app = Application::new(services, &config);
        let current = match app.open_primary_window() {
            Ok(id) => Some(id),
            Err(e) => {
                error!("could not open the first window: {}", e);
                None
            }
        };

        Self {
            app,
            completions,
            watcher,
            current,
            address: String::new(),
            address_for: None,
            search: String::new(),
            title: String::new(),
            error_message: None,
        }
    }

    fn deliver_completions(&mut self) {
        while let Ok(completion) = self.completions.try_recv() {
            self.app.deliver(completion);
        }
    }

    /// Point the watcher at every shown directory and act on what it saw.
    fn watch_locations(&mut self) {
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };
        let shown: BTreeSet<PathBuf> = self
            .app
            .windows()
            .iter()
            .flat_map(|window| window.panes().iter())
            .flat_map(|pane| pane.slots().iter())
            .filter_map(|slot| slot.location().and_then(Location::path))
            .collect();
        watcher.set_shown(shown);

        for event in watcher.poll() {
            let affected = match &event {
                WatchEvent::Moved { from, to } => self
                    .app
                    .location_moved(&Location::from_path(from), &Location::from_path(to)),
                WatchEvent::Gone(path) => self.app.location_gone(&Location::from_path(path)),
                WatchEvent::Unmounted(path) => self.app.mount_removed(&Location::from_path(path)),
            };
            info!("{:?} affected {} slots", event, affected);
        }
    }

    fn current_window(&self) -> Option<&Window> {
        self.current.and_then(|id| self.app.window(id))
    }

    fn run(&mut self, command: NavCommand) {
        let Some(window) = self.current else {
            return;
        };
        if let Err(e) = self.app.dispatch(window, command) {
            self.error_message = Some(e.to_string());
        }
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        let Some(window) = self.current else {
            return;
        };
        let typing = ctx.wants_keyboard_input();
        let gestures: Vec<Gesture> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key,
                        pressed: true,
                        modifiers,
                        ..
                    } if !typing => nav_key(*key).map(|key| Gesture::Key {
                        key,
                        modifiers: nav_modifiers(*modifiers),
                    }),
                    egui::Event::PointerButton {
                        button,
                        pressed: true,
                        ..
                    } => match button {
                        egui::PointerButton::Extra1 => Some(Gesture::Button(8)),
                        egui::PointerButton::Extra2 => Some(Gesture::Button(9)),
                        _ => None,
                    },
                    _ => None,
                })
                .collect()
        });
        for gesture in gestures {
            if let Err(e) = self.app.handle_gesture(window, gesture) {
                self.error_message = Some(e.to_string());
            }
        }
    }

    fn sync_address(&mut self) {
        let location = self
            .current_window()
            .and_then(Window::active_slot)
            .and_then(|slot| slot.location())
            .cloned();
        if location != self.address_for {
            self.address = location.as_ref().map(Location::to_string).unwrap_or_default();
            self.address_for = location;
        }
    }

    fn switch_view(&mut self, view: &str) {
        let Some(window) = self.current else {
            return;
        };
        let Some(location) = self
            .current_window()
            .and_then(Window::active_slot)
            .and_then(|slot| slot.location())
            .cloned()
        else {
            return;
        };
        let mode = OpenMode::View(view.to_string());
        if let Err(e) = self.app.open_location(window, location, mode, OpenFlags::empty()) {
            self.error_message = Some(e.to_string());
        }
    }

    fn apply(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Command(command) => self.run(command),
                Action::OpenFile(path) => {
                    if let Err(e) = open::that(&path) {
                        self.error_message = Some(format!("Could not open file: {}", e));
                    }
                }
                Action::FocusWindow(id) => {
                    self.current = Some(id);
                    self.address_for = None;
                }
                Action::SwitchView(view) => self.switch_view(view),
            }
        }
    }
}

fn nav_key(key: egui::Key) -> Option<NavKey> {
    let key = match key {
        egui::Key::ArrowLeft => NavKey::Left,
        egui::Key::ArrowRight => NavKey::Right,
        egui::Key::ArrowUp => NavKey::Up,
        egui::Key::Home => NavKey::Home,
        egui::Key::PageUp => NavKey::PageUp,
        egui::Key::PageDown => NavKey::PageDown,
        egui::Key::Tab => NavKey::Tab,
        egui::Key::Escape => NavKey::Escape,
        egui::Key::Num1 => NavKey::Digit(1),
        egui::Key::Num2 => NavKey::Digit(2),
        egui::Key::Num3 => NavKey::Digit(3),
        egui::Key::Num4 => NavKey::Digit(4),
        egui::Key::Num5 => NavKey::Digit(5),
        egui::Key::Num6 => NavKey::Digit(6),
        egui::Key::Num7 => NavKey::Digit(7),
        egui::Key::Num8 => NavKey::Digit(8),
        egui::Key::Num9 => NavKey::Digit(9),
        egui::Key::Q => NavKey::Char('q'),
        egui::Key::R => NavKey::Char('r'),
        egui::Key::T => NavKey::Char('t'),
        egui::Key::W => NavKey::Char('w'),
        egui::Key::F3 => NavKey::F(3),
        egui::Key::F5 => NavKey::F(5),
        egui::Key::F6 => NavKey::F(6),
        egui::Key::F9 => NavKey::F(9),
        _ => return None,
    };
    Some(key)
}

fn nav_modifiers(modifiers: egui::Modifiers) -> Modifiers {
    Modifiers {
        alt: modifiers.alt,
        ctrl: modifiers.ctrl || modifiers.mac_cmd,
        shift: modifiers.shift,
    }
}

/// Opens `target` in `slot`, or wherever the click's flags send it.
fn open_in(actions: &mut Vec<Action>, slot: SlotId, target: Location, flags: OpenFlags) {
    actions.push(Action::Command(NavCommand::ActivateSlot(slot)));
    actions.push(Action::Command(NavCommand::OpenLocation { target, flags }));
}

fn render_pane(
    ui: &mut egui::Ui,
    app: &Application,
    window: &Window,
    pane: &Pane,
    actions: &mut Vec<Action>,
) {
    let modifiers = nav_modifiers(ui.input(|i| i.modifiers));
    let interpreter = app.interpreter();
    let dimmed = pane.chrome().inactive;

    if window.capabilities().tabs {
        ui.horizontal_wrapped(|ui| {
            for slot in pane.slots() {
                let active = pane.active_slot_id() == Some(slot.id());
                let mut label = egui::RichText::new(slot.title());
                if dimmed {
                    label = label.weak();
                }
                if ui.selectable_label(active, label).clicked() {
                    actions.push(Action::Command(NavCommand::ActivateSlot(slot.id())));
                }
                if ui.small_button("\u{00d7}").on_hover_text("Close tab").clicked() {
                    actions.push(Action::Command(NavCommand::ActivateSlot(slot.id())));
                    actions.push(Action::Command(NavCommand::CloseTab));
                }
            }
            if ui.small_button("+").on_hover_text("New tab").clicked() {
                if let Some(slot) = pane.active_slot_id() {
                    actions.push(Action::Command(NavCommand::ActivateSlot(slot)));
                }
                actions.push(Action::Command(NavCommand::NewTab));
            }
        });
    }

    let chrome = pane.chrome();
    if chrome.search_bar_visible {
        ui.label(format!("\u{1f50d} {}", chrome.location_bar));
    } else {
        ui.label(egui::RichText::new(&chrome.location_bar).monospace());
    }
    ui.separator();

    let Some(slot) = pane.active_slot() else {
        return;
    };
    let slot_id = slot.id();
    let Some(view) = slot.view() else {
        ui.centered_and_justified(|ui| {
            ui.spinner();
        });
        return;
    };

    if let Some(error_view) = view.as_any().downcast_ref::<ErrorView>() {
        ui.colored_label(egui::Color32::RED, &error_view.message);
        return;
    }

    let (entries, selection) = if let Some(listing) = view.as_any().downcast_ref::<DirectoryView>() {
        if listing.is_grid() {
            render_grid(ui, listing, slot_id, interpreter.open_flags(PRIMARY_BUTTON, modifiers), actions);
            return;
        }
        (&listing.entries, Some(listing))
    } else if let Some(search) = view.as_any().downcast_ref::<SearchView>() {
        if search.truncated {
            ui.weak(format!("Showing the first {} matches", search.hits.len()));
        }
        (&search.hits, None)
    } else {
        ui.label(format!("No renderer for the {} view", view.view_id()));
        return;
    };

    TableBuilder::new(ui)
        .id_salt(("pane", pane.id().raw()))
        .striped(true)
        .resizable(true)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .column(Column::auto().at_least(30.0))
        .column(Column::remainder().at_least(120.0))
        .column(Column::auto().at_least(70.0))
        .column(Column::auto().at_least(120.0))
        .column(Column::auto().at_least(80.0))
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.label("");
            });
            header.col(|ui| {
                ui.label("Name");
            });
            header.col(|ui| {
                ui.label("Size");
            });
            header.col(|ui| {
                ui.label("Modified");
            });
            header.col(|ui| {
                ui.label("Permissions");
            });
        })
        .body(|body| {
            body.rows(24.0, entries.len(), |mut row| {
                let entry = &entries[row.index()];
                let selected = selection.is_some_and(|listing| listing.is_selected(entry));
                row.set_selected(selected);

                row.col(|ui| {
                    ui.label(entry.get_icon());
                });
                row.col(|ui| {
                    let response = ui.selectable_label(selected, entry.display_name());
                    let button = if response.middle_clicked() {
                        Some(MIDDLE_BUTTON)
                    } else if response.clicked() {
                        Some(PRIMARY_BUTTON)
                    } else {
                        None
                    };
                    if let Some(button) = button {
                        if entry.is_dir {
                            let flags = interpreter.open_flags(button, modifiers);
                            open_in(actions, slot_id, Location::from_path(&entry.path), flags);
                        } else {
                            actions.push(Action::OpenFile(entry.path.clone()));
                        }
                    }
                });
                row.col(|ui| {
                    if !entry.is_dir {
                        ui.label(bytesize::ByteSize(entry.size).to_string());
                    }
                });
                row.col(|ui| {
                    ui.label(entry.modified_string());
                });
                row.col(|ui| {
                    ui.weak(entry.get_permissions_string());
                });
            });
        });
}

fn render_grid(
    ui: &mut egui::Ui,
    listing: &DirectoryView,
    slot: SlotId,
    flags: OpenFlags,
    actions: &mut Vec<Action>,
) {
    ui.horizontal_wrapped(|ui| {
        for entry in &listing.entries {
            let text = format!("{}\n{}", entry.get_icon(), entry.display_name());
            let button = egui::Button::new(text)
                .selected(listing.is_selected(entry))
                .min_size(egui::vec2(96.0, 64.0));
            if ui.add(button).clicked() {
                if entry.is_dir {
                    open_in(actions, slot, Location::from_path(&entry.path), flags);
                } else {
                    actions.push(Action::OpenFile(entry.path.clone()));
                }
            }
        }
    });
}

fn pane_ids(window: &Window) -> Vec<PaneId> {
    window.panes().iter().map(Pane::id).collect()
}

impl eframe::App for HeikeNav {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.deliver_completions();
        self.watch_locations();
        self.handle_input(ctx);

        if self.current.and_then(|id| self.app.window(id)).is_none() {
            self.current = self.app.windows().first().map(Window::id);
            self.address_for = None;
        }
        if !self.app.is_running() {
            info!("last window closed");
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }
        self.sync_address();

        let mut actions = Vec::new();
        let Some(chrome) = self.current_window().map(|window| window.chrome().clone()) else {
            return;
        };
        if chrome.title != self.title {
            self.title = chrome.title.clone();
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(self.title.clone()));
        }
        let Some(window) = self.current.and_then(|id| self.app.window(id)) else {
            return;
        };
        let grid = window
            .active_slot()
            .and_then(|slot| slot.view())
            .and_then(|view| view.as_any().downcast_ref::<DirectoryView>())
            .map(DirectoryView::is_grid);

        // --- Top Bar ---
        let mut address = self.address.clone();
        let mut search = self.search.clone();
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            if self.app.windows().len() > 1 {
                ui.horizontal(|ui| {
                    for (index, other) in self.app.windows().iter().enumerate() {
                        let current = Some(other.id()) == self.current;
                        if ui
                            .selectable_label(current, format!("Window {}", index + 1))
                            .clicked()
                        {
                            actions.push(Action::FocusWindow(other.id()));
                        }
                    }
                });
            }
            ui.horizontal(|ui| {
                let nav = |ui: &mut egui::Ui, enabled: bool, text: &str, hint: &str| {
                    ui.add_enabled(enabled, egui::Button::new(text))
                        .on_hover_text(hint)
                        .clicked()
                };
                if nav(ui, chrome.back_enabled, "\u{25c0}", "Back") {
                    actions.push(Action::Command(NavCommand::Back(0)));
                }
                if nav(ui, chrome.forward_enabled, "\u{25b6}", "Forward") {
                    actions.push(Action::Command(NavCommand::Forward(0)));
                }
                if nav(ui, chrome.up_enabled, "\u{2b06}", "Up") {
                    actions.push(Action::Command(NavCommand::Up));
                }
                if chrome.allow_stop {
                    if nav(ui, true, "\u{2715}", "Stop") {
                        actions.push(Action::Command(NavCommand::Stop));
                    }
                } else if nav(ui, true, "\u{27f3}", "Reload") {
                    actions.push(Action::Command(NavCommand::Reload));
                }
                if nav(ui, true, "\u{1f3e0}", "Home") {
                    actions.push(Action::Command(NavCommand::Home));
                }
                if let Some(grid) = grid {
                    let (text, hint, view) = if grid {
                        ("\u{2630}", "List view", LIST_VIEW)
                    } else {
                        ("\u{25a6}", "Grid view", GRID_VIEW)
                    };
                    if nav(ui, true, text, hint) {
                        actions.push(Action::SwitchView(view));
                    }
                }

                let response = ui.add_sized(
                    ui.available_size() - egui::vec2(220.0, 0.0),
                    egui::TextEdit::singleline(&mut address),
                );
                if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    actions.push(Action::Command(NavCommand::OpenLocation {
                        target: Location::parse(&address),
                        flags: OpenFlags::empty(),
                    }));
                }
                let response = ui.add(egui::TextEdit::singleline(&mut search).hint_text("Search"));
                if response.lost_focus()
                    && ui.input(|i| i.key_pressed(egui::Key::Enter))
                    && !search.trim().is_empty()
                {
                    actions.push(Action::Command(NavCommand::OpenLocation {
                        target: Location::search(&search),
                        flags: OpenFlags::empty(),
                    }));
                }
            });
            ui.add_space(4.0);
        });

        // --- Bottom Bar ---
        egui::TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if chrome.allow_stop {
                    ui.spinner();
                }
                if let Some(status) = &chrome.status {
                    ui.label(status);
                } else if let Some(listing) = window
                    .active_slot()
                    .and_then(|slot| slot.view())
                    .and_then(|view| view.as_any().downcast_ref::<DirectoryView>())
                {
                    ui.label(format!("{} items", listing.entries.len()));
                }
                if let Some(err) = &self.error_message {
                    ui.colored_label(egui::Color32::RED, format!(" | {}", err));
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(zoom) = chrome.zoom {
                        ui.label(format!("{}%", zoom));
                    }
                });
            });
        });

        // --- Sidebar: recently visited ---
        if chrome.sidebar_visible {
            egui::SidePanel::left("history_panel")
                .resizable(true)
                .default_width(180.0)
                .show(ctx, |ui| {
                    ui.add_space(4.0);
                    ui.vertical_centered(|ui| {
                        ui.heading("Recent");
                    });
                    ui.separator();
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        for entry in self.app.services().history.entries() {
                            if ui
                                .add(egui::Label::new(&entry.name).sense(egui::Sense::click()))
                                .on_hover_text(entry.location.to_string())
                                .clicked()
                            {
                                actions.push(Action::Command(NavCommand::OpenLocation {
                                    target: entry.location.clone(),
                                    flags: OpenFlags::empty(),
                                }));
                            }
                        }
                    });
                });
        }

        // --- Panes ---
        egui::CentralPanel::default().show(ctx, |ui| {
            let panes = pane_ids(window);
            ui.columns(panes.len().max(1), |columns| {
                for (column, pane_id) in columns.iter_mut().zip(&panes) {
                    let Some(pane) = window.pane(*pane_id) else {
                        continue;
                    };
                    let response = column
                        .scope(|ui| {
                            egui::ScrollArea::vertical()
                                .id_salt(("pane_scroll", pane_id.raw()))
                                .auto_shrink([false, false])
                                .show(ui, |ui| {
                                    render_pane(ui, &self.app, window, pane, &mut actions);
                                });
                        })
                        .response;
                    if !pane.is_active() && response.contains_pointer()
                        && column.input(|i| i.pointer.primary_pressed())
                    {
                        if let Some(slot) = pane.active_slot_id() {
                            actions.insert(0, Action::Command(NavCommand::ActivateSlot(slot)));
                        }
                    }
                }
            });
        });

        self.address = address;
        self.search = search;
        if !actions.is_empty() {
            self.error_message = None;
        }
        self.apply(actions);
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load();
    if let Err(e) = Config::create_default() {
        warn!("could not write default config: {}", e);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window.width, config.window.height])
            .with_title("File Browser"),
        ..Default::default()
    };

    eframe::run_native(
        "heike-nav",
        options,
        Box::new(move |cc| Ok(Box::new(HeikeNav::new(cc, config)))),
    )
}
