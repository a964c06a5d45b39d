// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use friends_map_core::debounce::{Debouncer, Ticket};
use friends_map_core::filter::RegionSelector;
use friends_map_core::navigation::{MapNavigator, NavigationOutcome};
use friends_map_core::preferences::{self, PreferenceUpdate, Settings};
use friends_map_core::state::{Action, AppState, Effect};
use friends_map_core::storage::{FileStorage, KeyValueStorage};
use friends_map_core::theme::{self, ThemeDocument};
use friends_map_core::{Friend, FriendStore, MapKind};
use iced::widget::{
    button, checkbox, column, container, horizontal_space, pick_list, row, scrollable, stack,
    text, text_input, Column,
};
use iced::{keyboard, Element, Length, Subscription, Task};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod map;
mod style;
use map::{FriendMapView, MapCamera, TileManager};
use style::Palette;

/// Points the GUI at a friend list on disk instead of the bundled one.
const DATA_ENV: &str = "FRIENDS_MAP_DATA";
const LOG_FILE_NAME: &str = "friends-map.log";
const STORAGE_POLL_INTERVAL: Duration = Duration::from_secs(2);

fn main() -> iced::Result {
    init_logging();
    iced::application("Friends Map", App::update, App::view)
        .subscription(App::subscription)
        .theme(App::theme)
        .window_size(iced::Size::new(1280.0, 820.0))
        .run_with(App::new)
}

fn init_logging() {
    use simplelog::{
        ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
        WriteLogger,
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    let log_path = friends_map_core::get_config_root().join(LOG_FILE_NAME);
    let log_file = log_path
        .parent()
        .map(std::fs::create_dir_all)
        .transpose()
        .and_then(|_| std::fs::File::create(&log_path));
    match log_file {
        Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Debug, Config::default(), file)),
        Err(e) => eprintln!("Could not open log file {}: {}", log_path.display(), e),
    }

    let _ = CombinedLogger::init(loggers);
    log::info!("[GUI] Logging to {}", log_path.display());
}

fn search_input_id() -> text_input::Id {
    text_input::Id::new("friend-search")
}

#[derive(Debug, Clone)]
pub enum Message {
    FriendsLoaded(Result<FriendStore, String>),
    RetryLoad,
    SearchChanged(String),
    SearchSettled(Ticket),
    ClearSearch,
    FocusSearch,
    RegionSelected(RegionOption),
    ToggleMap,
    SelectMap(MapKind),
    SelectFriend(String),
    ClearSelection,
    HoverFriend(Option<String>),
    MapMoved {
        kind: MapKind,
        center: (f64, f64),
        zoom: f64,
    },
    ToggleSettings,
    SetTheme(theme::Theme),
    SetAutoSave(bool),
    ResetRequested,
    ResetConfirmed(bool),
    PollStorage,
    DismissFault,
    Reload,
}

/// Region choice as shown in the picker.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionOption(RegionSelector);

impl fmt::Display for RegionOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            RegionSelector::All => write!(f, "All regions"),
            RegionSelector::Province(province) => write!(f, "{}", province),
        }
    }
}

enum Screen {
    Loading,
    LoadFailed(String),
    Ready(AppState),
}

struct App {
    screen: Screen,
    settings: Settings,
    storage_path: Option<PathBuf>,
    document: ThemeDocument,
    navigator: MapNavigator<MapCamera>,
    tiles: TileManager,
    search_input: String,
    search: Debouncer<String>,
    hovered: Option<String>,
    show_settings: bool,
    status: Option<String>,
    fault: Option<String>,
}

impl App {
    fn new() -> (Self, Task<Message>) {
        let storage = FileStorage::in_config_root();
        let path = storage.path().to_path_buf();
        log::info!("[GUI] Settings stored in {}", path.display());
        Self::with_storage(Arc::new(storage), Some(path))
    }

    fn with_storage(
        storage: Arc<dyn KeyValueStorage>,
        storage_path: Option<PathBuf>,
    ) -> (Self, Task<Message>) {
        let settings = Settings::open(storage);
        let app = Self {
            screen: Screen::Loading,
            document: ThemeDocument::new(settings.theme()),
            navigator: MapNavigator::new(settings.preferences().map_type),
            settings,
            storage_path,
            tiles: TileManager::new(),
            search_input: String::new(),
            search: Debouncer::default(),
            hovered: None,
            show_settings: false,
            status: None,
            fault: None,
        };
        (app, load_task())
    }

    fn theme(&self) -> iced::Theme {
        Palette::from_document(&self.document).iced_theme(self.settings.theme())
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            keyboard::on_key_press(hotkey),
            iced::time::every(STORAGE_POLL_INTERVAL).map(|_| Message::PollStorage),
        ])
    }

    /// Update is a fault boundary: a panic is logged and replaced by the fallback screen.
    fn update(&mut self, message: Message) -> Task<Message> {
        if self.fault.is_some() && !matches!(message, Message::DismissFault | Message::Reload) {
            return Task::none();
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.handle(message))) {
            Ok(task) => task,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                log::error!("[GUI] Fault while handling an update: {}", reason);
                self.fault = Some(reason);
                Task::none()
            }
        }
    }

    fn handle(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::FriendsLoaded(Ok(store)) => {
                log::info!("[GUI] Loaded {} friends", store.len());
                let map = self.settings.preferences().map_type;
                self.navigator = MapNavigator::new(map);
                for kind in MapKind::ALL {
                    let mut camera = MapCamera::new(kind);
                    camera.ready = true;
                    self.navigator.attach(kind, camera);
                }
                self.screen = Screen::Ready(AppState::new(store, map));
                Task::none()
            }
            Message::FriendsLoaded(Err(e)) => {
                log::error!("[GUI] Failed to load friends: {}", e);
                self.screen = Screen::LoadFailed(e);
                Task::none()
            }
            Message::RetryLoad => {
                self.screen = Screen::Loading;
                load_task()
            }
            Message::SearchChanged(query) => {
                self.search_input = query.clone();
                let ticket = self.search.schedule(query);
                let delay = self.search.delay();
                Task::perform(
                    async move {
                        tokio::time::sleep(delay).await;
                        ticket
                    },
                    Message::SearchSettled,
                )
            }
            Message::SearchSettled(ticket) => match self.search.fire(ticket) {
                Some(query) => self.dispatch(Action::SetSearch(query)),
                None => Task::none(),
            },
            Message::ClearSearch => {
                self.search.cancel();
                self.search_input.clear();
                self.dispatch(Action::ClearSearch)
            }
            Message::FocusSearch => text_input::focus(search_input_id()),
            Message::RegionSelected(RegionOption(region)) => {
                self.dispatch(Action::SelectRegion(region))
            }
            Message::ToggleMap => self.dispatch(Action::ToggleMap),
            Message::SelectMap(kind) => self.dispatch(Action::SetActiveMap(kind)),
            Message::SelectFriend(id) => self.dispatch(Action::SelectFriend(id)),
            Message::ClearSelection => {
                self.status = None;
                self.dispatch(Action::ClearSelection)
            }
            Message::HoverFriend(id) => {
                self.hovered = id;
                Task::none()
            }
            Message::MapMoved { kind, center, zoom } => {
                if let Some(camera) = self.navigator.view_mut(kind) {
                    camera.center = center;
                    camera.zoom = zoom;
                }
                Task::none()
            }
            Message::ToggleSettings => {
                self.show_settings = !self.show_settings;
                Task::none()
            }
            Message::SetTheme(scheme) => {
                self.settings.set_theme(scheme);
                self.apply_theme();
                Task::none()
            }
            Message::SetAutoSave(enabled) => {
                self.settings
                    .update_preference(PreferenceUpdate::AutoSave(enabled));
                if let Screen::Ready(state) = &self.screen {
                    let map = state.active_map();
                    self.settings.remember_map(map);
                }
                Task::none()
            }
            Message::ResetRequested => Task::perform(confirm_reset(), Message::ResetConfirmed),
            Message::ResetConfirmed(confirmed) => {
                match preferences::reset_all(self.settings.storage().as_ref(), confirmed) {
                    Ok(true) => {
                        self.reinitialize();
                        self.status = Some("All settings were reset".to_string());
                        return load_task();
                    }
                    Ok(false) => {}
                    Err(e) => {
                        log::error!("[GUI] Reset failed: {}", e);
                        self.status = Some(format!("Reset failed: {}", e));
                    }
                }
                Task::none()
            }
            Message::PollStorage => {
                if self.settings.sync() {
                    log::debug!("[GUI] Settings changed by another instance");
                    self.apply_theme();
                }
                Task::none()
            }
            Message::DismissFault => {
                self.fault = None;
                Task::none()
            }
            Message::Reload => {
                log::info!("[GUI] Reloading after fault");
                self.fault = None;
                self.reinitialize();
                load_task()
            }
        }
    }

    fn dispatch(&mut self, action: Action) -> Task<Message> {
        let Screen::Ready(state) = &mut self.screen else {
            return Task::none();
        };
        if let Some(effect) = state.apply(action) {
            self.handle_effect(effect);
        }
        Task::none()
    }

    fn handle_effect(&mut self, effect: Effect) {
        match effect {
            Effect::MapChanged(kind) => {
                self.navigator.set_active(kind);
                self.settings.remember_map(kind);
                self.hovered = None;
            }
            Effect::FlyTo(friend) => {
                self.status = match self.navigator.fly_to_friend(&friend) {
                    NavigationOutcome::Dispatched => None,
                    NavigationOutcome::MissingCoordinates => {
                        Some(format!("{} has no location to show", friend.name))
                    }
                    NavigationOutcome::MapNotReady => Some("The map is still loading".to_string()),
                };
            }
        }
    }

    fn apply_theme(&mut self) {
        theme::apply_theme(&mut self.document, self.settings.theme());
    }

    /// Rebuilds everything derived from persisted settings. The friend list is reloaded by the caller.
    fn reinitialize(&mut self) {
        let storage = Arc::clone(self.settings.storage());
        self.settings = Settings::open(storage);
        self.apply_theme();
        self.navigator = MapNavigator::new(self.settings.preferences().map_type);
        self.screen = Screen::Loading;
        self.search.cancel();
        self.search_input.clear();
        self.hovered = None;
        self.status = None;
    }

    fn view(&self) -> Element<'_, Message> {
        let p = Palette::from_document(&self.document);

        if let Some(reason) = &self.fault {
            return self.view_fault(p, reason);
        }

        let content: Element<'_, Message> = match &self.screen {
            Screen::Loading => {
                container(text("Loading friends...").size(16).color(p.text_secondary))
                    .center_x(Length::Fill)
                    .center_y(Length::Fill)
                    .into()
            }
            Screen::LoadFailed(error) => container(
                column![
                    text("Could not load the friend list").size(20),
                    text(error.as_str()).size(13).color(p.text_secondary),
                    button(text("Retry"))
                        .on_press(Message::RetryLoad)
                        .style(style::button_primary(p))
                        .padding([6, 16]),
                ]
                .spacing(12)
                .align_x(iced::Alignment::Center),
            )
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into(),
            Screen::Ready(state) => row![
                self.view_sidebar(p, state),
                self.view_map(p, state),
            ]
            .height(Length::Fill)
            .into(),
        };

        column![self.view_header(p), content]
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn view_header(&self, p: Palette) -> Element<'_, Message> {
        let active = match &self.screen {
            Screen::Ready(state) => Some(state.active_map()),
            _ => None,
        };

        let map_buttons = MapKind::ALL.iter().fold(row![].spacing(8), |r, &kind| {
            let btn = button(text(kind.label()).size(13)).padding([6, 14]);
            let mut btn = if active == Some(kind) {
                btn.style(style::button_primary(p))
            } else {
                btn.style(style::button_secondary(p))
            };
            if active.is_some() {
                btn = btn.on_press(Message::SelectMap(kind));
            }
            r.push(btn)
        });

        let settings_label = if self.show_settings {
            "Close settings"
        } else {
            "Settings"
        };

        container(
            row![
                text("Friends Map").size(22),
                horizontal_space(),
                map_buttons,
                button(text(settings_label).size(13))
                    .on_press(Message::ToggleSettings)
                    .style(style::button_secondary(p))
                    .padding([6, 14]),
            ]
            .spacing(16)
            .align_y(iced::Alignment::Center),
        )
        .padding([12, 20])
        .width(Length::Fill)
        .style(style::container_header(p))
        .into()
    }

    fn view_sidebar<'a>(&'a self, p: Palette, state: &'a AppState) -> Element<'a, Message> {
        let body = if self.show_settings {
            self.view_settings(p)
        } else {
            self.view_friend_list(p, state)
        };

        let mut sidebar = column![body].spacing(12).height(Length::Fill);
        if let Some(status) = &self.status {
            sidebar = sidebar.push(text(status.as_str()).size(12).color(style::DANGER));
        }

        container(sidebar)
            .width(Length::Fixed(340.0))
            .height(Length::Fill)
            .padding(16)
            .style(style::container_sidebar(p))
            .into()
    }

    fn view_friend_list<'a>(&'a self, p: Palette, state: &'a AppState) -> Element<'a, Message> {
        let search = text_input("Search name, city or address...", &self.search_input)
            .id(search_input_id())
            .on_input(Message::SearchChanged)
            .padding(8)
            .size(14)
            .style(style::search_input(p));

        let options: Vec<RegionOption> = std::iter::once(RegionSelector::All)
            .chain(
                state
                    .regions()
                    .iter()
                    .map(|r| RegionSelector::Province(r.clone())),
            )
            .map(RegionOption)
            .collect();
        let selected = RegionOption(state.criteria().selected_region.clone());
        let region_picker = pick_list(options, Some(selected), Message::RegionSelected)
            .width(Length::Fill)
            .padding(8);

        let stats = state.stats();
        let summary = text(format!(
            "Showing {} of {} friends in {} regions",
            stats.filtered_count, stats.total_count, stats.region_count
        ))
        .size(12)
        .color(p.text_secondary);

        let selected_id = state.selected_friend().map(|f| f.id.as_str());
        let list: Element<'a, Message> = if state.filtered().is_empty() {
            text("No friends match the current filter")
                .size(13)
                .color(p.text_secondary)
                .into()
        } else {
            let rows = state.filtered().iter().map(|friend| {
                friend_row(p, friend, selected_id == Some(friend.id.as_str()))
            });
            scrollable(Column::with_children(rows).spacing(6))
                .height(Length::Fill)
                .into()
        };

        column![search, region_picker, summary, list]
            .spacing(12)
            .height(Length::Fill)
            .into()
    }

    fn view_settings(&self, p: Palette) -> Element<'_, Message> {
        let prefs = self.settings.preferences();
        let current = self.settings.theme();

        let theme_buttons = theme::Theme::ALL.iter().fold(row![].spacing(8), |r, &scheme| {
            let btn = button(text(scheme.as_str()).size(13))
                .on_press(Message::SetTheme(scheme))
                .padding([6, 14]);
            r.push(if scheme == current {
                btn.style(style::button_primary(p))
            } else {
                btn.style(style::button_secondary(p))
            })
        });

        let location = self
            .storage_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "in memory".to_string());

        column![
            text("Settings").size(18),
            text("Theme").size(13).color(p.text_secondary),
            theme_buttons,
            checkbox("Remember the last map I used", prefs.auto_save)
                .on_toggle(Message::SetAutoSave)
                .size(16),
            text(format!("Language: {}", prefs.language)).size(13),
            text(format!("Default map: {}", prefs.map_type.label())).size(13),
            text(format!("Stored preferences: {} bytes", self.settings.footprint_bytes()))
                .size(12)
                .color(p.text_secondary),
            text(location).size(11).color(p.text_secondary),
            button(text("Reset all settings").size(13))
                .on_press(Message::ResetRequested)
                .style(style::button_danger(p))
                .padding([6, 14]),
        ]
        .spacing(12)
        .into()
    }

    fn view_map<'a>(&'a self, p: Palette, state: &'a AppState) -> Element<'a, Message> {
        let kind = state.active_map();
        let markers: Vec<&Friend> = state.markers().collect();
        let legend = container(
            text(format!("{} · {} friends", kind.label(), markers.len())).size(13),
        )
        .padding([6, 12])
        .style(style::container_card(p));

        let map: Element<'a, Message> = FriendMapView {
            kind,
            friends: markers,
            selected: state.selected_friend().map(|f| f.id.as_str()),
            hovered: self.hovered.as_deref(),
            tile_manager: &self.tiles,
            camera: self
                .navigator
                .view(kind)
                .copied()
                .unwrap_or_else(|| MapCamera::new(kind)),
            palette: p,
        }
        .into();

        let mut overlay = column![legend].spacing(12).padding(16);
        if let Some(friend) = state.selected_friend() {
            overlay = overlay.push(friend_card(p, friend));
        }

        stack![map, overlay]
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn view_fault(&self, p: Palette, reason: &str) -> Element<'_, Message> {
        container(
            column![
                text("Something went wrong").size(22),
                text(reason.to_string()).size(13).color(p.text_secondary),
                row![
                    button(text("Retry"))
                        .on_press(Message::DismissFault)
                        .style(style::button_primary(p))
                        .padding([6, 16]),
                    button(text("Reload"))
                        .on_press(Message::Reload)
                        .style(style::button_secondary(p))
                        .padding([6, 16]),
                ]
                .spacing(12),
            ]
            .spacing(14)
            .align_x(iced::Alignment::Center),
        )
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
    }
}

fn friend_row(p: Palette, friend: &Friend, selected: bool) -> Element<'_, Message> {
    button(
        column![
            text(friend.name.as_str()).size(14),
            text(friend.location_label()).size(12).color(p.text_secondary),
        ]
        .spacing(2),
    )
    .on_press(Message::SelectFriend(friend.id.clone()))
    .style(style::button_friend_row(p, selected))
    .width(Length::Fill)
    .padding([8, 12])
    .into()
}

fn friend_card(p: Palette, friend: &Friend) -> Element<'_, Message> {
    let mut details = column![
        text(friend.name.as_str()).size(18),
        text(friend.location_label()).size(13).color(p.text_secondary),
    ]
    .spacing(6);

    if let Some(address) = &friend.address {
        details = details.push(text(address.as_str()).size(13));
    }
    if let Some(description) = &friend.description {
        details = details.push(text(description.as_str()).size(13));
    }
    if friend.has_coordinates() {
        details = details.push(
            text(format!("{:.4}, {:.4}", friend.latitude, friend.longitude))
                .size(11)
                .color(p.text_secondary),
        );
    }

    container(
        details.push(
            button(text("Close").size(12))
                .on_press(Message::ClearSelection)
                .style(style::button_secondary(p))
                .padding([4, 12]),
        ),
    )
    .padding(14)
    .width(Length::Fixed(300.0))
    .style(style::container_card(p))
    .into()
}

fn hotkey(key: keyboard::Key, modifiers: keyboard::Modifiers) -> Option<Message> {
    use keyboard::key::Named;

    match key.as_ref() {
        keyboard::Key::Named(Named::Escape) => Some(Message::ClearSearch),
        keyboard::Key::Character(c) if modifiers.command() => {
            if c.eq_ignore_ascii_case("m") {
                Some(Message::ToggleMap)
            } else if c.eq_ignore_ascii_case("f") {
                Some(Message::FocusSearch)
            } else if c == "," {
                Some(Message::ToggleSettings)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn load_task() -> Task<Message> {
    let source = std::env::var_os(DATA_ENV).map(PathBuf::from);
    Task::perform(load_friends(source), Message::FriendsLoaded)
}

async fn load_friends(source: Option<PathBuf>) -> Result<FriendStore, String> {
    match source {
        Some(path) => FriendStore::load(&path).map_err(|e| format!("{:#}", e)),
        None => FriendStore::bundled().map_err(|e| e.to_string()),
    }
}

async fn confirm_reset() -> bool {
    let answer = rfd::AsyncMessageDialog::new()
        .set_title("Reset all settings")
        .set_description(
            "This clears every saved preference, including the theme and default map. Continue?",
        )
        .set_level(rfd::MessageLevel::Warning)
        .set_buttons(rfd::MessageButtons::YesNo)
        .show()
        .await;
    answer == rfd::MessageDialogResult::Yes
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unexpected fault".to_string())
}
