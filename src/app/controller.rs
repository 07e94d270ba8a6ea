use std::fmt::Debug;
use std::time::{Duration, Instant};

use crate::app::actions::Action;
use crate::app::state::{AppState, ListedLocation, LocationDialog, OverlayState, ShareOverlay, TextInput};
use crate::config::{AppConfig, Palette};
use crate::error::{Failure, ValidationError};
use crate::geo;
use crate::map::{MapAdapter, USER_ZOOM};
use crate::search::{format_filter_input, parse_filter_input, FilterSpec, QueryParams, SortField, SortSpec};
use crate::session::SessionStore;
use crate::stats::build_pie;
use crate::storage::{Location, LocationDraft, StorageHandle};

const CANNOT_LOAD_LOCS: &str = "Cannot load locations";
const CANNOT_LOAD_STATS: &str = "Cannot load stats";
const CANNOT_ADD: &str = "Cannot add location";
const CANNOT_UPDATE: &str = "Cannot update location";
const CANNOT_REMOVE: &str = "Cannot remove location";
const CANNOT_DISPLAY: &str = "Cannot display this location";

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub palette: Palette,
    pub flash_duration: Duration,
    pub share_base_url: String,
    pub focus_zoom: u8,
    pub default_sort: SortSpec,
}

impl ControllerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            palette: config.palette(),
            flash_duration: config.flash_duration(),
            share_base_url: config.share.base_url.clone(),
            focus_zoom: config.map.focus_zoom,
            default_sort: config.default_sort,
        }
    }
}

/// Owns the view state and runs every action against the store and the map.
pub struct LocController<M: MapAdapter> {
    storage: StorageHandle,
    map: M,
    state: AppState,
    session: Option<SessionStore>,
    settings: ControllerSettings,
}

impl<M: MapAdapter> LocController<M> {
    pub fn new(storage: StorageHandle, map: M, settings: ControllerSettings) -> Self {
        Self {
            storage,
            map,
            state: AppState::default(),
            session: None,
            settings,
        }
    }

    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn storage(&self) -> &StorageHandle {
        &self.storage
    }

    pub fn copied_link(&self) -> Option<&str> {
        self.state.copied_link.as_deref()
    }

    /// Applies the startup query string, initialises the map and renders the first view.
    pub fn init(&mut self, query: QueryParams) {
        self.storage.set_sort_by(self.settings.default_sort);
        let filter = self.storage.set_filter_by(query.filter());
        self.state.query = query;
        self.state.query.set_filter(&filter);

        match self.map.init_map() {
            Ok(()) => {
                self.map
                    .add_click_listener(Box::new(Action::OpenAddDialog));
            }
            Err(err) => self.fail(Failure::MapInit, &err),
        }
        self.load_and_render_locs();
    }

    pub fn on_tick(&mut self, now: Instant) {
        self.state.expire_flash(now, self.settings.flash_duration);
    }

    pub fn dispatch(&mut self, action: Action) {
        tracing::debug!(?action, "dispatch");
        match action {
            Action::Quit => self.state.should_quit = true,
            Action::Refresh => self.load_and_render_locs(),
            Action::CursorNext => self.state.move_cursor(1),
            Action::CursorPrevious => self.state.move_cursor(-1),
            Action::SelectLoc(id) => self.select_loc(&id),
            Action::OpenAddDialog(geo) => {
                self.state.overlay = Some(OverlayState::AddLocation(LocationDialog::for_new(geo)));
            }
            Action::AddAtCenter => {
                let center = self.map.camera().center;
                let geo = self.map.describe_point(center);
                self.dispatch(Action::OpenAddDialog(geo));
            }
            Action::OpenUpdateDialog(id) => self.open_update_dialog(&id),
            Action::ConfirmDialog => self.confirm_dialog(),
            Action::CloseDialog => self.state.close_overlay(),
            Action::RemoveLoc(id) => self.remove_loc(&id),
            Action::PanToUserPos => self.pan_to_user_pos(),
            Action::OpenAddressSearch => {
                self.state.overlay = Some(OverlayState::AddressSearch(TextInput::default()));
            }
            Action::SearchAddress(text) => self.search_address(&text),
            Action::OpenFilter => {
                let current = format_filter_input(&self.storage.filter());
                self.state.overlay = Some(OverlayState::Filter(TextInput::new(current)));
            }
            Action::SetFilterBy(filter) => self.set_filter_by(filter),
            Action::CycleSort => {
                let mut sort = self.storage.sort();
                sort.field = SortField::cycle(sort.field);
                self.dispatch(Action::SetSortBy(sort));
            }
            Action::ToggleSortDirection => {
                let mut sort = self.storage.sort();
                sort.direction = sort.direction.toggled();
                self.dispatch(Action::SetSortBy(sort));
            }
            Action::SetSortBy(sort) => {
                self.storage.set_sort_by(sort);
                self.load_and_render_locs();
            }
            Action::CopyLink => self.copy_link(),
            Action::ShareLoc => {
                let url = self.share_link();
                self.state.overlay = Some(OverlayState::Share(ShareOverlay::new(url)));
            }
            Action::ZoomIn => self.map.zoom_by(1),
            Action::ZoomOut => self.map.zoom_by(-1),
        }
    }

    /// Reloads the list with fresh distances, the detail panel and both pies.
    pub fn load_and_render_locs(&mut self) {
        let position = match self.map.get_user_position() {
            Ok(position) => position,
            Err(err) => return self.fail(Failure::PositionUnavailable, &err),
        };
        let locs = match self.storage.query() {
            Ok(locs) => locs,
            Err(err) => return self.fail(Failure::StoreRead(CANNOT_LOAD_LOCS), &err),
        };

        self.state.user_pos = Some(position);
        self.state.sort = self.storage.sort();
        self.state.filter = self.storage.filter();
        self.state.locs = locs
            .into_iter()
            .map(|loc| {
                let distance_km = geo::distance_km(position, loc.geo.lat_lng());
                ListedLocation { loc, distance_km }
            })
            .collect();
        self.state.clamp_cursor();

        let selected = self.state.selected_id().and_then(|id| {
            self.state
                .locs
                .iter()
                .find(|listed| listed.loc.id == id)
                .map(|listed| listed.loc.clone())
        });
        match selected {
            Some(loc) => self.display_loc(loc),
            None => {
                self.state.detail = None;
                self.state.detail_link = None;
            }
        }

        self.render_stats();
    }

    fn render_stats(&mut self) {
        let counts = self
            .storage
            .loc_count_by_rate_map()
            .and_then(|by_rate| Ok((by_rate, self.storage.loc_count_by_update_map()?)));
        match counts {
            Ok((by_rate, by_update)) => {
                self.state.rate_pie = Some(build_pie("By rate", &by_rate, &self.settings.palette));
                self.state.update_pie =
                    Some(build_pie("Last updated", &by_update, &self.settings.palette));
            }
            Err(err) => self.fail(Failure::StoreRead(CANNOT_LOAD_STATS), &err),
        }
    }

    fn display_loc(&mut self, loc: Location) {
        self.map.pan_to(loc.geo.lat_lng(), Some(self.settings.focus_zoom));
        self.map.set_marker(Some(&loc));
        self.state.query.set_loc_id(Some(&loc.id));
        self.state.focus_cursor_on(&loc.id);
        self.state.detail_link = Some(self.share_link());
        self.state.detail = Some(loc);
    }

    fn hide_loc(&mut self) {
        self.state.detail = None;
        self.state.detail_link = None;
        self.state.query.set_loc_id(None);
        self.map.set_marker(None);
        self.persist_query();
    }

    fn select_loc(&mut self, id: &str) {
        match self.storage.get_by_id(id) {
            Ok(loc) => {
                self.display_loc(loc);
                self.persist_query();
            }
            Err(err) => self.fail(Failure::StoreRead(CANNOT_DISPLAY), &err),
        }
    }

    fn open_update_dialog(&mut self, id: &str) {
        match self.storage.get_by_id(id) {
            Ok(loc) => {
                self.state.overlay =
                    Some(OverlayState::UpdateLocation(LocationDialog::for_existing(&loc)));
            }
            Err(err) => self.fail(Failure::StoreRead(CANNOT_UPDATE), &err),
        }
    }

    fn confirm_dialog(&mut self) {
        let Some(overlay) = self.state.overlay.clone() else {
            return;
        };
        match overlay {
            OverlayState::AddLocation(dialog) => self.confirm_add(&dialog),
            OverlayState::UpdateLocation(dialog) => self.confirm_update(&dialog),
            OverlayState::Filter(input) => {
                self.dispatch(Action::SetFilterBy(parse_filter_input(input.as_str())));
            }
            OverlayState::AddressSearch(input) => {
                self.state.close_overlay();
                self.dispatch(Action::SearchAddress(input.as_str().to_string()));
            }
            OverlayState::Share(_) => self.state.close_overlay(),
        }
    }

    /// Validation failures stay inside the open dialog instead of flashing.
    fn reject_dialog(&mut self, err: ValidationError) {
        let failure = Failure::Validation(err);
        tracing::debug!(kind = failure.kind(), "dialog input rejected: {failure}");
        if let Some(dialog) = self.state.dialog_mut() {
            dialog.error = Some(failure.to_string());
        }
    }

    fn confirm_add(&mut self, dialog: &LocationDialog) {
        let (name, rate) = match dialog.validate() {
            Ok(fields) => fields,
            Err(err) => return self.reject_dialog(err),
        };
        self.state.close_overlay();
        match self.storage.save(LocationDraft::new(name, rate, dialog.geo.clone())) {
            Ok(loc) => {
                tracing::info!(id = %loc.id, "location added");
                self.flash(format!("Added Location (id: {})", loc.id));
                self.state.query.set_loc_id(Some(&loc.id));
                self.persist_query();
                self.load_and_render_locs();
            }
            Err(err) => self.fail(Failure::StoreWrite(CANNOT_ADD), &err),
        }
    }

    fn confirm_update(&mut self, dialog: &LocationDialog) {
        let (name, rate) = match dialog.validate() {
            Ok(fields) => fields,
            Err(err) => return self.reject_dialog(err),
        };
        self.state.close_overlay();
        let Some(id) = dialog.loc_id.as_deref() else {
            return;
        };
        let saved = self.storage.get_by_id(id).and_then(|loc| {
            let mut draft = LocationDraft::from(&loc);
            draft.name = name;
            draft.rate = rate;
            self.storage.save(draft)
        });
        match saved {
            Ok(loc) => {
                self.flash(format!("Location updated: {}, Rate: {}", loc.name, loc.rate));
                self.load_and_render_locs();
            }
            Err(err) => self.fail(Failure::StoreWrite(CANNOT_UPDATE), &err),
        }
    }

    fn remove_loc(&mut self, id: &str) {
        match self.storage.remove(id) {
            Ok(()) => {
                tracing::info!(%id, "location removed");
                self.flash("Location removed");
                self.hide_loc();
                self.load_and_render_locs();
            }
            Err(err) => self.fail(Failure::StoreWrite(CANNOT_REMOVE), &err),
        }
    }

    fn pan_to_user_pos(&mut self) {
        match self.map.refresh_user_position() {
            Ok(pos) => {
                self.map.pan_to(pos, Some(USER_ZOOM));
                self.hide_loc();
                self.load_and_render_locs();
                self.flash(format!("You are at Latitude: {} Longitude: {}", pos.lat, pos.lng));
            }
            Err(err) => self.fail(Failure::PositionUnavailable, &err),
        }
    }

    fn search_address(&mut self, text: &str) {
        match self.map.lookup_address_geo(text) {
            Ok(geo) => {
                tracing::info!(address = %geo.address, "address found");
                self.map.pan_to(geo.lat_lng(), Some(self.settings.focus_zoom));
            }
            Err(err) => self.fail(Failure::Geocode, &err),
        }
    }

    fn set_filter_by(&mut self, filter: FilterSpec) {
        self.state.close_overlay();
        let normalized = self.storage.set_filter_by(filter);
        self.state.query.set_filter(&normalized);
        self.persist_query();
        self.load_and_render_locs();
    }

    pub fn share_link(&self) -> String {
        self.state.query.share_link(&self.settings.share_base_url)
    }

    fn copy_link(&mut self) {
        let link = self.share_link();
        tracing::info!(%link, "share link copied");
        self.state.copied_link = Some(link);
        self.flash("Link copied, ready to paste");
    }

    fn persist_query(&self) {
        if let Some(session) = &self.session {
            if let Err(err) = session.save(&self.state.query) {
                tracing::error!(?err, "failed to persist session");
            }
        }
    }

    fn flash(&mut self, message: impl Into<String>) {
        self.state.set_flash(message, Instant::now());
    }

    fn fail(&mut self, failure: Failure, err: &dyn Debug) {
        tracing::error!(?err, kind = failure.kind(), "{failure}");
        self.flash(failure.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::themes::{ThemeName, ThemeRegistry};
    use crate::error::MapError;
    use crate::geo::{Geo, LatLng};
    use crate::map::{Camera, ClickListener, MapMarker};
    use crate::search::SortDirection;
    use crate::storage::tests::init_storage;
    use ratatui::layout::Rect;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeMap {
        position: Option<LatLng>,
        geocoded: Option<Geo>,
        fail_init: bool,
        camera: Option<Camera>,
        marker: Option<MapMarker>,
        listener: Option<ClickListener>,
        pans: Vec<(LatLng, Option<u8>)>,
    }

    impl FakeMap {
        fn at(lat: f64, lng: f64) -> Self {
            Self {
                position: Some(LatLng::new(lat, lng)),
                ..Self::default()
            }
        }
    }

    impl MapAdapter for FakeMap {
        fn init_map(&mut self) -> Result<(), MapError> {
            if self.fail_init {
                return Err(MapError::InitFailed("no canvas".into()));
            }
            Ok(())
        }

        fn add_click_listener(&mut self, listener: ClickListener) {
            self.listener = Some(listener);
        }

        fn get_user_position(&mut self) -> Result<LatLng, MapError> {
            self.position
                .ok_or_else(|| MapError::PositionUnavailable("denied".into()))
        }

        fn lookup_address_geo(&mut self, address: &str) -> Result<Geo, MapError> {
            self.geocoded
                .clone()
                .ok_or_else(|| MapError::NoMatch(address.to_string()))
        }

        fn pan_to(&mut self, target: LatLng, zoom: Option<u8>) {
            self.pans.push((target, zoom));
            let zoom = zoom.unwrap_or_else(|| self.camera().zoom);
            self.camera = Some(Camera::new(target, zoom));
        }

        fn set_marker(&mut self, loc: Option<&Location>) {
            self.marker = loc.map(|loc| MapMarker {
                label: loc.name.clone(),
                point: loc.geo.lat_lng(),
            });
        }

        fn camera(&self) -> Camera {
            self.camera
                .unwrap_or_else(|| Camera::new(LatLng::new(0.0, 0.0), 3))
        }

        fn marker(&self) -> Option<&MapMarker> {
            self.marker.as_ref()
        }

        fn set_viewport(&mut self, _area: Rect) {}

        fn click(&mut self, _column: u16, _row: u16) -> Option<Action> {
            let geo = Geo::new(1.5, 2.5, "Clicked St");
            self.listener.as_ref().map(|listener| listener(geo))
        }
    }

    fn settings() -> ControllerSettings {
        ControllerSettings {
            palette: ThemeRegistry::default().palette(&ThemeName::Dark),
            flash_duration: Duration::from_millis(3000),
            share_base_url: "loctui://open".into(),
            focus_zoom: 12,
            default_sort: SortSpec::default(),
        }
    }

    fn controller(map: FakeMap) -> (TempDir, LocController<FakeMap>) {
        let (temp, storage) = init_storage().expect("storage");
        (temp, LocController::new(storage, map, settings()))
    }

    fn seed(ctrl: &LocController<FakeMap>, name: &str, rate: i64, lat: f64, lng: f64) -> Location {
        ctrl.storage()
            .save(LocationDraft::new(name, rate, Geo::new(lat, lng, format!("{name} st"))))
            .expect("seed")
    }

    fn add_via_dialog(ctrl: &mut LocController<FakeMap>, name: &str, rate: &str) {
        ctrl.dispatch(Action::OpenAddDialog(Geo::new(32.1, 34.8, "Dizengoff")));
        let dialog = ctrl.state_mut().dialog_mut().expect("dialog open");
        dialog.name = TextInput::new(name);
        dialog.rate = TextInput::new(rate);
        ctrl.dispatch(Action::ConfirmDialog);
    }

    fn listed_names(ctrl: &LocController<FakeMap>) -> Vec<String> {
        ctrl.state().locs.iter().map(|listed| listed.loc.name.clone()).collect()
    }

    #[test]
    fn add_then_query_yields_new_record() {
        let (_temp, mut ctrl) = controller(FakeMap::at(32.0, 34.0));
        ctrl.init(QueryParams::default());
        add_via_dialog(&mut ctrl, "Beach", "4");

        let state = ctrl.state();
        assert!(state.overlay().is_none());
        assert_eq!(state.locs.len(), 1);
        let added = &state.locs[0].loc;
        assert_eq!(added.name, "Beach");
        assert_eq!(added.rate, 4);
        assert_eq!(added.geo.address, "Dizengoff");
        assert_eq!(state.selected_id(), Some(added.id.as_str()));
        assert_eq!(state.detail.as_ref().map(|loc| loc.id.as_str()), Some(added.id.as_str()));
        assert_eq!(
            state.flash_message(),
            Some(format!("Added Location (id: {})", added.id).as_str())
        );
        assert_eq!(ctrl.map().marker().map(|m| m.label.as_str()), Some("Beach"));
    }

    #[test]
    fn invalid_dialog_input_stays_inline_without_store_call() {
        let (_temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        ctrl.init(QueryParams::default());
        add_via_dialog(&mut ctrl, "  ", "3");
        let Some(OverlayState::AddLocation(dialog)) = ctrl.state().overlay() else {
            panic!("dialog should stay open");
        };
        assert_eq!(dialog.error.as_deref(), Some("Please fill out all fields."));

        let dialog = ctrl.state_mut().dialog_mut().expect("dialog");
        dialog.name = TextInput::new("Pier");
        dialog.rate = TextInput::new("9");
        ctrl.dispatch(Action::ConfirmDialog);
        let Some(OverlayState::AddLocation(dialog)) = ctrl.state().overlay() else {
            panic!("dialog should stay open");
        };
        assert_eq!(dialog.error.as_deref(), Some("Rating must be between 1 and 5"));
        assert_eq!(ctrl.storage().count().expect("count"), 0);
    }

    #[test]
    fn remove_clears_active_detail_panel() {
        let (_temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        let doomed = seed(&ctrl, "Doomed", 2, 1.0, 1.0);
        seed(&ctrl, "Survivor", 3, 2.0, 2.0);
        ctrl.init(QueryParams::parse(&format!("locId={}", doomed.id)));
        assert!(ctrl.state().detail.is_some());

        ctrl.dispatch(Action::RemoveLoc(doomed.id.clone()));
        let state = ctrl.state();
        assert_eq!(listed_names(&ctrl), vec!["Survivor"]);
        assert!(state.detail.is_none());
        assert!(state.detail_link.is_none());
        assert_eq!(state.selected_id(), None);
        assert!(ctrl.map().marker().is_none());
        assert_eq!(state.flash_message(), Some("Location removed"));
    }

    #[test]
    fn remove_failure_flashes_and_keeps_state() {
        let (_temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        seed(&ctrl, "Stay", 2, 1.0, 1.0);
        ctrl.init(QueryParams::default());
        ctrl.dispatch(Action::RemoveLoc("missing".into()));
        assert_eq!(ctrl.state().flash_message(), Some("Cannot remove location"));
        assert_eq!(listed_names(&ctrl), vec!["Stay"]);
    }

    #[test]
    fn startup_loc_id_renders_single_active_item() {
        let (_temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        seed(&ctrl, "One", 3, 1.0, 1.0);
        let two = seed(&ctrl, "Two", 3, 5.0, 5.0);
        seed(&ctrl, "Three", 3, 9.0, 9.0);
        ctrl.init(QueryParams::parse(&format!("?locId={}", two.id)));

        let state = ctrl.state();
        let active: Vec<_> = state
            .locs
            .iter()
            .filter(|listed| state.is_active(&listed.loc))
            .map(|listed| listed.loc.name.as_str())
            .collect();
        assert_eq!(active, vec!["Two"]);
        assert_eq!(state.detail.as_ref().map(|loc| loc.name.as_str()), Some("Two"));
        let link = state.detail_link.as_deref().expect("detail link");
        assert!(link.starts_with("loctui://open"));
        assert!(link.contains(&format!("locId={}", two.id)));
        assert_eq!(state.cursor, 1);
        assert_eq!(ctrl.map().pans.last(), Some(&(LatLng::new(5.0, 5.0), Some(12))));
    }

    #[test]
    fn unknown_loc_id_shows_no_detail_panel() {
        let (_temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        seed(&ctrl, "One", 3, 1.0, 1.0);
        ctrl.init(QueryParams::parse("locId=nope"));
        assert!(ctrl.state().detail.is_none());
        assert_eq!(ctrl.state().locs.len(), 1);
    }

    #[test]
    fn distances_are_computed_from_user_position() {
        let (_temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        seed(&ctrl, "Here", 3, 0.0, 0.0);
        seed(&ctrl, "Degree east", 3, 0.0, 1.0);
        ctrl.init(QueryParams::default());
        let distances: Vec<_> = ctrl.state().locs.iter().map(|l| l.distance_km).collect();
        assert_eq!(distances[0], 0.0);
        assert!((distances[1] - 111.19).abs() < 0.01, "got {}", distances[1]);
        assert!(distances.iter().all(|d| *d >= 0.0));
    }

    #[test]
    fn position_failure_aborts_render() {
        let (_temp, mut ctrl) = controller(FakeMap::default());
        seed(&ctrl, "Unseen", 3, 0.0, 0.0);
        ctrl.init(QueryParams::default());
        assert!(ctrl.state().locs.is_empty());
        assert!(ctrl.state().rate_pie.is_none());
        assert_eq!(ctrl.state().flash_message(), Some("Cannot get your position"));
    }

    #[test]
    fn map_init_failure_flashes_but_still_loads() {
        let map = FakeMap {
            fail_init: true,
            ..FakeMap::at(0.0, 0.0)
        };
        let (_temp, mut ctrl) = controller(map);
        seed(&ctrl, "Listed", 3, 0.0, 0.0);
        ctrl.init(QueryParams::default());
        assert_eq!(ctrl.state().locs.len(), 1);
        assert!(ctrl.map().listener.is_none());
        assert_eq!(ctrl.state().flash_message(), Some("Cannot init map"));
    }

    #[test]
    fn map_click_opens_add_dialog() {
        let (_temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        ctrl.init(QueryParams::default());
        let action = ctrl.map_mut().click(3, 3).expect("listener registered");
        ctrl.dispatch(action);
        let Some(OverlayState::AddLocation(dialog)) = ctrl.state().overlay() else {
            panic!("add dialog expected");
        };
        assert_eq!(dialog.geo.address, "Clicked St");
    }

    #[test]
    fn update_dialog_prefills_and_saves() {
        let (_temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        let loc = seed(&ctrl, "Old name", 2, 0.0, 0.0);
        ctrl.init(QueryParams::default());
        ctrl.dispatch(Action::OpenUpdateDialog(loc.id.clone()));
        let dialog = ctrl.state_mut().dialog_mut().expect("dialog");
        assert_eq!(dialog.name.as_str(), "Old name");
        assert_eq!(dialog.rate.as_str(), "2");
        dialog.name = TextInput::new("New name");
        dialog.rate = TextInput::new("5");
        ctrl.dispatch(Action::ConfirmDialog);

        assert_eq!(ctrl.state().flash_message(), Some("Location updated: New name, Rate: 5"));
        let stored = ctrl.storage().get_by_id(&loc.id).expect("stored");
        assert_eq!((stored.name.as_str(), stored.rate), ("New name", 5));
        assert!(stored.was_updated());
        assert_eq!(ctrl.state().update_pie.as_ref().map(|pie| pie.slices[0].count), Some(1));
    }

    #[test]
    fn filter_is_normalized_and_echoed_into_query() {
        let (_temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        seed(&ctrl, "City Park", 4, 0.0, 0.0);
        seed(&ctrl, "Parking", 2, 0.0, 0.0);
        seed(&ctrl, "Museum", 5, 0.0, 0.0);
        ctrl.init(QueryParams::default());

        ctrl.dispatch(Action::SetFilterBy(FilterSpec {
            txt: " PARK ".into(),
            min_rate: 3,
        }));
        assert_eq!(listed_names(&ctrl), vec!["City Park"]);
        assert_eq!(ctrl.state().query.to_query_string(), "txt=PARK&minRate=3");
        assert_eq!(ctrl.state().filter, FilterSpec::new("PARK", 3));

        ctrl.dispatch(Action::SetFilterBy(FilterSpec::default()));
        assert_eq!(listed_names(&ctrl).len(), 3);
        assert!(ctrl.state().query.is_empty());
    }

    #[test]
    fn filter_overlay_parses_input() {
        let (_temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        seed(&ctrl, "Big park", 1, 0.0, 0.0);
        seed(&ctrl, "Small park", 4, 0.0, 0.0);
        ctrl.init(QueryParams::default());
        ctrl.dispatch(Action::OpenFilter);
        if let Some(OverlayState::Filter(input)) = ctrl.state_mut().overlay.as_mut() {
            *input = TextInput::new("park min:3");
        }
        ctrl.dispatch(Action::ConfirmDialog);
        assert!(ctrl.state().overlay().is_none());
        assert_eq!(listed_names(&ctrl), vec!["Small park"]);
    }

    #[test]
    fn sort_keys_cycle_field_and_direction() {
        let (_temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        seed(&ctrl, "b", 1, 0.0, 0.0);
        seed(&ctrl, "a", 5, 0.0, 0.0);
        ctrl.init(QueryParams::default());
        ctrl.dispatch(Action::CycleSort);
        assert_eq!(ctrl.state().sort.field, Some(SortField::Name));
        assert_eq!(listed_names(&ctrl), vec!["a", "b"]);
        ctrl.dispatch(Action::ToggleSortDirection);
        assert_eq!(ctrl.state().sort.direction, SortDirection::Descending);
        assert_eq!(listed_names(&ctrl), vec!["b", "a"]);
    }

    #[test]
    fn pan_to_user_position_hides_detail_and_flashes() {
        let (_temp, mut ctrl) = controller(FakeMap::at(32.5, 34.25));
        let loc = seed(&ctrl, "Shown", 3, 1.0, 1.0);
        ctrl.init(QueryParams::parse(&format!("locId={}", loc.id)));
        ctrl.dispatch(Action::PanToUserPos);
        assert!(ctrl.state().detail.is_none());
        assert_eq!(ctrl.map().camera().zoom, USER_ZOOM);
        assert_eq!(
            ctrl.state().flash_message(),
            Some("You are at Latitude: 32.5 Longitude: 34.25")
        );
    }

    #[test]
    fn address_search_pans_or_flashes() {
        let (_temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        ctrl.init(QueryParams::default());
        ctrl.dispatch(Action::SearchAddress("Atlantis".into()));
        assert_eq!(ctrl.state().flash_message(), Some("Cannot lookup address"));

        ctrl.map_mut().geocoded = Some(Geo::new(48.8566, 2.3522, "Paris"));
        ctrl.dispatch(Action::SearchAddress("Paris".into()));
        assert_eq!(ctrl.map().camera().center, LatLng::new(48.8566, 2.3522));
    }

    #[test]
    fn copy_and_share_use_the_query_string() {
        let (_temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        let loc = seed(&ctrl, "Linked", 3, 0.0, 0.0);
        ctrl.init(QueryParams::default());
        ctrl.dispatch(Action::SelectLoc(loc.id.clone()));
        ctrl.dispatch(Action::CopyLink);
        let expected = format!("loctui://open?locId={}", loc.id);
        assert_eq!(ctrl.copied_link(), Some(expected.as_str()));
        assert_eq!(ctrl.state().flash_message(), Some("Link copied, ready to paste"));

        ctrl.dispatch(Action::ShareLoc);
        let Some(OverlayState::Share(share)) = ctrl.state().overlay() else {
            panic!("share overlay expected");
        };
        assert_eq!(share.title, "Cool location");
        assert_eq!(share.text, "Check out this location");
        assert_eq!(share.url, expected);
    }

    #[test]
    fn select_unknown_location_flashes() {
        let (_temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        ctrl.init(QueryParams::default());
        ctrl.dispatch(Action::SelectLoc("ghost".into()));
        assert_eq!(ctrl.state().flash_message(), Some("Cannot display this location"));
        assert!(ctrl.state().detail.is_none());
    }

    #[test]
    fn empty_store_renders_zero_percent_pies() {
        let (_temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        ctrl.init(QueryParams::default());
        let pie = ctrl.state().rate_pie.as_ref().expect("rate pie");
        assert_eq!(pie.total, 0);
        assert_eq!(pie.slices.len(), 5);
        assert!(pie.slices.iter().all(|slice| slice.percent == 0));
    }

    #[test]
    fn selection_is_persisted_to_session() {
        let (temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        let session = SessionStore::new(temp.path().join("session.json"));
        let loc = seed(&ctrl, "Saved", 3, 0.0, 0.0);
        ctrl = ctrl.with_session(session.clone());
        ctrl.init(QueryParams::default());
        ctrl.dispatch(Action::SelectLoc(loc.id.clone()));
        let snapshot = session.load().expect("load").expect("snapshot");
        assert_eq!(snapshot.params().loc_id(), Some(loc.id.as_str()));
    }

    #[test]
    fn flash_expires_on_tick() {
        let (_temp, mut ctrl) = controller(FakeMap::at(0.0, 0.0));
        ctrl.init(QueryParams::default());
        ctrl.dispatch(Action::CopyLink);
        ctrl.on_tick(Instant::now() + Duration::from_secs(4));
        assert!(ctrl.state().flash_message().is_none());
    }
}
