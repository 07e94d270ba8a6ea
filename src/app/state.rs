use std::time::{Duration, Instant};

use unicode_segmentation::UnicodeSegmentation;

use crate::error::ValidationError;
use crate::geo::{Geo, LatLng};
use crate::search::{FilterSpec, QueryParams, SortSpec, MAX_RATE};
use crate::stats::PieView;
use crate::storage::Location;

const MAX_INPUT_LEN: usize = 120;

pub const SHARE_TITLE: &str = "Cool location";
pub const SHARE_TEXT: &str = "Check out this location";

/// A stored location paired with its distance from the user, recomputed on every load.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedLocation {
    pub loc: Location,
    pub distance_km: f64,
}

#[derive(Debug, Clone)]
pub struct Flash {
    pub message: String,
    pub shown_at: Instant,
}

/// Single-line editable text with a grapheme-aware cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    buffer: String,
    cursor: usize,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        let buffer = value.into();
        let cursor = buffer.len();
        Self { buffer, cursor }
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        if self.buffer.chars().count() >= MAX_INPUT_LEN || ch.is_control() {
            return false;
        }
        self.buffer.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(&self.buffer, self.cursor);
        self.buffer.drain(prev..self.cursor);
        self.cursor = prev;
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.buffer.len() {
            return false;
        }
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        self.buffer.drain(self.cursor..next);
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor = prev_grapheme_boundary(&self.buffer, self.cursor);
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.cursor >= self.buffer.len() {
            return false;
        }
        self.cursor = next_grapheme_boundary(&self.buffer, self.cursor);
        true
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.buffer.len();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogField {
    Name,
    Rate,
}

/// Add and update dialogs share one form: a name and a 1-5 rating.
#[derive(Debug, Clone)]
pub struct LocationDialog {
    pub loc_id: Option<String>,
    pub geo: Geo,
    pub name: TextInput,
    pub rate: TextInput,
    pub focus: DialogField,
    pub error: Option<String>,
}

impl LocationDialog {
    pub fn for_new(geo: Geo) -> Self {
        Self {
            loc_id: None,
            geo,
            name: TextInput::default(),
            rate: TextInput::default(),
            focus: DialogField::Name,
            error: None,
        }
    }

    pub fn for_existing(loc: &Location) -> Self {
        Self {
            loc_id: Some(loc.id.clone()),
            geo: loc.geo.clone(),
            name: TextInput::new(loc.name.clone()),
            rate: TextInput::new(loc.rate.to_string()),
            focus: DialogField::Name,
            error: None,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            DialogField::Name => DialogField::Rate,
            DialogField::Rate => DialogField::Name,
        };
    }

    pub fn focused_input_mut(&mut self) -> &mut TextInput {
        match self.focus {
            DialogField::Name => &mut self.name,
            DialogField::Rate => &mut self.rate,
        }
    }

    /// Trimmed name and rate, or the inline message to show.
    pub fn validate(&self) -> Result<(String, i64), ValidationError> {
        let name = self.name.as_str().trim();
        let rate = self.rate.as_str().trim();
        if name.is_empty() || rate.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        match rate.parse::<i64>() {
            Ok(value) if (1..=i64::from(MAX_RATE)).contains(&value) => {
                Ok((name.to_string(), value))
            }
            _ => Err(ValidationError::RateOutOfRange),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareOverlay {
    pub title: String,
    pub text: String,
    pub url: String,
}

impl ShareOverlay {
    pub fn new(url: String) -> Self {
        Self {
            title: SHARE_TITLE.to_string(),
            text: SHARE_TEXT.to_string(),
            url,
        }
    }
}

#[derive(Debug, Clone)]
pub enum OverlayState {
    AddLocation(LocationDialog),
    UpdateLocation(LocationDialog),
    Filter(TextInput),
    AddressSearch(TextInput),
    Share(ShareOverlay),
}

impl OverlayState {
    pub fn text_input_mut(&mut self) -> Option<&mut TextInput> {
        match self {
            OverlayState::AddLocation(dialog) | OverlayState::UpdateLocation(dialog) => {
                Some(dialog.focused_input_mut())
            }
            OverlayState::Filter(input) | OverlayState::AddressSearch(input) => Some(input),
            OverlayState::Share(_) => None,
        }
    }
}

/// Everything the renderer needs; the controller is the only writer.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub locs: Vec<ListedLocation>,
    pub cursor: usize,
    pub query: QueryParams,
    pub detail: Option<Location>,
    /// Share link for the location in the detail panel.
    pub detail_link: Option<String>,
    pub user_pos: Option<LatLng>,
    pub sort: SortSpec,
    pub filter: FilterSpec,
    pub rate_pie: Option<PieView>,
    pub update_pie: Option<PieView>,
    pub flash: Option<Flash>,
    pub overlay: Option<OverlayState>,
    pub copied_link: Option<String>,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(query: QueryParams) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.locs.is_empty()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.query.loc_id()
    }

    pub fn is_active(&self, loc: &Location) -> bool {
        self.selected_id() == Some(loc.id.as_str())
    }

    /// Distance to the location in the detail panel, taken from the listed row.
    pub fn detail_distance_km(&self) -> Option<f64> {
        let detail = self.detail.as_ref()?;
        self.locs
            .iter()
            .find(|listed| listed.loc.id == detail.id)
            .map(|listed| listed.distance_km)
    }

    pub fn cursor_loc(&self) -> Option<&ListedLocation> {
        self.locs.get(self.cursor)
    }

    pub fn cursor_id(&self) -> Option<String> {
        self.cursor_loc().map(|listed| listed.loc.id.clone())
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.locs.is_empty() {
            self.cursor = 0;
            return;
        }
        let last = self.locs.len() as isize - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, last) as usize;
    }

    pub fn focus_cursor_on(&mut self, id: &str) {
        if let Some(idx) = self.locs.iter().position(|listed| listed.loc.id == id) {
            self.cursor = idx;
        }
    }

    pub fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.locs.len().saturating_sub(1));
    }

    pub fn set_flash(&mut self, message: impl Into<String>, now: Instant) {
        self.flash = Some(Flash {
            message: message.into(),
            shown_at: now,
        });
    }

    pub fn flash_message(&self) -> Option<&str> {
        self.flash.as_ref().map(|flash| flash.message.as_str())
    }

    pub fn expire_flash(&mut self, now: Instant, ttl: Duration) {
        let expired = self
            .flash
            .as_ref()
            .is_some_and(|flash| now.saturating_duration_since(flash.shown_at) >= ttl);
        if expired {
            self.flash = None;
        }
    }

    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref()
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn dialog_mut(&mut self) -> Option<&mut LocationDialog> {
        match self.overlay.as_mut() {
            Some(OverlayState::AddLocation(dialog)) | Some(OverlayState::UpdateLocation(dialog)) => {
                Some(dialog)
            }
            _ => None,
        }
    }
}

fn prev_grapheme_boundary(text: &str, cursor: usize) -> usize {
    if cursor == 0 {
        return 0;
    }
    text[..cursor]
        .grapheme_indices(true)
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_grapheme_boundary(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .graphemes(true)
        .next()
        .map(|grapheme| cursor + grapheme.len())
        .unwrap_or(text.len())
}
