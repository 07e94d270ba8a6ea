use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::state::AppState;
use crate::geo::Geo;
use crate::search::{FilterSpec, SortSpec};

/// Every user interaction the controller understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    Refresh,
    CursorNext,
    CursorPrevious,
    SelectLoc(String),
    OpenAddDialog(Geo),
    AddAtCenter,
    OpenUpdateDialog(String),
    ConfirmDialog,
    CloseDialog,
    RemoveLoc(String),
    PanToUserPos,
    OpenAddressSearch,
    SearchAddress(String),
    OpenFilter,
    SetFilterBy(FilterSpec),
    CycleSort,
    ToggleSortDirection,
    SetSortBy(SortSpec),
    CopyLink,
    ShareLoc,
    ZoomIn,
    ZoomOut,
}

fn plain(key: &KeyEvent) -> bool {
    !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
}

/// Key bindings for the list view when no overlay is open.
pub fn main_view_action(key: KeyEvent, state: &AppState) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            KeyCode::Char('r') => Some(Action::Refresh),
            _ => None,
        };
    }
    if !plain(&key) {
        return None;
    }
    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('j') | KeyCode::Down => Some(Action::CursorNext),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::CursorPrevious),
        KeyCode::Enter => state.cursor_id().map(Action::SelectLoc),
        KeyCode::Char('e') => state.cursor_id().map(Action::OpenUpdateDialog),
        KeyCode::Char('d') | KeyCode::Delete => state.cursor_id().map(Action::RemoveLoc),
        KeyCode::Char('a') => Some(Action::AddAtCenter),
        KeyCode::Char('/') => Some(Action::OpenFilter),
        KeyCode::Char('g') => Some(Action::OpenAddressSearch),
        KeyCode::Char('u') => Some(Action::PanToUserPos),
        KeyCode::Char('y') => Some(Action::CopyLink),
        KeyCode::Char('x') => Some(Action::ShareLoc),
        KeyCode::Char('s') => Some(Action::CycleSort),
        KeyCode::Char('o') => Some(Action::ToggleSortDirection),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(Action::ZoomIn),
        KeyCode::Char('-') => Some(Action::ZoomOut),
        _ => None,
    }
}
