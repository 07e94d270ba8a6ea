use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{DialogField, LocationDialog, ShareOverlay, TextInput};
use crate::app::{AppState, OverlayState};
use crate::geo::elapsed_time;
use crate::highlight::{build_highlight_regex, highlight_spans};
use crate::map::MapAdapter;
use crate::search::MAX_RATE;
use crate::storage::Location;

pub mod map;
pub mod pie;

struct Panes {
    list: Rect,
    detail: Rect,
    map: Rect,
    rate_stats: Rect,
    update_stats: Rect,
    status: Rect,
}

fn panes(area: Rect) -> Panes {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(2)])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(vertical[0]);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(10)])
        .split(columns[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(8)])
        .split(columns[1]);
    let stats = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(right[1]);
    Panes {
        list: left[0],
        detail: left[1],
        map: right[0],
        rate_stats: stats[0],
        update_stats: stats[1],
        status: vertical[1],
    }
}

/// Inner canvas area of the map pane for a frame of the given size.
pub fn map_viewport(area: Rect) -> Rect {
    map::map_block(String::new()).inner(panes(area).map)
}

pub fn draw_app<M: MapAdapter>(
    frame: &mut Frame,
    state: &AppState,
    map_view: &M,
    list_state: &mut ListState,
) {
    let panes = panes(frame.size());

    render_list(frame, panes.list, state, list_state);
    render_detail(frame, panes.detail, state);
    map::render_map(frame, panes.map, state, map_view);
    pie::render_pie(frame, panes.rate_stats, "By rate", state.rate_pie.as_ref());
    pie::render_pie(
        frame,
        panes.update_stats,
        "Last updated",
        state.update_pie.as_ref(),
    );
    frame.render_widget(
        Paragraph::new(build_status_lines(state)).style(Style::default().fg(Color::Gray)),
        panes.status,
    );

    render_overlay(frame, state);
}

fn render_list(frame: &mut Frame, area: Rect, state: &AppState, list_state: &mut ListState) {
    let highlight_regex = build_highlight_regex(&state.filter.txt);
    let highlight_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let mut items = Vec::with_capacity(state.locs.len());
    for listed in &state.locs {
        let loc = &listed.loc;
        let active = state.is_active(loc);
        let mut title_spans = Vec::new();
        if active {
            title_spans.push(Span::styled(
                "● ",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        let name_style = if active {
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        title_spans.extend(highlight_spans(
            &loc.name,
            highlight_regex.as_ref(),
            highlight_style,
            name_style,
        ));
        title_spans.push(Span::raw("  "));
        title_spans.push(Span::styled(stars(loc.rate), Style::default().fg(Color::Yellow)));

        let mut meta = vec![Span::styled(
            format!("{:.2} km", listed.distance_km),
            Style::default().fg(Color::Cyan),
        )];
        meta.push(Span::styled(
            format!(" • created {}", elapsed_time(loc.created_at)),
            Style::default().fg(Color::Gray),
        ));
        if loc.was_updated() {
            meta.push(Span::styled(
                format!(" • updated {}", elapsed_time(loc.updated_at)),
                Style::default().fg(Color::Gray),
            ));
        }
        items.push(ListItem::new(vec![Line::from(title_spans), Line::from(meta)]));
    }
    if items.is_empty() {
        items.push(ListItem::new("No locs to show"));
    }

    let list = List::new(items)
        .block(
            Block::default()
                .title(format!("Locations ({})", state.locs.len()))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, list_state);
}

fn render_detail(frame: &mut Frame, area: Rect, state: &AppState) {
    let text = state
        .detail
        .as_ref()
        .map(|loc| detail_text(loc, state.detail_distance_km(), state.detail_link.as_deref()))
        .unwrap_or_else(|| Text::from("Select a location (Enter) to see its details."));
    let paragraph = Paragraph::new(text)
        .block(Block::default().title("Details").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn detail_text(loc: &Location, distance_km: Option<f64>, link: Option<&str>) -> Text<'static> {
    let gray = Style::default().fg(Color::Gray);
    let mut lines = vec![
        Line::from(vec![
            Span::styled(loc.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(stars(loc.rate), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(loc.geo.address.clone()),
        Line::from(Span::styled(
            format!("{:.5}, {:.5}", loc.geo.lat, loc.geo.lng),
            gray,
        )),
    ];
    if let Some(distance) = distance_km {
        lines.push(Line::from(format!("{distance:.2} km away")));
    }
    lines.push(Line::from(Span::styled(
        format!("Created {}", elapsed_time(loc.created_at)),
        gray,
    )));
    if loc.was_updated() {
        lines.push(Line::from(Span::styled(
            format!("Updated {}", elapsed_time(loc.updated_at)),
            gray,
        )));
    }
    if let Some(link) = link {
        lines.push(Line::from(Span::styled(
            link.to_string(),
            Style::default().fg(Color::Cyan),
        )));
    }
    Text::from(lines)
}

fn stars(rate: u8) -> String {
    let filled = rate.min(MAX_RATE);
    format!(
        "{}{}",
        "★".repeat(usize::from(filled)),
        "☆".repeat(usize::from(MAX_RATE - filled))
    )
}

fn build_status_lines(state: &AppState) -> Text<'static> {
    let mut first = Vec::new();
    if let Some(message) = state.flash_message() {
        first.push(Span::styled(
            message.to_string(),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
        first.push(Span::raw(" "));
    }
    first.push(Span::raw(format!("Total: {}", state.locs.len())));
    first.push(Span::raw(" | Sort: "));
    first.push(Span::styled(
        state.sort.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    if !state.filter.is_empty() {
        first.push(Span::raw(" | Filter: "));
        if !state.filter.txt.is_empty() {
            first.push(Span::styled(
                format!("\"{}\"", state.filter.txt),
                Style::default().fg(Color::Yellow),
            ));
        }
        if state.filter.min_rate > 0 {
            first.push(Span::styled(
                format!(" [rate >= {}]", state.filter.min_rate),
                Style::default().fg(Color::Green),
            ));
        }
    }
    if let Some(link) = &state.copied_link {
        first.push(Span::raw(" | Link: "));
        first.push(Span::styled(link.clone(), Style::default().fg(Color::Cyan)));
    }

    let hints = Line::from(Span::styled(
        "j/k move • Enter select • a add • e edit • d remove • / filter • s/o sort • g go to • u me • y copy • x share • +/- zoom • q quit",
        Style::default().fg(Color::DarkGray),
    ));
    Text::from(vec![Line::from(first), hints])
}

fn render_overlay(frame: &mut Frame, state: &AppState) {
    match state.overlay() {
        Some(OverlayState::AddLocation(dialog)) => {
            render_location_dialog(frame, "Add Location", dialog);
        }
        Some(OverlayState::UpdateLocation(dialog)) => {
            render_location_dialog(frame, "Update Location", dialog);
        }
        Some(OverlayState::Filter(input)) => render_prompt(
            frame,
            "Filter",
            "Text to match, optionally followed by min:N for a minimum rate",
            input,
        ),
        Some(OverlayState::AddressSearch(input)) => {
            render_prompt(frame, "Go To Address", "Address or place name", input)
        }
        Some(OverlayState::Share(share)) => render_share(frame, share),
        None => {}
    }
}

fn render_location_dialog(frame: &mut Frame, title: &str, dialog: &LocationDialog) {
    let area = centered_rect(60, 40, frame.size());
    frame.render_widget(Clear, area);

    let field_style = |field: DialogField| {
        if dialog.focus == field {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        }
    };
    let mut lines = vec![
        Line::from(Span::styled(
            dialog.geo.address.clone(),
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Name: ", field_style(DialogField::Name)),
            Span::raw(dialog.name.as_str().to_string()),
        ]),
        Line::from(vec![
            Span::styled(format!("Rate (1-{MAX_RATE}): "), field_style(DialogField::Rate)),
            Span::raw(dialog.rate.as_str().to_string()),
        ]),
        Line::from(""),
    ];
    if let Some(error) = &dialog.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(Span::styled(
        "Tab to switch field • Enter to save • Esc to cancel",
        Style::default().fg(Color::Gray),
    )));

    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );

    // label widths match the spans above; row 0 is the address line
    let (label, input, row) = match dialog.focus {
        DialogField::Name => ("Name: ".to_string(), &dialog.name, 2),
        DialogField::Rate => (format!("Rate (1-{MAX_RATE}): "), &dialog.rate, 3),
    };
    place_cursor(frame, inner, row, label.width(), input);
}

fn render_prompt(frame: &mut Frame, title: &str, hint: &str, input: &TextInput) {
    let area = centered_rect(60, 25, frame.size());
    frame.render_widget(Clear, area);
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(hint.to_string(), Style::default().fg(Color::Gray))),
        Line::from(""),
        Line::from(format!("> {}", input.as_str())),
        Line::from(""),
        Line::from(Span::styled(
            "Enter to apply • Esc to cancel",
            Style::default().fg(Color::Gray),
        )),
    ])
    .block(block);
    frame.render_widget(paragraph, area);
    place_cursor(frame, inner, 2, 2, input);
}

fn render_share(frame: &mut Frame, share: &ShareOverlay) {
    let area = centered_rect(70, 30, frame.size());
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(
            share.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(share.text.clone()),
        Line::from(""),
        Line::from(Span::styled(share.url.clone(), Style::default().fg(Color::Cyan))),
        Line::from(""),
        Line::from(Span::styled(
            "Enter or Esc to close",
            Style::default().fg(Color::Gray),
        )),
    ])
    .block(
        Block::default()
            .title("Share")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    )
    .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn place_cursor(frame: &mut Frame, inner: Rect, row: u16, offset: usize, input: &TextInput) {
    if row >= inner.height {
        return;
    }
    let before_cursor = &input.as_str()[..input.cursor()];
    let width = offset + before_cursor.graphemes(true).map(|g| g.width()).sum::<usize>();
    let max_x = usize::from(inner.width.saturating_sub(1));
    let x = inner.x + u16::try_from(width.min(max_x)).unwrap_or(0);
    frame.set_cursor(x, inner.y + row);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
