use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Circle, Map, MapResolution, Points};
use ratatui::widgets::{Block, Borders};
use ratatui::Frame;

use crate::app::AppState;
use crate::map::MapAdapter;

/// Zoom level from which the detailed coastline is drawn.
const HIGH_RESOLUTION_ZOOM: u8 = 3;

pub fn map_block(title: String) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
}

pub fn render_map<M: MapAdapter>(frame: &mut Frame, area: Rect, state: &AppState, map: &M) {
    let camera = map.camera();
    let title = format!(
        "Map ({:.3}, {:.3}) z{}",
        camera.center.lat, camera.center.lng, camera.zoom
    );
    let resolution = if camera.zoom >= HIGH_RESOLUTION_ZOOM {
        MapResolution::High
    } else {
        MapResolution::Low
    };

    let coords: Vec<(f64, f64)> = state
        .locs
        .iter()
        .map(|listed| (listed.loc.geo.lng, listed.loc.geo.lat))
        .collect();
    let marker = map.marker().cloned();
    let user_pos = state.user_pos;
    let radius = camera.lng_span() / 80.0;

    let canvas = Canvas::default()
        .block(map_block(title))
        .marker(Marker::Braille)
        .x_bounds(camera.x_bounds())
        .y_bounds(camera.y_bounds())
        .paint(move |ctx| {
            ctx.draw(&Map {
                resolution,
                color: Color::DarkGray,
            });
            ctx.layer();
            ctx.draw(&Points {
                coords: &coords,
                color: Color::Cyan,
            });
            if let Some(pos) = user_pos {
                ctx.print(
                    pos.lng,
                    pos.lat,
                    Span::styled("@", Style::default().fg(Color::LightBlue).add_modifier(Modifier::BOLD)),
                );
            }
            if let Some(marker) = &marker {
                ctx.draw(&Circle {
                    x: marker.point.lng,
                    y: marker.point.lat,
                    radius,
                    color: Color::Yellow,
                });
                ctx.print(
                    marker.point.lng,
                    marker.point.lat,
                    Line::from(Span::styled(
                        format!(" {}", marker.label),
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )),
                );
            }
        });
    frame.render_widget(canvas, area);
}
