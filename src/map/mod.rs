use ratatui::layout::Rect;

use crate::app::Action;
use crate::error::MapError;
use crate::geo::{Geo, LatLng};
use crate::storage::Location;

pub mod terminal;

pub use terminal::TerminalMap;

pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 18;
/// Zoom used when panning to the user's own position.
pub const USER_ZOOM: u8 = 15;

/// Turns a clicked coordinate into the action to dispatch.
pub type ClickListener = Box<dyn Fn(Geo) -> Action + Send>;

/// Centre and zoom of the visible map; zoom 1 shows the whole world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub center: LatLng,
    pub zoom: u8,
}

impl Camera {
    pub fn new(center: LatLng, zoom: u8) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    pub fn lng_span(&self) -> f64 {
        360.0 / 2f64.powi(i32::from(self.zoom) - 1)
    }

    pub fn lat_span(&self) -> f64 {
        self.lng_span() / 2.0
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        let half = self.lng_span() / 2.0;
        [self.center.lng - half, self.center.lng + half]
    }

    pub fn y_bounds(&self) -> [f64; 2] {
        let half = self.lat_span() / 2.0;
        [self.center.lat - half, self.center.lat + half]
    }

    /// Coordinate under a fractional position of the viewport, origin top-left.
    pub fn point_at(&self, fx: f64, fy: f64) -> LatLng {
        let [west, _] = self.x_bounds();
        let [_, north] = self.y_bounds();
        let lat = (north - fy.clamp(0.0, 1.0) * self.lat_span()).clamp(-90.0, 90.0);
        let lng = wrap_lng(west + fx.clamp(0.0, 1.0) * self.lng_span());
        LatLng::new(lat, lng)
    }

    pub fn zoomed(&self, delta: i8) -> Self {
        let zoom = (i16::from(self.zoom) + i16::from(delta))
            .clamp(i16::from(MIN_ZOOM), i16::from(MAX_ZOOM)) as u8;
        Self::new(self.center, zoom)
    }
}

fn wrap_lng(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        return lng;
    }
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub label: String,
    pub point: LatLng,
}

/// Everything the controller needs from a map widget.
pub trait MapAdapter {
    fn init_map(&mut self) -> Result<(), MapError>;

    /// Registers the callback run by [`MapAdapter::click`].
    fn add_click_listener(&mut self, listener: ClickListener);

    /// Current user position; adapters may answer from a cached lookup.
    fn get_user_position(&mut self) -> Result<LatLng, MapError>;

    /// Forces a fresh position lookup.
    fn refresh_user_position(&mut self) -> Result<LatLng, MapError> {
        self.get_user_position()
    }

    fn lookup_address_geo(&mut self, address: &str) -> Result<Geo, MapError>;

    /// Moves the camera; `None` keeps the current zoom.
    fn pan_to(&mut self, target: LatLng, zoom: Option<u8>);

    fn set_marker(&mut self, loc: Option<&Location>);

    fn camera(&self) -> Camera;

    fn marker(&self) -> Option<&MapMarker>;

    /// Screen area the map is drawn into, used to translate clicks.
    fn set_viewport(&mut self, area: Rect);

    /// Translates a terminal cell and runs the click listener.
    fn click(&mut self, column: u16, row: u16) -> Option<Action>;

    /// Best-effort address for a point; falls back to the coordinates.
    fn describe_point(&mut self, point: LatLng) -> Geo {
        Geo::from_point(point)
    }

    fn zoom_by(&mut self, delta: i8) {
        let camera = self.camera().zoomed(delta);
        self.pan_to(camera.center, Some(camera.zoom));
    }
}
