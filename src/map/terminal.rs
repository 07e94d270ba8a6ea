use ratatui::layout::Rect;

use crate::app::Action;
use crate::config::AppConfig;
use crate::error::MapError;
use crate::geo::{Geo, Geocoder, LatLng, PositionSource};
use crate::map::{Camera, ClickListener, MapAdapter, MapMarker};
use crate::storage::Location;

/// Map adapter drawn on a terminal canvas, backed by HTTP geo providers.
pub struct TerminalMap {
    geocoder: Geocoder,
    position: PositionSource,
    camera: Camera,
    /// Last resolved user position; reloads reuse it until a refresh.
    user_pos: Option<LatLng>,
    marker: Option<MapMarker>,
    viewport: Option<Rect>,
    listener: Option<ClickListener>,
    initialised: bool,
    initial_zoom: u8,
}

impl TerminalMap {
    pub fn new(geocoder: Geocoder, position: PositionSource, initial_zoom: u8) -> Self {
        Self {
            geocoder,
            position,
            camera: Camera::new(LatLng::new(0.0, 0.0), initial_zoom),
            user_pos: None,
            marker: None,
            viewport: None,
            listener: None,
            initialised: false,
            initial_zoom,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, MapError> {
        let geocoder = Geocoder::new(config.geocoder.clone())?;
        let position = PositionSource::from_config(&config.position, &config.geocoder.user_agent)?;
        Ok(Self::new(geocoder, position, config.map.initial_zoom))
    }

    /// Coordinate under a terminal cell, if the cell is inside the map.
    pub fn cell_to_point(&self, column: u16, row: u16) -> Option<LatLng> {
        let area = self.viewport?;
        if area.width == 0 || area.height == 0 {
            return None;
        }
        let inside_x = column >= area.x && column < area.x + area.width;
        let inside_y = row >= area.y && row < area.y + area.height;
        if !inside_x || !inside_y {
            return None;
        }
        let fx = (f64::from(column - area.x) + 0.5) / f64::from(area.width);
        let fy = (f64::from(row - area.y) + 0.5) / f64::from(area.height);
        Some(self.camera.point_at(fx, fy))
    }
}

impl MapAdapter for TerminalMap {
    fn init_map(&mut self) -> Result<(), MapError> {
        let center = match self.refresh_user_position() {
            Ok(point) => point,
            Err(err) => {
                tracing::warn!(?err, "starting map without user position");
                LatLng::new(0.0, 0.0)
            }
        };
        self.camera = Camera::new(center, self.initial_zoom);
        self.initialised = true;
        tracing::debug!(camera = ?self.camera, "map initialised");
        Ok(())
    }

    fn add_click_listener(&mut self, listener: ClickListener) {
        self.listener = Some(listener);
    }

    fn get_user_position(&mut self) -> Result<LatLng, MapError> {
        match self.user_pos {
            Some(point) => Ok(point),
            None => self.refresh_user_position(),
        }
    }

    fn refresh_user_position(&mut self) -> Result<LatLng, MapError> {
        let point = self.position.resolve()?;
        self.user_pos = Some(point);
        Ok(point)
    }

    fn lookup_address_geo(&mut self, address: &str) -> Result<Geo, MapError> {
        self.geocoder.lookup(address)
    }

    fn pan_to(&mut self, target: LatLng, zoom: Option<u8>) {
        self.camera = Camera::new(target, zoom.unwrap_or(self.camera.zoom));
    }

    fn set_marker(&mut self, loc: Option<&Location>) {
        self.marker = loc.map(|loc| MapMarker {
            label: loc.name.clone(),
            point: loc.geo.lat_lng(),
        });
    }

    fn camera(&self) -> Camera {
        self.camera
    }

    fn marker(&self) -> Option<&MapMarker> {
        self.marker.as_ref()
    }

    fn set_viewport(&mut self, area: Rect) {
        self.viewport = Some(area);
    }

    fn click(&mut self, column: u16, row: u16) -> Option<Action> {
        if !self.initialised {
            return None;
        }
        let point = self.cell_to_point(column, row)?;
        let geo = self.describe_point(point);
        self.listener.as_ref().map(|listener| listener(geo))
    }

    fn describe_point(&mut self, point: LatLng) -> Geo {
        match self.geocoder.reverse(point) {
            Ok(geo) => geo,
            Err(err) => {
                tracing::warn!(?err, %point, "reverse geocoding failed, using coordinates");
                Geo::from_point(point)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GeocoderConfig, PositionConfig, PositionProvider};
    use assert_matches::assert_matches;

    fn offline_map() -> TerminalMap {
        let geocoder = Geocoder::new(GeocoderConfig {
            // nothing listens on the discard port, so reverse lookups fail fast
            endpoint: "http://127.0.0.1:9".into(),
            timeout_secs: 1,
            ..GeocoderConfig::default()
        })
        .expect("geocoder");
        TerminalMap::new(geocoder, PositionSource::Fixed(LatLng::new(10.0, 20.0)), 1)
    }

    #[test]
    fn init_centres_on_user_position() {
        let mut map = offline_map();
        map.init_map().expect("init");
        assert_eq!(map.camera().center, LatLng::new(10.0, 20.0));
        assert_eq!(map.get_user_position().expect("position"), LatLng::new(10.0, 20.0));
    }

    #[test]
    fn reloads_reuse_the_resolved_position_until_refreshed() {
        let mut map = offline_map();
        map.init_map().expect("init");
        // swap in a source that cannot answer
        map.position = PositionSource::from_config(
            &PositionConfig {
                provider: PositionProvider::IpLookup,
                ip_endpoint: "http://127.0.0.1:9/json".into(),
                timeout_secs: 1,
                ..PositionConfig::default()
            },
            "loctui-test",
        )
        .expect("ip source");

        assert_eq!(map.get_user_position().expect("cached"), LatLng::new(10.0, 20.0));
        assert_matches!(map.refresh_user_position(), Err(MapError::PositionUnavailable(_)));
        assert_eq!(map.get_user_position().expect("still cached"), LatLng::new(10.0, 20.0));
    }

    #[test]
    fn position_is_resolved_lazily_without_init() {
        let mut map = offline_map();
        assert_eq!(map.get_user_position().expect("position"), LatLng::new(10.0, 20.0));
        assert_eq!(map.user_pos, Some(LatLng::new(10.0, 20.0)));
    }

    #[test]
    fn clicks_outside_viewport_are_ignored() {
        let mut map = offline_map();
        map.init_map().expect("init");
        map.set_viewport(Rect::new(10, 5, 20, 10));
        assert_eq!(map.cell_to_point(9, 6), None);
        assert_eq!(map.cell_to_point(15, 15), None);
        assert!(map.cell_to_point(10, 5).is_some());
    }

    #[test]
    fn click_runs_listener_with_coordinate_fallback() {
        let mut map = offline_map();
        map.set_viewport(Rect::new(0, 0, 36, 18));
        map.add_click_listener(Box::new(Action::OpenAddDialog));
        assert_eq!(map.click(18, 9), None, "clicks before init are dropped");

        map.init_map().expect("init");
        map.pan_to(LatLng::new(0.0, 0.0), Some(1));
        let action = map.click(18, 9).expect("action");
        let Action::OpenAddDialog(geo) = action else {
            panic!("unexpected action {action:?}");
        };
        assert!((geo.lat - -5.0).abs() < 1e-9, "lat {}", geo.lat);
        assert!((geo.lng - 5.0).abs() < 1e-9, "lng {}", geo.lng);
        assert_eq!(geo.address, Geo::from_point(geo.lat_lng()).address);
    }

    #[test]
    fn marker_follows_location() {
        let mut map = offline_map();
        let loc = Location {
            id: "a".into(),
            name: "Pier".into(),
            rate: 4,
            geo: Geo::new(1.0, 2.0, "Harbour"),
            created_at: 0,
            updated_at: 0,
        };
        map.set_marker(Some(&loc));
        assert_eq!(map.marker().map(|m| m.label.as_str()), Some("Pier"));
        map.set_marker(None);
        assert!(map.marker().is_none());
    }
}
