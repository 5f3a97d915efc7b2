use crate::core::{
    constants::{MAX_ZOOM, MIN_ZOOM, TILE_SIZE},
    geo::{LatLng, LatLngBounds, Point},
};
use serde::{Deserialize, Serialize};

/// Pixels kept free around fitted bounds
const FIT_PADDING: f64 = 40.0;

/// Where the map is looking
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub center: LatLng,
    pub zoom: f64,
}

impl Camera {
    pub fn new(center: LatLng, zoom: f64) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// Camera that shows `bounds` inside a surface of `size` pixels, snapped
    /// to whole zoom levels
    pub fn fit(bounds: &LatLngBounds, size: Point) -> Self {
        let nw = project(&LatLng::new(bounds.north_east.lat, bounds.south_west.lng));
        let se = project(&LatLng::new(bounds.south_west.lat, bounds.north_east.lng));
        let span_x = (se.x - nw.x).abs() * TILE_SIZE;
        let span_y = (se.y - nw.y).abs() * TILE_SIZE;

        let avail_x = (size.x - 2.0 * FIT_PADDING).max(1.0);
        let avail_y = (size.y - 2.0 * FIT_PADDING).max(1.0);

        let zoom_for = |span: f64, avail: f64| {
            if span <= f64::EPSILON {
                MAX_ZOOM
            } else {
                (avail / span).log2()
            }
        };
        let zoom = zoom_for(span_x, avail_x)
            .min(zoom_for(span_y, avail_y))
            .floor();

        Self::new(bounds.center(), zoom)
    }

    /// Checks whether the camera looks at `position` at `zoom`
    pub fn is_at(&self, position: LatLng, zoom: f64) -> bool {
        (self.center.lat - position.lat).abs() < 1e-9
            && (self.center.lng - position.lng).abs() < 1e-9
            && (self.zoom - zoom).abs() < 1e-9
    }
}

/// Web Mercator projection to the unit square (EPSG:3857, zoom 0, tile size 1)
fn project(lat_lng: &LatLng) -> Point {
    let lat = LatLng::new(lat_lng.lat.clamp(-85.0511287798, 85.0511287798), lat_lng.lng);
    let x = (lat.lng + 180.0) / 360.0;
    let sin = lat.lat.to_radians().sin();
    let y = 0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * std::f64::consts::PI);
    Point::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_is_clamped() {
        assert_eq!(Camera::new(LatLng::default(), 40.0).zoom, MAX_ZOOM);
        assert_eq!(Camera::new(LatLng::default(), -1.0).zoom, MIN_ZOOM);
    }

    #[test]
    fn test_fit_centers_on_bounds() {
        let bounds = LatLngBounds::from_coords(39.9, 116.4, 39.95, 116.5);
        let camera = Camera::fit(&bounds, Point::new(1200.0, 800.0));
        assert_eq!(camera.center, bounds.center());
        assert_eq!(camera.zoom, camera.zoom.floor());
        assert!(camera.zoom > 11.0 && camera.zoom < 16.0);
    }

    #[test]
    fn test_fit_zooms_out_for_larger_bounds() {
        let size = Point::new(1200.0, 800.0);
        let small = Camera::fit(&LatLngBounds::from_coords(39.90, 116.40, 39.91, 116.41), size);
        let large = Camera::fit(&LatLngBounds::from_coords(30.0, 100.0, 45.0, 125.0), size);
        assert!(large.zoom < small.zoom);
    }

    #[test]
    fn test_fit_single_point_uses_max_zoom() {
        let p = LatLng::new(39.9, 116.4);
        let camera = Camera::fit(&LatLngBounds::new(p, p), Point::new(800.0, 600.0));
        assert!(camera.is_at(p, MAX_ZOOM));
    }
}
