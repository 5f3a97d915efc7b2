use crate::{
    core::{
        constants::TRAFFIC_LAYER_Z_INDEX,
        geo::LatLng,
        route::{RoutePath, RoutePoint},
    },
    layers::{
        base::{LayerKind, OverlayId, SurfaceHandle},
        marker::Marker,
    },
    prelude::{HashMap, HashSet},
    traits::MapSurface,
};

#[derive(Debug, Clone)]
struct DrawnOverlay {
    handle: SurfaceHandle,
    label: Option<String>,
    position: Option<LatLng>,
}

/// Read-only view of what is currently drawn
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlaySummary {
    /// Route marker labels in route order
    pub waypoint_labels: Vec<String>,
    pub waypoint_positions: Vec<LatLng>,
    pub has_path: bool,
    pub center_marker: Option<LatLng>,
    pub user_location: Option<LatLng>,
    pub traffic_on: bool,
    /// Total number of live overlays
    pub len: usize,
}

/// Tracks every overlay drawn on the map surface, keyed by logical id
///
/// All mutations take the surface explicitly; the session owns both and
/// never lets two callers touch them at once.
pub struct OverlayManager {
    overlays: HashMap<OverlayId, DrawnOverlay>,
    /// Traffic layer object, created on first enable and reused afterwards
    traffic_layer: Option<SurfaceHandle>,
}

impl OverlayManager {
    pub fn new() -> Self {
        Self {
            overlays: HashMap::default(),
            traffic_layer: None,
        }
    }

    /// Overlays that survive a route redraw
    pub fn persistent() -> HashSet<OverlayId> {
        [OverlayId::UserLocation, OverlayId::TrafficLayer]
            .into_iter()
            .collect()
    }

    /// Removes every drawn overlay whose id is not in `preserve`
    pub fn clear_all(&mut self, surface: &mut dyn MapSurface, preserve: &HashSet<OverlayId>) {
        let doomed: Vec<OverlayId> = self
            .overlays
            .keys()
            .filter(|id| !preserve.contains(id))
            .copied()
            .collect();

        for id in doomed {
            if let Some(overlay) = self.overlays.remove(&id) {
                if id == OverlayId::TrafficLayer {
                    surface.detach(overlay.handle);
                } else {
                    surface.remove(overlay.handle);
                }
            }
        }
    }

    /// Replaces the route markers with one labeled marker per point
    pub fn draw_waypoints(&mut self, surface: &mut dyn MapSurface, points: &[RoutePoint]) {
        self.clear_all(surface, &Self::persistent());
        for (index, point) in points.iter().enumerate() {
            let marker = Marker::for_route_point(point, index);
            self.put_marker(surface, OverlayId::Waypoint(index), &marker);
        }
        log::debug!("drew {} route markers", points.len());
    }

    /// Replaces the route polyline
    pub fn draw_path(&mut self, surface: &mut dyn MapSurface, path: &RoutePath) {
        if let Some(previous) = self.overlays.remove(&OverlayId::RoutePath) {
            surface.remove(previous.handle);
        }
        let handle = surface.create_polyline(&path.points);
        self.overlays.insert(
            OverlayId::RoutePath,
            DrawnOverlay {
                handle,
                label: None,
                position: None,
            },
        );
    }

    /// Swaps the whole route in one step so the old and new marker sets are
    /// never visible together
    pub fn commit_route(
        &mut self,
        surface: &mut dyn MapSurface,
        points: &[RoutePoint],
        path: Option<&RoutePath>,
    ) {
        self.draw_waypoints(surface, points);
        if let Some(path) = path {
            self.draw_path(surface, path);
        }
    }

    /// Shows only the default-center marker
    pub fn draw_center_marker(&mut self, surface: &mut dyn MapSurface, position: LatLng) {
        self.clear_all(surface, &Self::persistent());
        self.put_marker(surface, OverlayId::CenterMarker, &Marker::center(position));
    }

    /// Draws (or moves) the single user-location marker
    pub fn draw_user_location(&mut self, surface: &mut dyn MapSurface, position: LatLng) {
        self.put_marker(surface, OverlayId::UserLocation, &Marker::user_location(position));
    }

    pub fn clear_user_location(&mut self, surface: &mut dyn MapSurface) {
        if let Some(overlay) = self.overlays.remove(&OverlayId::UserLocation) {
            surface.remove(overlay.handle);
        }
    }

    /// Shows or hides the traffic layer. Returns whether anything changed;
    /// asking for the current state is a no-op.
    pub fn set_traffic_layer(&mut self, surface: &mut dyn MapSurface, on: bool) -> bool {
        let shown = self.overlays.contains_key(&OverlayId::TrafficLayer);
        if shown == on {
            return false;
        }

        if on {
            let handle = match self.traffic_layer {
                Some(handle) => handle,
                None => {
                    let handle = surface.create_layer(LayerKind::Traffic, TRAFFIC_LAYER_Z_INDEX);
                    self.traffic_layer = Some(handle);
                    handle
                }
            };
            surface.attach(handle);
            self.overlays.insert(
                OverlayId::TrafficLayer,
                DrawnOverlay {
                    handle,
                    label: None,
                    position: None,
                },
            );
        } else if let Some(overlay) = self.overlays.remove(&OverlayId::TrafficLayer) {
            surface.detach(overlay.handle);
        }
        log::debug!("traffic layer {}", if on { "on" } else { "off" });
        true
    }

    /// Removes everything, including the lazily created traffic layer object
    pub fn teardown(&mut self, surface: &mut dyn MapSurface) {
        self.clear_all(surface, &HashSet::default());
        if let Some(handle) = self.traffic_layer.take() {
            surface.remove(handle);
        }
    }

    pub fn contains(&self, id: OverlayId) -> bool {
        self.overlays.contains_key(&id)
    }

    pub fn summary(&self) -> OverlaySummary {
        let mut markers: Vec<(usize, &DrawnOverlay)> = self
            .overlays
            .iter()
            .filter_map(|(id, overlay)| match id {
                OverlayId::Waypoint(index) => Some((*index, overlay)),
                _ => None,
            })
            .collect();
        markers.sort_by_key(|(index, _)| *index);

        OverlaySummary {
            waypoint_labels: markers
                .iter()
                .map(|(_, o)| o.label.clone().unwrap_or_default())
                .collect(),
            waypoint_positions: markers.iter().filter_map(|(_, o)| o.position).collect(),
            has_path: self.contains(OverlayId::RoutePath),
            center_marker: self
                .overlays
                .get(&OverlayId::CenterMarker)
                .and_then(|o| o.position),
            user_location: self
                .overlays
                .get(&OverlayId::UserLocation)
                .and_then(|o| o.position),
            traffic_on: self.contains(OverlayId::TrafficLayer),
            len: self.overlays.len(),
        }
    }

    /// Gets the number of live overlays
    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    fn put_marker(&mut self, surface: &mut dyn MapSurface, id: OverlayId, marker: &Marker) {
        if let Some(previous) = self.overlays.remove(&id) {
            surface.remove(previous.handle);
        }
        let handle = surface.create_marker(marker.position(), marker.style());
        self.overlays.insert(
            id,
            DrawnOverlay {
                handle,
                label: marker.label().map(str::to_string),
                position: Some(marker.position()),
            },
        );
    }
}

impl Default for OverlayManager {
    fn default() -> Self {
        Self::new()
    }
}
