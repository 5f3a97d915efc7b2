//! Route data model shared by the coordinator, the overlay manager and the
//! external collaborators.

use crate::core::geo::{lng_lat, LatLng, LatLngBounds};
use geo::HaversineLength;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How the route is travelled; selects the routing service profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Riding,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Walking => "walking",
            TravelMode::Riding => "riding",
        }
    }
}

impl std::fmt::Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that is not walking or riding is planned as a drive.
impl From<&str> for TravelMode {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "walking" => TravelMode::Walking,
            "riding" => TravelMode::Riding,
            _ => TravelMode::Driving,
        }
    }
}

impl From<String> for TravelMode {
    fn from(value: String) -> Self {
        TravelMode::from(value.as_str())
    }
}

impl From<TravelMode> for String {
    fn from(value: TravelMode) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    /// A stop the route passes through, in order
    #[default]
    Waypoint,
    /// Decorative point drawn on the map but never routed through
    Annotation,
}

/// A single stop of a generated route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    #[serde(default)]
    pub name: String,
    #[serde(with = "lng_lat")]
    pub position: LatLng,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub kind: PointKind,
}

impl RoutePoint {
    pub fn new(name: impl Into<String>, position: LatLng) -> Self {
        Self {
            name: name.into(),
            position,
            reason: String::new(),
            kind: PointKind::Waypoint,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn annotation(mut self) -> Self {
        self.kind = PointKind::Annotation;
        self
    }

    pub fn is_waypoint(&self) -> bool {
        self.kind == PointKind::Waypoint
    }

    /// Marker label, falling back to the 1-based position in the list
    pub fn label(&self, index: usize) -> String {
        if self.name.trim().is_empty() {
            format!("{} {}", crate::core::constants::POINT_LABEL_PREFIX, index + 1)
        } else {
            self.name.clone()
        }
    }
}

/// An immutable version of the route point list. A change is always a new
/// list, never an in-place mutation.
pub type RoutePoints = Arc<[RoutePoint]>;

/// Identity of a route request: travel mode plus ordered waypoint positions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteSignature(String);

impl RouteSignature {
    pub fn compute(mode: TravelMode, points: &[RoutePoint]) -> Self {
        let positions = points
            .iter()
            .filter(|p| p.is_waypoint())
            .map(|p| p.position.signature_key())
            .collect::<Vec<_>>()
            .join("|");
        Self(format!("{}-{}", mode, positions))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RouteSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request handed to the routing service
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    /// Sequence number, unique per coordinator
    pub id: u64,
    pub signature: RouteSignature,
    pub mode: TravelMode,
    pub origin: LatLng,
    pub destination: LatLng,
    pub waypoints: Vec<LatLng>,
}

impl RouteRequest {
    /// Builds a request from an ordered waypoint list: first point is the
    /// origin, last the destination, everything between is a via point.
    /// Returns `None` when fewer than two waypoints are present.
    pub fn from_points(id: u64, mode: TravelMode, points: &[RoutePoint]) -> Option<Self> {
        let stops: Vec<LatLng> = points
            .iter()
            .filter(|p| p.is_waypoint())
            .map(|p| p.position)
            .collect();
        if stops.len() < 2 {
            return None;
        }
        Some(Self {
            id,
            signature: RouteSignature::compute(mode, points),
            mode,
            origin: stops[0],
            destination: stops[stops.len() - 1],
            waypoints: stops[1..stops.len() - 1].to_vec(),
        })
    }
}

/// Path geometry returned by the routing service
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoutePath {
    pub points: Vec<LatLng>,
    /// Distance reported by the service, in meters
    pub distance_m: Option<f64>,
    /// Travel time reported by the service, in seconds
    pub duration_s: Option<f64>,
}

impl RoutePath {
    pub fn new(points: Vec<LatLng>) -> Self {
        Self {
            points,
            distance_m: None,
            duration_s: None,
        }
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        LatLngBounds::from_points(&self.points)
    }

    /// Service distance when known, otherwise the haversine length of the
    /// polyline
    pub fn length_m(&self) -> f64 {
        if let Some(distance) = self.distance_m {
            return distance;
        }
        let line: geo_types::LineString<f64> = self
            .points
            .iter()
            .map(|p| geo_types::Coord::from(*p))
            .collect::<Vec<_>>()
            .into();
        line.haversine_length()
    }
}
