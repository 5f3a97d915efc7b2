use serde::{Deserialize, Serialize};

/// Opaque handle to an object living on the map surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceHandle(pub u64);

/// Logical identity of a drawn overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OverlayId {
    /// Marker for the i-th point of the committed route
    Waypoint(usize),
    /// Default-center marker shown when there is no route
    CenterMarker,
    UserLocation,
    RoutePath,
    TrafficLayer,
}

impl OverlayId {
    pub fn is_route_marker(&self) -> bool {
        matches!(self, OverlayId::Waypoint(_))
    }
}

impl std::fmt::Display for OverlayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayId::Waypoint(index) => write!(f, "waypoint-{}", index),
            OverlayId::CenterMarker => write!(f, "center"),
            OverlayId::UserLocation => write!(f, "user-location"),
            OverlayId::RoutePath => write!(f, "route-path"),
            OverlayId::TrafficLayer => write!(f, "traffic"),
        }
    }
}

/// Layer objects a runtime can create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    Traffic,
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerKind::Traffic => write!(f, "traffic"),
        }
    }
}

/// What a marker stands for, so runtimes can pick an icon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerRole {
    Waypoint,
    Annotation,
    Center,
    UserLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub role: MarkerRole,
    /// Text rendered next to the marker
    pub label: Option<String>,
    /// Hover title
    pub title: Option<String>,
}

impl MarkerStyle {
    pub fn new(role: MarkerRole) -> Self {
        Self {
            role,
            label: None,
            title: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_id_display() {
        assert_eq!(OverlayId::Waypoint(2).to_string(), "waypoint-2");
        assert_eq!(OverlayId::UserLocation.to_string(), "user-location");
        assert_eq!(OverlayId::TrafficLayer.to_string(), "traffic");
        assert!(OverlayId::Waypoint(0).is_route_marker());
        assert!(!OverlayId::RoutePath.is_route_marker());
    }

    #[test]
    fn test_marker_style_builder() {
        let style = MarkerStyle::new(MarkerRole::UserLocation).with_title("My location");
        assert_eq!(style.role, MarkerRole::UserLocation);
        assert_eq!(style.title.as_deref(), Some("My location"));
        assert!(style.label.is_none());
    }
}
