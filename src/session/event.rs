use crate::{
    core::{
        geo::LatLng,
        route::{RouteSignature, TravelMode},
    },
    layers::manager::OverlaySummary,
    routing::coordinator::{CoordinatorStats, RouteFailure, RouteState},
    view::camera::Camera,
    MapError,
};

/// Things the host may want to react to, delivered in order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The map surface exists and shows the initial view
    Ready { camera: Camera },
    RouteCommitted {
        signature: RouteSignature,
        mode: TravelMode,
        waypoints: usize,
        distance_m: f64,
    },
    /// The routing quota is exhausted; the previous route stays on screen
    RateLimited {
        signature: RouteSignature,
        info: String,
    },
    RoutingFailed {
        signature: RouteSignature,
        info: String,
    },
    LocationFailed { reason: String },
    Unmounted,
}

impl SessionEvent {
    /// The user-visible error carried by this event, if any
    pub fn error(&self) -> Option<MapError> {
        match self {
            SessionEvent::RateLimited { signature, info } => {
                Some(RouteFailure::RateLimited.into_error(signature, info.clone()))
            }
            SessionEvent::RoutingFailed { signature, info } => {
                Some(RouteFailure::RoutingFailed.into_error(signature, info.clone()))
            }
            SessionEvent::LocationFailed { reason } => Some(MapError::Geolocation(reason.clone())),
            _ => None,
        }
    }
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub route_state: RouteState,
    pub travel_mode: TravelMode,
    /// Signature of the routed path currently drawn. `None` while only
    /// bare points or the center marker are shown.
    pub committed: Option<RouteSignature>,
    pub overlays: OverlaySummary,
    pub camera: Camera,
    pub location_override: Option<LatLng>,
    pub focus_locked: bool,
    pub stats: CoordinatorStats,
}
