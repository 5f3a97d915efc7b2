//! # routelet
//!
//! An async map-session engine for computer-generated multi-stop routes.
//!
//! The engine owns the lifecycle of one map surface and keeps three things
//! consistent while inputs arrive asynchronously: the drawn overlays (route
//! markers, path, user marker, traffic layer), the in-flight requests made
//! against an external routing service, and the camera. Rendering, routing
//! and geolocation are capability traits implemented by the host.

pub mod core;
pub mod generator;
pub mod headless;
pub mod layers;
pub mod prelude;
pub mod routing;
pub mod runtime;
pub mod sdk;
pub mod session;
pub mod traits;
pub mod view;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{SessionOptions, SessionProfile},
    geo::{LatLng, LatLngBounds},
    route::{PointKind, RoutePath, RoutePoint, RouteRequest, RouteSignature, TravelMode},
};

pub use layers::{base::OverlayId, manager::OverlayManager};

pub use routing::coordinator::{RouteCoordinator, RouteState};

pub use view::{camera::Camera, focus::ViewFocusArbiter};

pub use sdk::SdkLoader;

pub use session::{MapSession, MapSessionBuilder, SessionEvent, SessionSnapshot};

pub use generator::{RouteGenerator, RoutePlan};

pub use traits::{Geolocation, MapRuntime, MapSurface, RuntimeAsset};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Why the mapping runtime could not be brought up. Fatal to a session and
/// never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeLoadError {
    #[error("map runtime asset failed to load: {0}")]
    Asset(String),

    #[error("map runtime loaded but exposed no capability object")]
    CapabilityMissing,
}

/// Failure reported by the external routing service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("routing quota exceeded: {0}")]
    RateLimited(String),

    #[error("routing failed: {0}")]
    Failed(String),
}

impl RoutingError {
    /// Classifies a service message, recognising the quota markers routing
    /// providers put in their error info
    pub fn classify(info: impl Into<String>) -> Self {
        let info = info.into();
        if constants::RATE_LIMIT_MARKERS
            .iter()
            .any(|marker| info.contains(marker))
        {
            RoutingError::RateLimited(info)
        } else {
            RoutingError::Failed(info)
        }
    }

    /// Classifies an HTTP failure; 429 is always a rate limit
    pub fn from_status(status: u16, info: impl Into<String>) -> Self {
        if status == 429 {
            RoutingError::RateLimited(info.into())
        } else {
            Self::classify(info)
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RoutingError::RateLimited(_))
    }

    pub fn info(&self) -> &str {
        match self {
            RoutingError::RateLimited(info) | RoutingError::Failed(info) => info,
        }
    }
}

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error(transparent)]
    RuntimeLoad(#[from] RuntimeLoadError),

    #[error("route {signature} rate limited: {info}")]
    RateLimited { signature: String, info: String },

    #[error("route {signature} failed: {info}")]
    RoutingFailed { signature: String, info: String },

    #[error("stale response for route {signature} discarded")]
    StaleResponseDiscarded { signature: String },

    #[error("map session is closed")]
    SessionClosed,

    #[error("Surface error: {0}")]
    Surface(String),

    #[error("Geolocation error: {0}")]
    Geolocation(String),

    #[error("Route generator error: {0}")]
    Generator(String),

    #[error("Invalid route plan: {0}")]
    InvalidPlan(String),

    #[cfg(feature = "http")]
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Error type alias for convenience
pub type Error = MapError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_error_classification() {
        let limited = RoutingError::classify("CUQPS_HAS_EXCEEDED_THE_LIMIT");
        assert!(limited.is_rate_limited());
        assert!(RoutingError::from_status(429, "Too Many Requests").is_rate_limited());

        let other = RoutingError::classify("NO_DATA");
        assert!(!other.is_rate_limited());
        assert_eq!(other.info(), "NO_DATA");
    }

    #[test]
    fn test_runtime_load_error_converts() {
        let err: MapError = RuntimeLoadError::CapabilityMissing.into();
        assert!(matches!(err, MapError::RuntimeLoad(RuntimeLoadError::CapabilityMissing)));
    }
}
