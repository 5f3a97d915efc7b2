//! Prelude module for common routelet types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use routelet::prelude::*;`

pub use crate::core::{
    config::{FocusConfig, RoutingConfig, SessionOptions, SessionProfile, ViewConfig},
    geo::{LatLng, LatLngBounds, Point},
    route::{
        PointKind, RoutePath, RoutePoint, RoutePoints, RouteRequest, RouteSignature, TravelMode,
    },
};

pub use crate::layers::{
    base::{LayerKind, MarkerRole, MarkerStyle, OverlayId, SurfaceHandle},
    manager::{OverlayManager, OverlaySummary},
    marker::Marker,
};

pub use crate::routing::coordinator::{
    CoordinatorStats, InputDecision, ResponseOutcome, RouteCoordinator, RouteFailure, RouteState,
};

pub use crate::view::{
    camera::Camera,
    focus::{FocusLock, FocusOwner, ViewFocusArbiter},
};

pub use crate::session::{MapSession, MapSessionBuilder, SessionEvent, SessionSnapshot};

pub use crate::generator::{RouteGenerator, RoutePlan};

#[cfg(feature = "http")]
pub use crate::generator::HttpRouteGenerator;

pub use crate::runtime::{runtime, spawn, AsyncHandle, AsyncSpawner};

pub use crate::sdk::SdkLoader;

pub use crate::traits::{Geolocation, MapRuntime, MapSurface, RuntimeAsset};

pub use crate::{MapError, Result, RoutingError, RuntimeLoadError};

pub use std::{
    pin::Pin,
    sync::Arc,
    time::Duration,
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use futures::Future;
