//! Capability traits for the external collaborators
//!
//! The engine never talks to a concrete mapping SDK. Hosts implement these
//! traits over whatever runtime they embed; `headless` provides an in-memory
//! implementation.

use crate::{
    core::{
        geo::{LatLng, LatLngBounds},
        route::{RoutePath, RouteRequest},
    },
    layers::base::{LayerKind, MarkerStyle, SurfaceHandle},
    view::camera::Camera,
    Result, RoutingError,
};
use async_trait::async_trait;
use std::sync::Arc;

/// The loadable asset that brings a mapping runtime into the process
#[async_trait]
pub trait RuntimeAsset: Send + Sync {
    /// Human readable name used in logs
    fn name(&self) -> &str;

    /// Loads the asset. `Ok(None)` means the load completed but the runtime
    /// capability object never materialized.
    async fn load(&self) -> std::result::Result<Option<Arc<dyn MapRuntime>>, String>;
}

/// A loaded mapping runtime
#[async_trait]
pub trait MapRuntime: Send + Sync {
    /// Create a map surface inside the given container
    fn create_map(&self, container: &str, center: LatLng, zoom: f64) -> Result<Box<dyn MapSurface>>;

    /// Plan a route through the runtime's routing service. Calls cannot be
    /// cancelled once issued.
    async fn plan_route(&self, request: RouteRequest) -> std::result::Result<RoutePath, RoutingError>;
}

/// A live map surface. Every mutation goes through here.
pub trait MapSurface: Send {
    fn create_marker(&mut self, position: LatLng, style: &MarkerStyle) -> SurfaceHandle;

    fn create_polyline(&mut self, path: &[LatLng]) -> SurfaceHandle;

    /// Create a layer object; it starts detached
    fn create_layer(&mut self, kind: LayerKind, z_index: i32) -> SurfaceHandle;

    /// Show a previously created overlay on the map
    fn attach(&mut self, handle: SurfaceHandle);

    /// Hide an overlay without destroying it
    fn detach(&mut self, handle: SurfaceHandle);

    /// Destroy an overlay
    fn remove(&mut self, handle: SurfaceHandle);

    fn set_center(&mut self, center: LatLng);

    fn set_zoom(&mut self, zoom: f64);

    fn fit_bounds(&mut self, bounds: &LatLngBounds);

    fn camera(&self) -> Camera;

    /// Re-measure the container after a size change
    fn resize(&mut self) {}
}

/// Source of the user's current position
#[async_trait]
pub trait Geolocation: Send + Sync {
    async fn current_position(&self) -> Result<LatLng>;
}
