//! Headless in-memory runtime
//!
//! Implements the capability traits without any rendering. Every surface
//! mutation is recorded, and routing responses can be scripted with a
//! latency, which makes it the runtime of choice for tests, demos and
//! server-side dry runs.

use crate::{
    core::{
        geo::{LatLng, LatLngBounds, Point},
        route::{RoutePath, RouteRequest},
    },
    layers::base::{LayerKind, MarkerRole, MarkerStyle, SurfaceHandle},
    traits::{MapRuntime, MapSurface, RuntimeAsset},
    view::camera::Camera,
    Result, RoutingError,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Latency of unscripted routing calls
const DEFAULT_ROUTE_LATENCY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceObject {
    Marker {
        position: LatLng,
        style: MarkerStyle,
    },
    Polyline {
        points: Vec<LatLng>,
    },
    Layer {
        kind: LayerKind,
        z_index: i32,
        attached: bool,
    },
}

/// One recorded surface call
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    Create(SurfaceHandle),
    Attach(SurfaceHandle),
    Detach(SurfaceHandle),
    Remove(SurfaceHandle),
    SetCenter(LatLng),
    SetZoom(f64),
    FitBounds(LatLngBounds),
    Resize,
}

#[derive(Debug)]
struct SurfaceState {
    container: String,
    camera: Camera,
    size: Point,
    next_handle: u64,
    objects: BTreeMap<SurfaceHandle, SurfaceObject>,
    ops: Vec<SurfaceOp>,
    layers_created: usize,
    /// Highest number of route markers ever live at the same time
    peak_route_markers: usize,
}

impl SurfaceState {
    fn handle(&mut self) -> SurfaceHandle {
        self.next_handle += 1;
        SurfaceHandle(self.next_handle)
    }

    fn route_markers(&self) -> usize {
        self.objects
            .values()
            .filter(|o| {
                matches!(
                    o,
                    SurfaceObject::Marker { style, .. }
                        if matches!(style.role, MarkerRole::Waypoint | MarkerRole::Annotation)
                )
            })
            .count()
    }
}

/// A map surface that only keeps books. Clones share the same state.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl HeadlessSurface {
    pub fn new(center: LatLng, zoom: f64) -> Self {
        Self::with_size("map", center, zoom, Point::new(1200.0, 800.0))
    }

    pub fn with_size(container: &str, center: LatLng, zoom: f64, size: Point) -> Self {
        Self {
            state: Arc::new(Mutex::new(SurfaceState {
                container: container.to_string(),
                camera: Camera::new(center, zoom),
                size,
                next_handle: 0,
                objects: BTreeMap::new(),
                ops: Vec::new(),
                layers_created: 0,
                peak_route_markers: 0,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn container(&self) -> String {
        self.state().container.clone()
    }

    /// Markers currently on the map, in creation order
    pub fn live_markers(&self) -> Vec<(LatLng, MarkerStyle)> {
        self.state()
            .objects
            .values()
            .filter_map(|o| match o {
                SurfaceObject::Marker { position, style } => Some((*position, style.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn live_polylines(&self) -> Vec<Vec<LatLng>> {
        self.state()
            .objects
            .values()
            .filter_map(|o| match o {
                SurfaceObject::Polyline { points } => Some(points.clone()),
                _ => None,
            })
            .collect()
    }

    /// Layers currently attached to the map
    pub fn attached_layers(&self) -> Vec<LayerKind> {
        self.state()
            .objects
            .values()
            .filter_map(|o| match o {
                SurfaceObject::Layer {
                    kind,
                    attached: true,
                    ..
                } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    /// Objects that exist on the surface, attached or not
    pub fn live_count(&self) -> usize {
        self.state().objects.len()
    }

    pub fn layers_created(&self) -> usize {
        self.state().layers_created
    }

    pub fn peak_route_markers(&self) -> usize {
        self.state().peak_route_markers
    }

    pub fn ops(&self) -> Vec<SurfaceOp> {
        self.state().ops.clone()
    }

    /// Number of camera moves (center, zoom or fit) recorded so far
    pub fn camera_moves(&self) -> usize {
        self.state()
            .ops
            .iter()
            .filter(|op| {
                matches!(
                    op,
                    SurfaceOp::SetCenter(_) | SurfaceOp::SetZoom(_) | SurfaceOp::FitBounds(_)
                )
            })
            .count()
    }

    fn insert(&self, object: SurfaceObject) -> SurfaceHandle {
        let mut state = self.state();
        let handle = state.handle();
        if matches!(object, SurfaceObject::Layer { .. }) {
            state.layers_created += 1;
        }
        state.objects.insert(handle, object);
        state.ops.push(SurfaceOp::Create(handle));
        let live = state.route_markers();
        state.peak_route_markers = state.peak_route_markers.max(live);
        handle
    }

    fn set_attached(&self, handle: SurfaceHandle, value: bool) {
        let mut state = self.state();
        if let Some(SurfaceObject::Layer { attached, .. }) = state.objects.get_mut(&handle) {
            *attached = value;
        }
        state.ops.push(if value {
            SurfaceOp::Attach(handle)
        } else {
            SurfaceOp::Detach(handle)
        });
    }
}

impl MapSurface for HeadlessSurface {
    fn create_marker(&mut self, position: LatLng, style: &MarkerStyle) -> SurfaceHandle {
        self.insert(SurfaceObject::Marker {
            position,
            style: style.clone(),
        })
    }

    fn create_polyline(&mut self, path: &[LatLng]) -> SurfaceHandle {
        self.insert(SurfaceObject::Polyline {
            points: path.to_vec(),
        })
    }

    fn create_layer(&mut self, kind: LayerKind, z_index: i32) -> SurfaceHandle {
        self.insert(SurfaceObject::Layer {
            kind,
            z_index,
            attached: false,
        })
    }

    fn attach(&mut self, handle: SurfaceHandle) {
        self.set_attached(handle, true);
    }

    fn detach(&mut self, handle: SurfaceHandle) {
        self.set_attached(handle, false);
    }

    fn remove(&mut self, handle: SurfaceHandle) {
        let mut state = self.state();
        state.objects.remove(&handle);
        state.ops.push(SurfaceOp::Remove(handle));
    }

    fn set_center(&mut self, center: LatLng) {
        let mut state = self.state();
        state.camera = Camera::new(center, state.camera.zoom);
        state.ops.push(SurfaceOp::SetCenter(center));
    }

    fn set_zoom(&mut self, zoom: f64) {
        let mut state = self.state();
        state.camera = Camera::new(state.camera.center, zoom);
        state.ops.push(SurfaceOp::SetZoom(zoom));
    }

    fn fit_bounds(&mut self, bounds: &LatLngBounds) {
        let mut state = self.state();
        state.camera = Camera::fit(bounds, state.size);
        state.ops.push(SurfaceOp::FitBounds(bounds.clone()));
    }

    fn camera(&self) -> Camera {
        self.state().camera
    }

    fn resize(&mut self) {
        self.state().ops.push(SurfaceOp::Resize);
    }
}

type ScriptedRoute = (Duration, std::result::Result<RoutePath, RoutingError>);

struct RuntimeState {
    size: Point,
    surfaces: Mutex<Vec<HeadlessSurface>>,
    requests: Mutex<Vec<RouteRequest>>,
    script: Mutex<VecDeque<ScriptedRoute>>,
}

/// In-memory map runtime. Clones share the same state.
#[derive(Clone)]
pub struct HeadlessRuntime {
    inner: Arc<RuntimeState>,
}

impl HeadlessRuntime {
    pub fn new() -> Self {
        Self::with_size(Point::new(1200.0, 800.0))
    }

    /// Runtime whose surfaces measure `size` pixels
    pub fn with_size(size: Point) -> Self {
        Self {
            inner: Arc::new(RuntimeState {
                size,
                surfaces: Mutex::new(Vec::new()),
                requests: Mutex::new(Vec::new()),
                script: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Queues the outcome of the next unanswered routing call
    pub fn push_response(
        &self,
        latency: Duration,
        result: std::result::Result<RoutePath, RoutingError>,
    ) {
        lock(&self.inner.script).push_back((latency, result));
    }

    /// Every routing request received, in call order
    pub fn requests(&self) -> Vec<RouteRequest> {
        lock(&self.inner.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.inner.requests).len()
    }

    /// The most recently created surface
    pub fn surface(&self) -> Option<HeadlessSurface> {
        lock(&self.inner.surfaces).last().cloned()
    }

    /// Path through origin, via points and destination, in order
    pub fn straight_line(request: &RouteRequest) -> RoutePath {
        let mut points = Vec::with_capacity(request.waypoints.len() + 2);
        points.push(request.origin);
        points.extend(request.waypoints.iter().copied());
        points.push(request.destination);
        RoutePath::new(points)
    }
}

#[async_trait]
impl MapRuntime for HeadlessRuntime {
    fn create_map(&self, container: &str, center: LatLng, zoom: f64) -> Result<Box<dyn MapSurface>> {
        let surface = HeadlessSurface::with_size(container, center, zoom, self.inner.size);
        lock(&self.inner.surfaces).push(surface.clone());
        Ok(Box::new(surface))
    }

    async fn plan_route(&self, request: RouteRequest) -> std::result::Result<RoutePath, RoutingError> {
        lock(&self.inner.requests).push(request.clone());
        let scripted = lock(&self.inner.script).pop_front();
        let (latency, result) =
            scripted.unwrap_or_else(|| (DEFAULT_ROUTE_LATENCY, Ok(Self::straight_line(&request))));
        tokio::time::sleep(latency).await;
        result
    }
}

/// Runtime asset backed by a headless runtime, with optional load latency
/// and failure modes
pub struct HeadlessAsset {
    runtime: Option<Arc<dyn MapRuntime>>,
    failure: Option<String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl HeadlessAsset {
    pub fn new(runtime: HeadlessRuntime) -> Self {
        Self {
            runtime: Some(Arc::new(runtime)),
            failure: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Loads fine but never exposes a runtime
    pub fn missing_capability() -> Self {
        Self {
            runtime: None,
            failure: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            runtime: None,
            failure: Some(message.into()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn load_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuntimeAsset for HeadlessAsset {
    fn name(&self) -> &str {
        "headless"
    }

    async fn load(&self) -> std::result::Result<Option<Arc<dyn MapRuntime>>, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.failure {
            Some(message) => Err(message.clone()),
            None => Ok(self.runtime.clone()),
        }
    }
}

impl Default for HeadlessRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
