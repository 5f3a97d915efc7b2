//! The session loop
//!
//! One task owns the surface, the overlay set, the coordinator and the
//! arbiter. Commands from the handle, routing responses and timer deadlines
//! are all serialized through a single `select!`, so no two mutations ever
//! interleave.

use crate::{
    core::{
        config::SessionOptions,
        geo::{LatLng, LatLngBounds},
        route::{RoutePath, RoutePoints, RouteSignature, TravelMode},
    },
    layers::manager::OverlayManager,
    routing::coordinator::{
        CommittedRoute, InputDecision, ResponseOutcome, RouteCoordinator, RouteFailure,
    },
    runtime,
    session::event::{SessionEvent, SessionSnapshot},
    traits::{MapRuntime, MapSurface},
    view::focus::ViewFocusArbiter,
    RoutingError,
};
use crossbeam_channel::Sender;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

pub(crate) enum Command {
    Update {
        mode: Option<TravelMode>,
        points: Option<RoutePoints>,
    },
    SetLocationOverride(Option<LatLng>),
    SetTraffic(bool),
    Resize,
    Recenter,
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Unmount(oneshot::Sender<()>),
}

pub(crate) struct RouteResponse {
    id: u64,
    signature: RouteSignature,
    result: std::result::Result<RoutePath, RoutingError>,
}

pub(crate) struct SessionWorker {
    options: SessionOptions,
    runtime: Arc<dyn MapRuntime>,
    surface: Box<dyn MapSurface>,
    overlays: OverlayManager,
    coordinator: RouteCoordinator,
    arbiter: ViewFocusArbiter,
    mode: TravelMode,
    points: RoutePoints,
    location_override: Option<LatLng>,
    /// Bounds of the route or points currently drawn
    shown: Option<LatLngBounds>,
    /// Routed path currently drawn; `None` while only bare points or the
    /// center marker are up
    displayed: Option<(RouteSignature, RoutePoints)>,
    events: Sender<SessionEvent>,
    responses: mpsc::UnboundedSender<RouteResponse>,
}

impl SessionWorker {
    pub(crate) fn new(
        options: SessionOptions,
        runtime: Arc<dyn MapRuntime>,
        surface: Box<dyn MapSurface>,
        events: Sender<SessionEvent>,
        responses: mpsc::UnboundedSender<RouteResponse>,
    ) -> Self {
        Self {
            overlays: OverlayManager::new(),
            coordinator: RouteCoordinator::new(options.routing.clone()),
            arbiter: ViewFocusArbiter::new(options.focus.clone()),
            options,
            runtime,
            surface,
            mode: TravelMode::default(),
            points: RoutePoints::from(Vec::new()),
            location_override: None,
            shown: None,
            displayed: None,
            events,
            responses,
        }
    }

    /// Draws the default center marker on a fresh surface
    pub(crate) fn show_initial_view(&mut self) {
        let center = self.options.view.center;
        self.overlays.draw_center_marker(self.surface.as_mut(), center);
        self.emit(SessionEvent::Ready {
            camera: self.surface.camera(),
        });
    }

    pub(crate) fn camera(&self) -> crate::view::camera::Camera {
        self.surface.camera()
    }

    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut responses: mpsc::UnboundedReceiver<RouteResponse>,
    ) {
        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Unmount(ack)) => {
                        self.teardown();
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.handle(command),
                    None => {
                        // every handle is gone
                        self.teardown();
                        break;
                    }
                },
                Some(response) = responses.recv() => self.on_response(response),
                _ = sleep_until(deadline) => self.on_deadline(),
            }
        }
        log::debug!("session loop stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Update { mode, points } => {
                if let Some(mode) = mode {
                    self.mode = mode;
                }
                if let Some(points) = points {
                    self.points = points;
                }
                self.apply_inputs();
            }
            Command::SetLocationOverride(position) => self.set_location_override(position),
            Command::SetTraffic(on) => {
                self.overlays.set_traffic_layer(self.surface.as_mut(), on);
            }
            Command::Resize => self.surface.resize(),
            Command::Recenter => self.recenter(),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            // handled by the loop
            Command::Unmount(_) => {}
        }
    }

    fn apply_inputs(&mut self) {
        let now = Instant::now();
        match self.coordinator.on_input(self.mode, self.points.clone(), now) {
            InputDecision::Degenerate { points } => self.draw_degenerate(&points, now),
            InputDecision::Reuse(route) => self.commit(&route, now),
            InputDecision::AlreadyRequesting | InputDecision::Debounce { .. } => {}
        }
    }

    /// Fewer than two waypoints: no routing, just the points or the default
    /// center
    fn draw_degenerate(&mut self, points: &RoutePoints, now: Instant) {
        self.displayed = None;
        if points.is_empty() {
            let center = self.options.view.center;
            self.overlays.draw_center_marker(self.surface.as_mut(), center);
            self.shown = None;
            if self.location_override.is_none() {
                self.arbiter.request_center_focus(
                    self.surface.as_mut(),
                    center,
                    self.options.view.zoom,
                    now,
                );
            }
            return;
        }

        self.overlays.commit_route(self.surface.as_mut(), points, None);
        self.shown = LatLngBounds::from_points(points.iter().map(|p| &p.position));
        self.fit_shown(now);
    }

    fn commit(&mut self, route: &CommittedRoute, now: Instant) {
        if let Some((signature, points)) = &self.displayed {
            if *signature == route.signature && *points == route.points {
                log::debug!("route {} already on the map", signature);
                return;
            }
        }
        self.displayed = Some((route.signature.clone(), route.points.clone()));

        self.overlays
            .commit_route(self.surface.as_mut(), &route.points, Some(&route.path));

        let mut bounds = LatLngBounds::from_points(route.points.iter().map(|p| &p.position));
        if let (Some(drawn), Some(path)) = (bounds.as_mut(), route.path.bounds()) {
            *drawn = drawn.union(&path);
        }
        self.shown = bounds;
        self.fit_shown(now);

        self.emit(SessionEvent::RouteCommitted {
            signature: route.signature.clone(),
            mode: route.mode,
            waypoints: route.points.iter().filter(|p| p.is_waypoint()).count(),
            distance_m: route.path.length_m(),
        });
    }

    fn fit_shown(&mut self, now: Instant) {
        if self.location_override.is_some() && !self.options.view.fit_route_while_located {
            log::debug!("route fit skipped, showing the user location");
            return;
        }
        if let Some(bounds) = &self.shown {
            self.arbiter
                .request_route_focus(self.surface.as_mut(), bounds, now);
        }
    }

    fn set_location_override(&mut self, position: Option<LatLng>) {
        self.location_override = position;
        match position {
            Some(position) => {
                self.overlays
                    .draw_user_location(self.surface.as_mut(), position);
                self.arbiter
                    .request_location_focus(self.surface.as_mut(), position, Instant::now());
            }
            None => {
                self.overlays.clear_user_location(self.surface.as_mut());
                self.arbiter.release();
            }
        }
    }

    fn recenter(&mut self) {
        self.set_location_override(None);
        let now = Instant::now();
        if self.shown.is_some() {
            self.fit_shown(now);
        } else {
            self.arbiter.request_center_focus(
                self.surface.as_mut(),
                self.options.view.center,
                self.options.view.zoom,
                now,
            );
        }
    }

    fn on_deadline(&mut self) {
        let now = Instant::now();
        self.arbiter.poll(self.surface.as_mut(), now);
        if let Some(request) = self.coordinator.on_debounce_elapsed(now) {
            log::debug!("requesting route {} (#{})", request.signature, request.id);
            let map_runtime = self.runtime.clone();
            let responses = self.responses.clone();
            runtime::spawn(async move {
                let id = request.id;
                let signature = request.signature.clone();
                let result = map_runtime.plan_route(request).await;
                // the session may be gone; a late result is simply dropped
                let _ = responses.send(RouteResponse {
                    id,
                    signature,
                    result,
                });
            });
        }
    }

    fn on_response(&mut self, response: RouteResponse) {
        let RouteResponse {
            id,
            signature,
            result,
        } = response;
        match self.coordinator.on_response(id, signature, result) {
            ResponseOutcome::Committed(route) => self.commit(&route, Instant::now()),
            ResponseOutcome::Failed {
                signature,
                failure,
                error,
            } => {
                let info = error.info().to_string();
                self.emit(match failure {
                    RouteFailure::RateLimited => SessionEvent::RateLimited { signature, info },
                    RouteFailure::RoutingFailed => SessionEvent::RoutingFailed { signature, info },
                });
            }
            ResponseOutcome::Stale { .. } => {}
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        let now = Instant::now();
        SessionSnapshot {
            route_state: self.coordinator.state().clone(),
            travel_mode: self.mode,
            committed: self.displayed.as_ref().map(|(signature, _)| signature.clone()),
            overlays: self.overlays.summary(),
            camera: self.surface.camera(),
            location_override: self.location_override,
            focus_locked: self.arbiter.is_locked(now),
            stats: self.coordinator.stats(),
        }
    }

    fn teardown(&mut self) {
        self.coordinator.cancel();
        self.arbiter.release();
        self.location_override = None;
        self.shown = None;
        self.displayed = None;
        self.overlays.teardown(self.surface.as_mut());
        self.emit(SessionEvent::Unmounted);
        log::info!("map session unmounted");
    }

    fn next_deadline(&self) -> Option<Instant> {
        match (
            self.coordinator.debounce_deadline(),
            self.arbiter.next_deadline(),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn emit(&self, event: SessionEvent) {
        // nobody listening is fine
        let _ = self.events.send(event);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
