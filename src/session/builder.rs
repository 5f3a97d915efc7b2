//! Session builder for fluent configuration
//!
//! Collects the profile, view overrides and initial inputs, then mounts the
//! session once the map runtime is ready.

use crate::{
    core::{
        config::{SessionOptions, SessionProfile},
        geo::LatLng,
        route::{RoutePoints, TravelMode},
    },
    runtime,
    sdk::SdkLoader,
    session::{
        worker::{Command, SessionWorker},
        MapSession,
    },
    traits::RuntimeAsset,
    view::camera::Camera,
    Result,
};
use std::sync::Arc;
use tokio::sync::mpsc;

type ReadyCallback = Box<dyn FnOnce(&Camera) + Send>;

/// Builder for mounting [`MapSession`]s
pub struct MapSessionBuilder {
    profile: SessionProfile,
    container: Option<String>,
    center: Option<LatLng>,
    zoom: Option<f64>,
    fit_route_while_located: Option<bool>,
    travel_mode: Option<TravelMode>,
    route: Option<RoutePoints>,
    traffic: bool,
    location_override: Option<LatLng>,
    on_ready: Option<ReadyCallback>,
}

impl MapSessionBuilder {
    pub fn new() -> Self {
        Self {
            profile: SessionProfile::default(),
            container: None,
            center: None,
            zoom: None,
            fit_route_while_located: None,
            travel_mode: None,
            route: None,
            traffic: false,
            location_override: None,
            on_ready: None,
        }
    }

    /// Set the timing profile
    pub fn with_profile(mut self, profile: SessionProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Set custom options, replacing the profile
    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.profile = SessionProfile::Custom(options);
        self
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Set the default center and zoom
    pub fn with_center_and_zoom(mut self, center: LatLng, zoom: f64) -> Self {
        self.center = Some(center);
        self.zoom = Some(zoom);
        self
    }

    pub fn fit_route_while_located(mut self, enabled: bool) -> Self {
        self.fit_route_while_located = Some(enabled);
        self
    }

    pub fn with_travel_mode(mut self, mode: TravelMode) -> Self {
        self.travel_mode = Some(mode);
        self
    }

    /// Route applied as soon as the map is ready
    pub fn with_route(mut self, points: impl Into<RoutePoints>) -> Self {
        self.route = Some(points.into());
        self
    }

    pub fn with_traffic(mut self, on: bool) -> Self {
        self.traffic = on;
        self
    }

    pub fn with_location_override(mut self, position: LatLng) -> Self {
        self.location_override = Some(position);
        self
    }

    /// Called once with the initial camera after the surface is created
    pub fn on_ready(mut self, callback: impl FnOnce(&Camera) + Send + 'static) -> Self {
        self.on_ready = Some(Box::new(callback));
        self
    }

    /// Resolve the profile and apply the view overrides
    pub fn options(&self) -> Result<SessionOptions> {
        let mut options = self.profile.resolve();
        if let Some(container) = &self.container {
            options.view.container = container.clone();
        }
        if let Some(center) = self.center {
            options.view.center = center;
        }
        if let Some(zoom) = self.zoom {
            options.view.zoom = zoom;
        }
        if let Some(enabled) = self.fit_route_while_located {
            options.view.fit_route_while_located = enabled;
        }
        options.validate()?;
        Ok(options)
    }

    /// Waits for the runtime, creates the map surface and starts the
    /// session loop. A runtime that failed to load fails the mount.
    pub async fn mount(
        self,
        loader: &SdkLoader,
        asset: Arc<dyn RuntimeAsset>,
    ) -> Result<MapSession> {
        let options = self.options()?;
        let map_runtime = loader.ensure_ready(asset).await?;
        let surface = map_runtime.create_map(
            &options.view.container,
            options.view.center,
            options.view.zoom,
        )?;
        log::info!(
            "map surface created in '{}' at {:?} z{}",
            options.view.container,
            options.view.center,
            options.view.zoom
        );

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();

        let mut worker = SessionWorker::new(options, map_runtime, surface, event_tx.clone(), response_tx);
        worker.show_initial_view();
        if let Some(callback) = self.on_ready {
            callback(&worker.camera());
        }

        // initial inputs go through the loop like any later change
        if self.traffic {
            let _ = command_tx.send(Command::SetTraffic(true));
        }
        if self.travel_mode.is_some() || self.route.is_some() {
            let _ = command_tx.send(Command::Update {
                mode: self.travel_mode,
                points: self.route,
            });
        }
        if let Some(position) = self.location_override {
            let _ = command_tx.send(Command::SetLocationOverride(Some(position)));
        }

        let task = runtime::spawn(worker.run(command_rx, response_rx));

        Ok(MapSession {
            commands: command_tx,
            events: event_rx,
            event_tx,
            task,
        })
    }
}

impl Default for MapSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience constructors for common setups
impl MapSessionBuilder {
    /// Long debounce, for routing keys with a tight quota
    pub fn quota_friendly() -> Self {
        Self::new().with_profile(SessionProfile::Conservative)
    }

    pub fn responsive() -> Self {
        Self::new().with_profile(SessionProfile::Responsive)
    }
}
