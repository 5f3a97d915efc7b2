//! Map session lifecycle
//!
//! A [`MapSession`] is a cheap handle onto a loop task that owns one map
//! surface. Inputs are fire-and-forget commands; results come back as
//! [`SessionEvent`]s and through [`MapSession::snapshot`].

pub mod builder;
pub mod event;
mod worker;

pub use builder::MapSessionBuilder;
pub use event::{SessionEvent, SessionSnapshot};

use crate::{
    core::{
        geo::LatLng,
        route::{RoutePoints, TravelMode},
    },
    runtime::AsyncHandle,
    traits::Geolocation,
    MapError, Result,
};
use crossbeam_channel::{Receiver, Sender};
use tokio::sync::{mpsc, oneshot};
use worker::Command;

pub struct MapSession {
    commands: mpsc::UnboundedSender<Command>,
    events: Receiver<SessionEvent>,
    /// Kept for events raised on this side of the loop
    event_tx: Sender<SessionEvent>,
    task: Box<dyn AsyncHandle>,
}

impl MapSession {
    pub fn builder() -> MapSessionBuilder {
        MapSessionBuilder::new()
    }

    /// Replaces the route points
    pub fn set_route(&self, points: impl Into<RoutePoints>) -> Result<()> {
        self.send(Command::Update {
            mode: None,
            points: Some(points.into()),
        })
    }

    pub fn set_travel_mode(&self, mode: TravelMode) -> Result<()> {
        self.send(Command::Update {
            mode: Some(mode),
            points: None,
        })
    }

    /// Changes mode and points as one input
    pub fn update(&self, mode: TravelMode, points: impl Into<RoutePoints>) -> Result<()> {
        self.send(Command::Update {
            mode: Some(mode),
            points: Some(points.into()),
        })
    }

    /// Jumps to `position` and shows the user marker there; `None` clears it
    pub fn set_location_override(&self, position: Option<LatLng>) -> Result<()> {
        self.send(Command::SetLocationOverride(position))
    }

    pub fn set_traffic(&self, on: bool) -> Result<()> {
        self.send(Command::SetTraffic(on))
    }

    /// Tells the surface its container changed size
    pub fn resize(&self) -> Result<()> {
        self.send(Command::Resize)
    }

    /// Asks `geolocation` for the current position and jumps there. On
    /// failure the view is left alone and `LocationFailed` is emitted.
    pub async fn locate(&self, geolocation: &dyn Geolocation) -> Result<LatLng> {
        match geolocation.current_position().await {
            Ok(position) => {
                self.set_location_override(Some(position))?;
                Ok(position)
            }
            Err(e) => {
                log::warn!("locating the user failed: {}", e);
                let _ = self.event_tx.send(SessionEvent::LocationFailed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Leaves the user location and looks at the route again, or at the
    /// default center when there is none
    pub fn recenter(&self) -> Result<()> {
        self.send(Command::Recenter)
    }

    /// Drains the events emitted so far without waiting
    pub fn try_recv_events(&self) -> Vec<SessionEvent> {
        self.events.try_iter().collect()
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx))?;
        rx.await.map_err(|_| MapError::SessionClosed)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops the loop and removes everything drawn. Routing calls still in
    /// flight finish on their own and their results are dropped. Every
    /// later call fails with `SessionClosed`.
    pub async fn unmount(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Unmount(tx))?;
        rx.await.map_err(|_| MapError::SessionClosed)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| MapError::SessionClosed)
    }
}
