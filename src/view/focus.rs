//! Camera ownership arbitration
//!
//! Both a user relocation and a route commit finish asynchronously and both
//! want to move the camera. The arbiter is the only component allowed to
//! move it, and an explicit relocation holds a [`FocusLock`] for a settle
//! window during which incidental route fits are refused.

use crate::{
    core::{
        config::FocusConfig,
        geo::{LatLng, LatLngBounds},
    },
    traits::MapSurface,
};
use tokio::time::Instant;

/// Who currently owns the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOwner {
    /// An explicit jump to the user's location
    Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FocusLock {
    pub held_by: FocusOwner,
    pub target: LatLng,
    pub zoom: f64,
    pub expires_at: Instant,
    /// Checkpoint at which the target is applied once more; cleared after use
    pub reaffirm_at: Option<Instant>,
}

pub struct ViewFocusArbiter {
    config: FocusConfig,
    lock: Option<FocusLock>,
}

impl ViewFocusArbiter {
    pub fn new(config: FocusConfig) -> Self {
        Self { config, lock: None }
    }

    /// Centers on `position` at the locate zoom and holds the camera for the
    /// settle window
    pub fn request_location_focus(
        &mut self,
        surface: &mut dyn MapSurface,
        position: LatLng,
        now: Instant,
    ) {
        let zoom = self.config.locate_zoom;
        surface.set_zoom(zoom);
        surface.set_center(position);

        self.lock = Some(FocusLock {
            held_by: FocusOwner::Location,
            target: position,
            zoom,
            expires_at: now + self.config.settle_window(),
            reaffirm_at: Some(now + self.config.reaffirm_after()),
        });
        log::debug!(
            "focus locked on {:?} until +{} ms",
            position,
            self.config.settle_window_ms
        );
    }

    /// Fits the camera to `bounds` unless a lock is held. Returns whether the
    /// camera moved.
    pub fn request_route_focus(
        &mut self,
        surface: &mut dyn MapSurface,
        bounds: &LatLngBounds,
        now: Instant,
    ) -> bool {
        self.expire(now);
        if let Some(lock) = &self.lock {
            log::debug!("route fit suppressed, camera held by {:?}", lock.held_by);
            return false;
        }
        surface.fit_bounds(bounds);
        true
    }

    /// Moves the camera to `center` at `zoom` unless a lock is held
    pub fn request_center_focus(
        &mut self,
        surface: &mut dyn MapSurface,
        center: LatLng,
        zoom: f64,
        now: Instant,
    ) -> bool {
        self.expire(now);
        if self.lock.is_some() {
            return false;
        }
        surface.set_zoom(zoom);
        surface.set_center(center);
        true
    }

    /// Applies a due reaffirm checkpoint and drops an expired lock
    pub fn poll(&mut self, surface: &mut dyn MapSurface, now: Instant) {
        if let Some(lock) = self.lock.as_mut() {
            if lock.reaffirm_at.is_some_and(|at| at <= now) && now < lock.expires_at {
                surface.set_zoom(lock.zoom);
                surface.set_center(lock.target);
                lock.reaffirm_at = None;
            }
        }
        self.expire(now);
    }

    /// Drops the lock immediately
    pub fn release(&mut self) {
        if self.lock.take().is_some() {
            log::debug!("focus lock released");
        }
    }

    pub fn is_locked(&self, now: Instant) -> bool {
        self.lock.as_ref().is_some_and(|lock| now < lock.expires_at)
    }

    pub fn lock(&self) -> Option<&FocusLock> {
        self.lock.as_ref()
    }

    /// Earliest instant at which `poll` has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.lock.as_ref().map(|lock| match lock.reaffirm_at {
            Some(at) => at.min(lock.expires_at),
            None => lock.expires_at,
        })
    }

    fn expire(&mut self, now: Instant) {
        if self.lock.as_ref().is_some_and(|lock| now >= lock.expires_at) {
            self.lock = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessSurface;
    use std::time::Duration;

    fn arbiter() -> ViewFocusArbiter {
        ViewFocusArbiter::new(FocusConfig::default())
    }

    fn surface() -> HeadlessSurface {
        HeadlessSurface::new(LatLng::new(39.90923, 116.397428), 11.0)
    }

    fn route_bounds() -> LatLngBounds {
        LatLngBounds::from_coords(39.90, 116.40, 39.95, 116.50)
    }

    #[test]
    fn test_location_focus_beats_route_fit_inside_window() {
        let mut surface = surface();
        let mut arbiter = arbiter();
        let start = Instant::now();
        let me = LatLng::new(31.23, 121.47);

        arbiter.request_location_focus(&mut surface, me, start);
        let moved = arbiter.request_route_focus(
            &mut surface,
            &route_bounds(),
            start + Duration::from_millis(100),
        );

        assert!(!moved);
        assert!(surface.camera().is_at(me, 15.0));
    }

    #[test]
    fn test_route_fit_succeeds_after_window() {
        let mut surface = surface();
        let mut arbiter = arbiter();
        let start = Instant::now();

        arbiter.request_location_focus(&mut surface, LatLng::new(31.23, 121.47), start);
        let moved = arbiter.request_route_focus(
            &mut surface,
            &route_bounds(),
            start + Duration::from_millis(800),
        );

        assert!(moved);
        assert_eq!(surface.camera().center, route_bounds().center());
        assert!(arbiter.lock().is_none());
    }

    #[test]
    fn test_reaffirm_restores_target_once() {
        let mut surface = surface();
        let mut arbiter = arbiter();
        let start = Instant::now();
        let me = LatLng::new(31.23, 121.47);

        arbiter.request_location_focus(&mut surface, me, start);
        assert_eq!(arbiter.next_deadline(), Some(start + Duration::from_millis(200)));

        // something outside the arbiter pans the map
        surface.set_center(LatLng::new(0.0, 0.0));
        arbiter.poll(&mut surface, start + Duration::from_millis(200));

        assert!(surface.camera().is_at(me, 15.0));
        assert_eq!(arbiter.next_deadline(), Some(start + Duration::from_millis(800)));

        arbiter.poll(&mut surface, start + Duration::from_millis(800));
        assert!(arbiter.next_deadline().is_none());
        assert!(!arbiter.is_locked(start + Duration::from_millis(800)));
    }

    #[test]
    fn test_release_unlocks_immediately() {
        let mut surface = surface();
        let mut arbiter = arbiter();
        let start = Instant::now();

        arbiter.request_location_focus(&mut surface, LatLng::new(31.23, 121.47), start);
        arbiter.release();

        assert!(arbiter.request_route_focus(&mut surface, &route_bounds(), start));
    }

    #[test]
    fn test_center_focus_respects_lock() {
        let mut surface = surface();
        let mut arbiter = arbiter();
        let start = Instant::now();
        let me = LatLng::new(31.23, 121.47);

        arbiter.request_location_focus(&mut surface, me, start);
        assert!(!arbiter.request_center_focus(&mut surface, LatLng::new(0.0, 0.0), 11.0, start));
        assert!(surface.camera().is_at(me, 15.0));

        let later = start + Duration::from_secs(1);
        assert!(arbiter.request_center_focus(&mut surface, LatLng::new(0.0, 0.0), 11.0, later));
        assert!(surface.camera().is_at(LatLng::new(0.0, 0.0), 11.0));
    }
}
