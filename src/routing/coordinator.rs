//! Route request coordination
//!
//! A small explicit state machine that turns a stream of (travel mode, route
//! points) inputs into routing-service requests. It debounces bursts, never
//! asks twice for a route it is already waiting on or already has, and only
//! commits a response if it still answers the most recent input.
//!
//! The coordinator performs no I/O and owns no timers; the session feeds it
//! the current instant and executes the requests it hands out.

use crate::{
    core::{
        config::RoutingConfig,
        route::{RoutePath, RoutePoints, RouteRequest, RouteSignature, TravelMode},
    },
    MapError, RoutingError,
};
use tokio::time::Instant;

/// Why the last request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteFailure {
    /// The routing quota was exhausted; not retried automatically
    RateLimited,
    RoutingFailed,
}

impl RouteFailure {
    pub fn into_error(self, signature: &RouteSignature, info: impl Into<String>) -> MapError {
        let signature = signature.to_string();
        let info = info.into();
        match self {
            RouteFailure::RateLimited => MapError::RateLimited { signature, info },
            RouteFailure::RoutingFailed => MapError::RoutingFailed { signature, info },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteState {
    /// No routable input, or a degenerate route is shown
    Idle,
    /// Waiting for the input to go quiet
    Debouncing {
        signature: RouteSignature,
        deadline: Instant,
    },
    /// A request for the current input is outstanding
    Requesting {
        signature: RouteSignature,
        started_at: Instant,
    },
    Complete {
        signature: RouteSignature,
    },
    Failed {
        signature: RouteSignature,
        failure: RouteFailure,
    },
}

impl RouteState {
    pub fn name(&self) -> &'static str {
        match self {
            RouteState::Idle => "idle",
            RouteState::Debouncing { .. } => "debouncing",
            RouteState::Requesting { .. } => "requesting",
            RouteState::Complete { .. } => "complete",
            RouteState::Failed { .. } => "failed",
        }
    }

    pub fn signature(&self) -> Option<&RouteSignature> {
        match self {
            RouteState::Idle => None,
            RouteState::Debouncing { signature, .. }
            | RouteState::Requesting { signature, .. }
            | RouteState::Complete { signature }
            | RouteState::Failed { signature, .. } => Some(signature),
        }
    }
}

/// The one request whose response may still be committed
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub id: u64,
    pub signature: RouteSignature,
    pub started_at: Instant,
    mode: TravelMode,
    points: RoutePoints,
}

/// A route that made it onto the map
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedRoute {
    pub signature: RouteSignature,
    pub mode: TravelMode,
    pub points: RoutePoints,
    pub path: RoutePath,
}

/// What the session should do after an input change
#[derive(Debug, Clone, PartialEq)]
pub enum InputDecision {
    /// Fewer than two waypoints: draw the points (or the default center)
    /// without routing
    Degenerate { points: RoutePoints },
    /// The same route is already being fetched
    AlreadyRequesting,
    /// The same route is already known; redraw it without a network call
    Reuse(CommittedRoute),
    /// Wait until `deadline`, then call `on_debounce_elapsed`
    Debounce { deadline: Instant },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    Committed(CommittedRoute),
    Failed {
        signature: RouteSignature,
        failure: RouteFailure,
        error: RoutingError,
    },
    /// Superseded while in flight; never committed
    Stale { signature: RouteSignature },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordinatorStats {
    pub requests_issued: u64,
    pub duplicates_suppressed: u64,
    pub stale_discarded: u64,
    pub reused: u64,
    pub commits: u64,
    pub failures: u64,
}

pub struct RouteCoordinator {
    config: RoutingConfig,
    state: RouteState,
    /// Signature of the most recent routable input
    target: Option<RouteSignature>,
    /// Input waiting for its debounce deadline
    queued: Option<(TravelMode, RoutePoints)>,
    pending: Option<PendingRequest>,
    committed: Option<CommittedRoute>,
    next_request_id: u64,
    stats: CoordinatorStats,
}

impl RouteCoordinator {
    pub fn new(config: RoutingConfig) -> Self {
        Self {
            config,
            state: RouteState::Idle,
            target: None,
            queued: None,
            pending: None,
            committed: None,
            next_request_id: 0,
            stats: CoordinatorStats::default(),
        }
    }

    /// Handles a change of travel mode or route points
    pub fn on_input(&mut self, mode: TravelMode, points: RoutePoints, now: Instant) -> InputDecision {
        let waypoints = points.iter().filter(|p| p.is_waypoint()).count();
        if waypoints < 2 {
            self.queued = None;
            self.target = None;
            self.transition(RouteState::Idle);
            return InputDecision::Degenerate { points };
        }

        let signature = RouteSignature::compute(mode, &points);

        if let Some(pending) = self.pending.as_mut() {
            if pending.signature == signature {
                // names may have changed under the same signature
                pending.points = points;
                let started_at = pending.started_at;
                self.queued = None;
                self.target = Some(signature.clone());
                self.stats.duplicates_suppressed += 1;
                self.transition(RouteState::Requesting {
                    signature,
                    started_at,
                });
                return InputDecision::AlreadyRequesting;
            }
        }

        if let Some(committed) = self.committed.as_mut() {
            if committed.signature == signature {
                committed.points = points;
                let route = committed.clone();
                self.queued = None;
                self.target = Some(signature.clone());
                self.stats.reused += 1;
                self.transition(RouteState::Complete { signature });
                return InputDecision::Reuse(route);
            }
        }

        let deadline = now + self.config.debounce();
        self.queued = Some((mode, points));
        self.target = Some(signature.clone());
        self.transition(RouteState::Debouncing {
            signature,
            deadline,
        });
        InputDecision::Debounce { deadline }
    }

    /// Issues the request for the debounced input once its deadline passed.
    /// Any request already in flight is orphaned; its response will be
    /// discarded.
    pub fn on_debounce_elapsed(&mut self, now: Instant) -> Option<RouteRequest> {
        let RouteState::Debouncing { deadline, .. } = &self.state else {
            return None;
        };
        if now < *deadline {
            return None;
        }
        let (mode, points) = self.queued.take()?;

        self.next_request_id += 1;
        let request = RouteRequest::from_points(self.next_request_id, mode, &points)?;

        let pending = PendingRequest {
            id: request.id,
            signature: request.signature.clone(),
            started_at: now,
            mode,
            points,
        };
        if let Some(superseded) = self.pending.replace(pending) {
            log::debug!(
                "request #{} ({}) superseded by #{}",
                superseded.id,
                superseded.signature,
                request.id
            );
        }

        self.stats.requests_issued += 1;
        self.transition(RouteState::Requesting {
            signature: request.signature.clone(),
            started_at: now,
        });
        Some(request)
    }

    /// Applies a routing response. Only the tracked request for the current
    /// input can commit; everything else is dropped.
    pub fn on_response(
        &mut self,
        id: u64,
        signature: RouteSignature,
        result: std::result::Result<RoutePath, RoutingError>,
    ) -> ResponseOutcome {
        let pending = match self.pending.take() {
            Some(pending) if pending.id == id => pending,
            other => {
                self.pending = other;
                return self.discard(id, signature);
            }
        };
        if self.target.as_ref() != Some(&signature) {
            return self.discard(id, signature);
        }

        match result {
            Ok(path) => {
                let route = CommittedRoute {
                    signature: signature.clone(),
                    mode: pending.mode,
                    points: pending.points,
                    path,
                };
                self.committed = Some(route.clone());
                self.stats.commits += 1;
                log::info!(
                    "route {} committed ({} points, {:.0} m)",
                    signature,
                    route.path.points.len(),
                    route.path.length_m()
                );
                self.transition(RouteState::Complete { signature });
                ResponseOutcome::Committed(route)
            }
            Err(error) => {
                let failure = if error.is_rate_limited() {
                    RouteFailure::RateLimited
                } else {
                    RouteFailure::RoutingFailed
                };
                self.stats.failures += 1;
                log::warn!("route {} failed: {}", signature, error);
                self.transition(RouteState::Failed {
                    signature: signature.clone(),
                    failure,
                });
                ResponseOutcome::Failed {
                    signature,
                    failure,
                    error,
                }
            }
        }
    }

    /// Forgets queued and outstanding work; responses still in flight become
    /// stale
    pub fn cancel(&mut self) {
        self.queued = None;
        self.target = None;
        self.pending = None;
        self.transition(RouteState::Idle);
    }

    pub fn debounce_deadline(&self) -> Option<Instant> {
        match &self.state {
            RouteState::Debouncing { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    pub fn state(&self) -> &RouteState {
        &self.state
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn committed(&self) -> Option<&CommittedRoute> {
        self.committed.as_ref()
    }

    pub fn target(&self) -> Option<&RouteSignature> {
        self.target.as_ref()
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.stats
    }

    fn discard(&mut self, id: u64, signature: RouteSignature) -> ResponseOutcome {
        self.stats.stale_discarded += 1;
        log::warn!(
            "{}",
            MapError::StaleResponseDiscarded {
                signature: format!("{} (#{})", signature, id)
            }
        );
        ResponseOutcome::Stale { signature }
    }

    fn transition(&mut self, next: RouteState) {
        if self.state.name() != next.name() {
            log::debug!("route state {} -> {}", self.state.name(), next.name());
        }
        self.state = next;
    }
}
