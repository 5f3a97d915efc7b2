pub mod coordinator;

pub use coordinator::{
    CommittedRoute, CoordinatorStats, InputDecision, PendingRequest, ResponseOutcome,
    RouteCoordinator, RouteFailure, RouteState,
};
