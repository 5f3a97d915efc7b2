pub mod base;
pub mod manager;
pub mod marker;

pub use base::{LayerKind, MarkerRole, MarkerStyle, OverlayId, SurfaceHandle};
pub use manager::{OverlayManager, OverlaySummary};
pub use marker::Marker;
