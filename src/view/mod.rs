pub mod camera;
pub mod focus;

pub use camera::Camera;
pub use focus::{FocusLock, FocusOwner, ViewFocusArbiter};
