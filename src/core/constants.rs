//! Default view, timing and label constants for map sessions.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Default map center as `(longitude, latitude)` (Beijing, Tiananmen).
pub const DEFAULT_CENTER_LNG_LAT: (f64, f64) = (116.397428, 39.90923);

/// Default zoom level for a freshly mounted map.
pub const DEFAULT_ZOOM: f64 = 11.0;

/// Fixed close zoom used when jumping to the user's location.
pub const LOCATE_ZOOM: f64 = 15.0;

/// Quiet window before a route change is sent to the routing service.
pub const ROUTE_DEBOUNCE_MS: u64 = 300;

/// How long a location-driven camera move is protected from route fits.
pub const FOCUS_SETTLE_WINDOW_MS: u64 = 800;

/// Checkpoint at which the location focus is re-applied.
pub const FOCUS_REAFFIRM_MS: u64 = 200;

/// Container id the map surface is created in.
pub const DEFAULT_CONTAINER: &str = "map";

/// Prefix for markers whose route point carries no name.
pub const POINT_LABEL_PREFIX: &str = "Point";

/// Title shown on the user location marker.
pub const USER_LOCATION_TITLE: &str = "My location";

/// Z-index of the traffic layer, above the base map tiles.
pub const TRAFFIC_LAYER_Z_INDEX: i32 = 10;

/// Service messages that mean the routing quota was exhausted.
pub const RATE_LIMIT_MARKERS: &[&str] = &["CUQPS_HAS_EXCEEDED_THE_LIMIT", "OVER_QUOTA"];

/// Zoom limits applied to the simulated camera.
pub const MIN_ZOOM: f64 = 3.0;
pub const MAX_ZOOM: f64 = 18.0;

/// Default square tile size in pixels, used when fitting bounds.
pub const TILE_SIZE: f64 = 256.0;
