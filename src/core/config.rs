//! Configuration system for session timing and view behavior
//!
//! This module provides a hierarchical configuration system that allows users
//! to configure the debounce, settle and view defaults of a map session through
//! presets or custom configurations.

use crate::core::{
    constants::{
        DEFAULT_CENTER_LNG_LAT, DEFAULT_CONTAINER, DEFAULT_ZOOM, FOCUS_REAFFIRM_MS,
        FOCUS_SETTLE_WINDOW_MS, LOCATE_ZOOM, ROUTE_DEBOUNCE_MS,
    },
    geo::{lng_lat, LatLng},
};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionProfile {
    Balanced,
    /// Longer quiet windows, fewer routing calls against a tight quota
    Conservative,
    Responsive,
    Custom(SessionOptions),
}

impl SessionProfile {
    pub fn resolve(&self) -> SessionOptions {
        match self {
            Self::Balanced => SessionOptions {
                view: ViewConfig::default(),
                routing: RoutingConfig {
                    debounce_ms: ROUTE_DEBOUNCE_MS,
                },
                focus: FocusConfig {
                    settle_window_ms: FOCUS_SETTLE_WINDOW_MS,
                    reaffirm_after_ms: FOCUS_REAFFIRM_MS,
                    locate_zoom: LOCATE_ZOOM,
                },
            },
            Self::Conservative => SessionOptions {
                view: ViewConfig::default(),
                routing: RoutingConfig { debounce_ms: 750 },
                focus: FocusConfig {
                    settle_window_ms: 1_200,
                    reaffirm_after_ms: 300,
                    locate_zoom: LOCATE_ZOOM,
                },
            },
            Self::Responsive => SessionOptions {
                view: ViewConfig::default(),
                routing: RoutingConfig { debounce_ms: 150 },
                focus: FocusConfig {
                    settle_window_ms: 600,
                    reaffirm_after_ms: 150,
                    locate_zoom: LOCATE_ZOOM,
                },
            },
            Self::Custom(options) => options.clone(),
        }
    }
}

impl Default for SessionProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub view: ViewConfig,
    pub routing: RoutingConfig,
    pub focus: FocusConfig,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionProfile::default().resolve()
    }
}

impl SessionOptions {
    /// Parses options from JSON; missing sections and fields keep the
    /// balanced defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: SessionOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.focus.reaffirm_after_ms > self.focus.settle_window_ms {
            return Err(MapError::Config(format!(
                "reaffirm checkpoint ({} ms) falls outside the settle window ({} ms)",
                self.focus.reaffirm_after_ms, self.focus.settle_window_ms
            )));
        }
        if !self.view.zoom.is_finite() || !self.focus.locate_zoom.is_finite() {
            return Err(MapError::Config("zoom levels must be finite".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Id of the container the map surface is created in
    pub container: String,
    #[serde(with = "lng_lat")]
    pub center: LatLng,
    pub zoom: f64,
    /// Fit the camera to a freshly committed route even while the user has
    /// jumped to their own location
    pub fit_route_while_located: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        let (lng, lat) = DEFAULT_CENTER_LNG_LAT;
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            center: LatLng::from_lng_lat(lng, lat),
            zoom: DEFAULT_ZOOM,
            fit_route_while_located: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub debounce_ms: u64,
}

impl RoutingConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        SessionProfile::Balanced.resolve().routing
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    pub settle_window_ms: u64,
    pub reaffirm_after_ms: u64,
    pub locate_zoom: f64,
}

impl FocusConfig {
    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }

    pub fn reaffirm_after(&self) -> Duration {
        Duration::from_millis(self.reaffirm_after_ms)
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        SessionProfile::Balanced.resolve().focus
    }
}
