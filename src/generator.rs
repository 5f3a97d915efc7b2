//! Route plans produced from a natural-language query
//!
//! Generation itself happens elsewhere; this module only defines the plan
//! shape, validates it and provides an HTTP client for a generation
//! endpoint.

use crate::{
    core::route::{RoutePoint, RoutePoints, TravelMode},
    MapError, Result,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A generated route: a title, an optional preferred mode and the ordered
/// points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub mode: Option<TravelMode>,
    #[serde(default)]
    pub points: Vec<RoutePoint>,
}

/// Shape of error bodies some generation endpoints answer with
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    detail: Option<String>,
}

impl RoutePlan {
    /// Parses and validates a plan. A plan without points is not a plan.
    pub fn parse(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if value.get("points").is_none() {
            if let Ok(body) = serde_json::from_value::<ErrorBody>(value.clone()) {
                let detail = body.detail.map(|d| format!(" ({})", d)).unwrap_or_default();
                return Err(MapError::InvalidPlan(format!("{}{}", body.error, detail)));
            }
        }
        let plan: RoutePlan = serde_json::from_value(value)?;
        if plan.points.is_empty() {
            return Err(MapError::InvalidPlan("plan has no points".to_string()));
        }
        Ok(plan)
    }

    /// The mode to route with: an explicit choice wins over the plan's own
    /// preference, driving is the fallback
    pub fn travel_mode(&self, selected: Option<TravelMode>) -> TravelMode {
        selected.or(self.mode).unwrap_or_default()
    }

    pub fn route_points(&self) -> RoutePoints {
        self.points.clone().into()
    }
}

/// Turns a free-text request into a route plan
#[async_trait]
pub trait RouteGenerator: Send + Sync {
    async fn generate(&self, query: &str) -> Result<RoutePlan>;
}

#[cfg(feature = "http")]
pub use http::HttpRouteGenerator;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use once_cell::sync::Lazy;
    use std::time::Duration;

    /// Shared async HTTP client for generation requests
    static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
        reqwest::Client::builder()
            .user_agent(concat!("routelet/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("falling back to a default HTTP client: {}", e);
                reqwest::Client::new()
            })
    });

    /// Posts `{"query": ...}` to an endpoint that answers with a plan
    #[derive(Debug, Clone)]
    pub struct HttpRouteGenerator {
        endpoint: String,
    }

    impl HttpRouteGenerator {
        pub fn new(endpoint: impl Into<String>) -> Self {
            Self {
                endpoint: endpoint.into(),
            }
        }

        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }
    }

    #[async_trait]
    impl RouteGenerator for HttpRouteGenerator {
        async fn generate(&self, query: &str) -> Result<RoutePlan> {
            log::debug!("requesting route plan from {}", self.endpoint);
            let response = HTTP_CLIENT
                .post(&self.endpoint)
                .json(&serde_json::json!({ "query": query }))
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                log::warn!("route generator answered {}: {}", status, body);
                return Err(MapError::Generator(format!("HTTP {}: {}", status, body)));
            }
            RoutePlan::parse(&body)
        }
    }
}
