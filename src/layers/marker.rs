use crate::{
    core::{constants::USER_LOCATION_TITLE, geo::LatLng, route::RoutePoint},
    layers::base::{MarkerRole, MarkerStyle},
};

/// A marker waiting to be drawn on the surface
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    position: LatLng,
    style: MarkerStyle,
}

impl Marker {
    pub fn new(position: LatLng, style: MarkerStyle) -> Self {
        Self { position, style }
    }

    /// Labeled marker for the point at `index` of a route
    pub fn for_route_point(point: &RoutePoint, index: usize) -> Self {
        let role = if point.is_waypoint() {
            MarkerRole::Waypoint
        } else {
            MarkerRole::Annotation
        };
        let mut style = MarkerStyle::new(role).with_label(point.label(index));
        if !point.reason.is_empty() {
            style = style.with_title(point.reason.clone());
        }
        Self::new(point.position, style)
    }

    pub fn user_location(position: LatLng) -> Self {
        Self::new(
            position,
            MarkerStyle::new(MarkerRole::UserLocation).with_title(USER_LOCATION_TITLE),
        )
    }

    pub fn center(position: LatLng) -> Self {
        Self::new(position, MarkerStyle::new(MarkerRole::Center))
    }

    pub fn position(&self) -> LatLng {
        self.position
    }

    pub fn style(&self) -> &MarkerStyle {
        &self.style
    }

    pub fn label(&self) -> Option<&str> {
        self.style.label.as_deref()
    }
}
