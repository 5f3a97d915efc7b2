use async_trait::async_trait;
use routelet::headless::{HeadlessAsset, HeadlessRuntime, HeadlessSurface, SurfaceOp};
use routelet::prelude::*;
use tokio::time::sleep;

/// End-to-end scenarios driving a full session against the headless runtime.
/// Time is paused, so every debounce and latency below is exact.
#[cfg(test)]
mod session_scenarios {
    use super::*;

    const SIZE: Point = Point { x: 1200.0, y: 800.0 };

    fn point(name: &str, lng: f64, lat: f64) -> RoutePoint {
        RoutePoint::new(name, LatLng::from_lng_lat(lng, lat))
    }

    fn walk() -> Vec<RoutePoint> {
        vec![
            point("Station", 116.461, 39.908),
            point("Roastery", 116.465, 39.908),
        ]
    }

    fn park() -> Vec<RoutePoint> {
        vec![
            point("South gate", 116.4738, 39.933),
            point("Lawn", 116.4763, 39.9354),
            point("Lake path", 116.4795, 39.9372),
        ]
    }

    fn bounds_of(points: &[RoutePoint]) -> LatLngBounds {
        LatLngBounds::from_points(points.iter().map(|p| &p.position)).unwrap()
    }

    async fn mount(runtime: &HeadlessRuntime, builder: MapSessionBuilder) -> (MapSession, HeadlessSurface) {
        let _ = env_logger::builder().is_test(true).try_init();
        let asset = HeadlessAsset::new(runtime.clone());
        let session = builder.mount(&SdkLoader::new(), Arc::new(asset)).await.unwrap();
        let surface = runtime.surface().unwrap();
        (session, surface)
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    struct FixedLocation(Option<LatLng>);

    #[async_trait]
    impl Geolocation for FixedLocation {
        async fn current_position(&self) -> Result<LatLng> {
            self.0
                .ok_or_else(|| MapError::Geolocation("permission denied".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_walking_route_end_to_end() {
        let runtime = HeadlessRuntime::new();
        let (session, surface) = mount(&runtime, MapSession::builder()).await;

        session.update(TravelMode::Walking, walk()).unwrap();
        sleep(ms(400)).await;

        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(
            snapshot.committed.as_ref().map(|s| s.as_str()),
            Some("walking-116.461,39.908|116.465,39.908")
        );
        assert_eq!(snapshot.route_state.name(), "complete");
        assert_eq!(runtime.request_count(), 1);
        assert_eq!(snapshot.overlays.waypoint_labels, vec!["Station", "Roastery"]);
        assert!(snapshot.overlays.has_path);
        assert!(snapshot.overlays.center_marker.is_none());
        assert_eq!(surface.live_markers().len(), 2);
        assert_eq!(surface.live_polylines().len(), 1);
        assert_eq!(snapshot.camera, Camera::fit(&bounds_of(&walk()), SIZE));

        let events = session.try_recv_events();
        assert!(matches!(events[0], SessionEvent::Ready { .. }));
        assert!(matches!(
            &events[1],
            SessionEvent::RouteCommitted { mode: TravelMode::Walking, waypoints: 2, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_changes_issues_one_request() {
        let runtime = HeadlessRuntime::new();
        let (session, _surface) = mount(&runtime, MapSession::builder()).await;

        for lng in [116.470, 116.471, 116.472, 116.473, 116.474] {
            let mut points = walk();
            points[1].position = LatLng::from_lng_lat(lng, 39.908);
            session.set_route(points).unwrap();
            sleep(ms(50)).await;
        }
        sleep(ms(1_000)).await;

        let requests = runtime.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].signature.as_str(), "driving-116.461,39.908|116.474,39.908");
        assert_eq!(requests[0].mode, TravelMode::Driving);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_change_alone_triggers_a_new_request() {
        let runtime = HeadlessRuntime::new();
        let (session, _surface) = mount(&runtime, MapSession::builder().with_route(walk())).await;
        sleep(ms(400)).await;

        session.set_travel_mode(TravelMode::Riding).unwrap();
        sleep(ms(400)).await;

        let requests = runtime.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].mode, TravelMode::Riding);
        let snapshot = session.snapshot().await.unwrap();
        assert!(snapshot.committed.unwrap().as_str().starts_with("riding-"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeating_the_same_input_is_free() {
        let runtime = HeadlessRuntime::new();
        let (session, surface) = mount(&runtime, MapSession::builder()).await;

        session.set_route(walk()).unwrap();
        sleep(ms(320)).await;
        // still in flight
        session.set_route(walk()).unwrap();
        sleep(ms(100)).await;
        let ops = surface.ops().len();
        // already on screen
        session.set_route(walk()).unwrap();
        sleep(ms(1_000)).await;

        assert_eq!(runtime.request_count(), 1);
        let stats = session.snapshot().await.unwrap().stats;
        assert_eq!(stats.duplicates_suppressed, 1);
        assert_eq!(stats.reused, 1);
        // nothing redrawn, no second commit
        assert_eq!(surface.ops().len(), ops);
        let commits = session
            .try_recv_events()
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::RouteCommitted { .. }))
            .count();
        assert_eq!(commits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_superseded_response_never_lands() {
        let runtime = HeadlessRuntime::new();
        let (session, surface) = mount(&runtime, MapSession::builder()).await;

        // the first answer is slow and arrives after the second one
        runtime.push_response(ms(500), Ok(RoutePath::new(vec![
            LatLng::from_lng_lat(116.461, 39.908),
            LatLng::from_lng_lat(116.465, 39.908),
        ])));
        session.set_route(walk()).unwrap();
        sleep(ms(310)).await;
        session.set_route(park()).unwrap();
        sleep(ms(1_000)).await;

        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(runtime.request_count(), 2);
        assert!(snapshot.committed.unwrap().as_str().ends_with("116.4795,39.9372"));
        assert_eq!(
            snapshot.overlays.waypoint_positions,
            park().iter().map(|p| p.position).collect::<Vec<_>>()
        );
        assert_eq!(snapshot.stats.stale_discarded, 1);
        assert_eq!(snapshot.stats.commits, 1);
        assert_eq!(surface.live_markers().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_swap_never_shows_both_marker_sets() {
        let runtime = HeadlessRuntime::new();
        let (session, surface) = mount(&runtime, MapSession::builder()).await;

        session.set_route(park()).unwrap();
        sleep(ms(400)).await;
        session.set_route(walk()).unwrap();
        sleep(ms(400)).await;

        assert_eq!(surface.live_markers().len(), 2);
        assert_eq!(surface.peak_route_markers(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_keeps_last_route_and_does_not_retry() {
        let runtime = HeadlessRuntime::new();
        let (session, _surface) = mount(&runtime, MapSession::builder().with_route(walk())).await;
        sleep(ms(400)).await;
        let before = session.snapshot().await.unwrap();
        session.try_recv_events();

        runtime.push_response(
            ms(50),
            Err(RoutingError::classify("CUQPS_HAS_EXCEEDED_THE_LIMIT")),
        );
        session.set_route(park()).unwrap();
        sleep(ms(400)).await;

        let after = session.snapshot().await.unwrap();
        match &after.route_state {
            RouteState::Failed { failure, .. } => assert_eq!(*failure, RouteFailure::RateLimited),
            other => panic!("expected a failed route, got {:?}", other),
        }
        assert_eq!(after.overlays, before.overlays);
        assert_eq!(after.camera, before.camera);

        let events = session.try_recv_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].error(), Some(MapError::RateLimited { .. })));

        sleep(ms(10_000)).await;
        assert_eq!(runtime.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_routing_failure_preserves_overlays() {
        let runtime = HeadlessRuntime::new();
        let (session, _surface) = mount(&runtime, MapSession::builder().with_route(walk())).await;
        sleep(ms(400)).await;
        let before = session.snapshot().await.unwrap().overlays;

        runtime.push_response(ms(50), Err(RoutingError::classify("NO_DATA")));
        session.set_route(park()).unwrap();
        sleep(ms(400)).await;

        assert_eq!(session.snapshot().await.unwrap().overlays, before);
        assert!(session
            .try_recv_events()
            .iter()
            .any(|e| matches!(e, SessionEvent::RoutingFailed { info, .. } if info == "NO_DATA")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_focus_wins_inside_settle_window() {
        let runtime = HeadlessRuntime::new();
        let builder = MapSession::builder().fit_route_while_located(true);
        let (session, surface) = mount(&runtime, builder).await;
        let me = LatLng::new(31.23, 121.47);

        session.set_route(walk()).unwrap();
        session.set_location_override(Some(me)).unwrap();
        sleep(ms(400)).await;

        // the route committed at +350 ms, inside the window
        let snapshot = session.snapshot().await.unwrap();
        assert!(snapshot.overlays.has_path);
        assert!(snapshot.camera.is_at(me, 15.0));
        assert!(snapshot.focus_locked);
        let reaffirms = surface
            .ops()
            .iter()
            .filter(|op| **op == SurfaceOp::SetCenter(me))
            .count();
        assert_eq!(reaffirms, 2);

        sleep(ms(600)).await;
        session.set_route(park()).unwrap();
        sleep(ms(400)).await;

        let snapshot = session.snapshot().await.unwrap();
        assert!(!snapshot.focus_locked);
        assert_eq!(snapshot.camera, Camera::fit(&bounds_of(&park()), SIZE));
        assert_eq!(snapshot.overlays.user_location, Some(me));
    }

    #[tokio::test(start_paused = true)]
    async fn test_located_view_is_kept_across_route_changes() {
        let runtime = HeadlessRuntime::new();
        let (session, _surface) = mount(&runtime, MapSession::builder()).await;
        let me = LatLng::new(31.23, 121.47);

        session.set_location_override(Some(me)).unwrap();
        sleep(ms(2_000)).await;
        session.set_route(park()).unwrap();
        sleep(ms(400)).await;

        let snapshot = session.snapshot().await.unwrap();
        assert!(snapshot.overlays.has_path);
        assert!(snapshot.camera.is_at(me, 15.0));

        session.recenter().unwrap();
        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(snapshot.location_override, None);
        assert_eq!(snapshot.overlays.user_location, None);
        assert_eq!(snapshot.camera, Camera::fit(&bounds_of(&park()), SIZE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_locate_success_and_failure() {
        let runtime = HeadlessRuntime::new();
        let (session, _surface) = mount(&runtime, MapSession::builder()).await;
        session.try_recv_events();

        let err = session.locate(&FixedLocation(None)).await.unwrap_err();
        assert!(matches!(err, MapError::Geolocation(_)));
        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(snapshot.location_override, None);
        assert_eq!(snapshot.camera.zoom, 11.0);
        assert!(matches!(
            session.try_recv_events().as_slice(),
            [SessionEvent::LocationFailed { .. }]
        ));

        let me = LatLng::new(31.23, 121.47);
        assert_eq!(session.locate(&FixedLocation(Some(me))).await.unwrap(), me);
        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(snapshot.location_override, Some(me));
        assert!(snapshot.camera.is_at(me, 15.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_degenerate_routes_skip_routing() {
        let runtime = HeadlessRuntime::new();
        let (session, surface) = mount(&runtime, MapSession::builder()).await;
        let only = vec![point("", 116.461, 39.908)];

        session.set_route(walk()).unwrap();
        sleep(ms(1_000)).await;
        assert!(session.snapshot().await.unwrap().committed.is_some());

        session.set_route(only.clone()).unwrap();
        sleep(ms(1_000)).await;

        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(snapshot.route_state, RouteState::Idle);
        assert_eq!(snapshot.committed, None);
        assert_eq!(snapshot.overlays.waypoint_labels, vec!["Point 1"]);
        assert!(!snapshot.overlays.has_path);
        assert_eq!(surface.live_markers().len(), 1);
        assert!(snapshot.camera.is_at(only[0].position, routelet::constants::MAX_ZOOM));

        session.set_route(Vec::<RoutePoint>::new()).unwrap();
        sleep(ms(1_000)).await;

        let snapshot = session.snapshot().await.unwrap();
        let center = LatLng::from_lng_lat(116.397428, 39.90923);
        assert_eq!(snapshot.overlays.center_marker, Some(center));
        assert!(snapshot.overlays.waypoint_labels.is_empty());
        assert!(snapshot.camera.is_at(center, 11.0));
        assert_eq!(snapshot.committed, None);

        // the known route comes back without another call
        session.set_route(walk()).unwrap();
        sleep(ms(100)).await;
        let snapshot = session.snapshot().await.unwrap();
        assert_eq!(snapshot.overlays.waypoint_labels, vec!["Station", "Roastery"]);
        assert!(snapshot.overlays.has_path);
        assert!(snapshot.committed.is_some());
        assert_eq!(runtime.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_traffic_toggle_is_idempotent() {
        let runtime = HeadlessRuntime::new();
        let (session, surface) = mount(&runtime, MapSession::builder()).await;

        session.set_traffic(true).unwrap();
        let first = session.snapshot().await.unwrap();
        let ops = surface.ops().len();

        session.set_traffic(true).unwrap();
        let second = session.snapshot().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(surface.ops().len(), ops);
        assert_eq!(surface.attached_layers(), vec![LayerKind::Traffic]);

        session.set_traffic(false).unwrap();
        session.set_traffic(true).unwrap();
        assert!(session.snapshot().await.unwrap().overlays.traffic_on);
        assert_eq!(surface.layers_created(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_removes_everything_and_drops_late_results() {
        let runtime = HeadlessRuntime::new();
        let builder = MapSession::builder().with_route(walk()).with_traffic(true);
        let (session, surface) = mount(&runtime, builder).await;
        session.set_location_override(Some(LatLng::new(31.23, 121.47))).unwrap();

        // in flight from +300 ms to +800 ms
        runtime.push_response(ms(500), Ok(RoutePath::default()));
        sleep(ms(400)).await;
        assert!(session.is_running());

        session.unmount().await.unwrap();
        assert_eq!(surface.live_count(), 0);
        assert!(matches!(session.try_recv_events().last(), Some(SessionEvent::Unmounted)));

        sleep(ms(1_000)).await;
        assert!(!session.is_running());
        assert_eq!(surface.live_count(), 0);
        assert!(matches!(session.set_route(park()), Err(MapError::SessionClosed)));
        assert!(matches!(session.snapshot().await, Err(MapError::SessionClosed)));
    }
}
