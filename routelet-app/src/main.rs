use anyhow::Context;
use async_trait::async_trait;
use routelet::{
    headless::{HeadlessAsset, HeadlessRuntime},
    prelude::*,
};

/// Plan used when no file or endpoint is given
const SAMPLE_PLAN: &str = r#"{
    "title": "Coffee and photos around the CBD",
    "mode": "walking",
    "points": [
        {"name": "Guomao station", "position": [116.461, 39.908], "reason": "meeting point"},
        {"name": "Arabica", "position": [116.4602, 39.9098], "reason": "bright windows"},
        {"name": "Blue Bottle", "position": [116.4652, 39.9084], "reason": "gallery feel"},
        {"name": "Rooftop terrace", "position": [116.4705, 39.9092], "reason": "sunset view"}
    ]
}"#;

/// Pretends the user stands in Chaoyang Park
struct DemoLocation;

#[async_trait]
impl Geolocation for DemoLocation {
    async fn current_position(&self) -> routelet::Result<LatLng> {
        Ok(LatLng::from_lng_lat(116.4763, 39.9354))
    }
}

/// Drives one session through the usual page flow against the headless
/// runtime and prints what ends up on the map.
///
/// Usage: `routelet-app [plan.json]` or `routelet-app --generate <endpoint> <query>`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let plan = load_plan().await?;
    log::info!("plan '{}' with {} points", plan.title, plan.points.len());

    let runtime = HeadlessRuntime::new();
    let session = MapSession::builder()
        .on_ready(|camera| log::info!("map ready at {:?}", camera))
        .mount(SdkLoader::global(), Arc::new(HeadlessAsset::new(runtime.clone())))
        .await
        .context("mounting the map session")?;

    session.update(plan.travel_mode(None), plan.route_points())?;
    session.set_traffic(true)?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    report(&session, "route").await?;

    let me = session.locate(&DemoLocation).await?;
    log::info!("jumped to {:?}", me);
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    report(&session, "located").await?;

    session.recenter()?;
    report(&session, "recentered").await?;

    for event in session.try_recv_events() {
        println!("event: {:?}", event);
    }

    session.unmount().await?;
    println!("routing calls made: {}", runtime.request_count());
    Ok(())
}

async fn load_plan() -> anyhow::Result<RoutePlan> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => Ok(RoutePlan::parse(SAMPLE_PLAN)?),
        [flag, endpoint, query @ ..] if flag == "--generate" => {
            let query = query.join(" ");
            generate(endpoint, &query).await
        }
        [path] => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading plan file {}", path))?;
            Ok(RoutePlan::parse(&json)?)
        }
        _ => anyhow::bail!("usage: routelet-app [plan.json] | --generate <endpoint> <query>"),
    }
}

#[cfg(feature = "http")]
async fn generate(endpoint: &str, query: &str) -> anyhow::Result<RoutePlan> {
    let generator = HttpRouteGenerator::new(endpoint);
    log::info!("asking {} for a plan", generator.endpoint());
    match generator.generate(query).await {
        Ok(plan) => Ok(plan),
        Err(e) => {
            log::warn!("route generation failed ({}), using the sample plan", e);
            Ok(RoutePlan::parse(SAMPLE_PLAN)?)
        }
    }
}

#[cfg(not(feature = "http"))]
async fn generate(_endpoint: &str, _query: &str) -> anyhow::Result<RoutePlan> {
    anyhow::bail!("built without the http feature")
}

async fn report(session: &MapSession, label: &str) -> anyhow::Result<()> {
    let snapshot = session.snapshot().await?;
    println!(
        "[{}] state={} markers={:?} path={} traffic={} camera=({:.5}, {:.5}) z{}",
        label,
        snapshot.route_state.name(),
        snapshot.overlays.waypoint_labels,
        snapshot.overlays.has_path,
        snapshot.overlays.traffic_on,
        snapshot.camera.center.lng,
        snapshot.camera.center.lat,
        snapshot.camera.zoom
    );
    Ok(())
}
