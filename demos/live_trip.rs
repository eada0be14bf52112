//! Drive a trip against a running optimizer server.
//!
//! Run with: RUST_LOG=info cargo run --example live_trip --features http -- [base_url] [steps]
//!
//! Defaults to http://localhost:5000/api and advances until the last stop.

use std::time::Instant;

use trip_tracker::{ClientConfig, MapRenderer, TripClient, TripConfig, TripError, TripSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(url) => ClientConfig::with_base_url(&url),
        None => ClientConfig::default(),
    };
    let max_steps: usize = args.next().map(|s| s.parse()).transpose()?.unwrap_or(usize::MAX);

    println!("Trip optimizer at {}", config.base_url);
    let session = TripSession::new(TripClient::new(config.clone())?, config);
    let mut renderer = MapRenderer::default();

    let start = Instant::now();
    let count = session.load_catalog().await?;
    println!("Catalog: {} places ({:?})", count, start.elapsed());

    let start = Instant::now();
    session.start_trip(TripConfig::default()).await?;
    println!("Route: {:?} ({:?})", session.progress().route(), start.elapsed());

    for step in 1..=max_steps {
        let start = Instant::now();
        match session.advance().await {
            Ok(event) => {
                let panel = session.status_panel();
                let current = panel.current.and_then(|s| s.name).unwrap_or_default();
                println!(
                    "Step {}: {:?} -> at {} ({:.0}%, {:?})",
                    step,
                    event,
                    current,
                    panel.progress_percentage,
                    start.elapsed()
                );
            }
            Err(TripError::TripComplete) => break,
            Err(e) if e.is_retryable() => {
                println!("Step {} failed, stopping: {}", step, e);
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let scene = session.map_scene(&mut renderer);
    println!("Map: {} markers, viewport {:?}", scene.markers.len(), scene.viewport.center);

    let summary = session.end_trip().await?;
    println!(
        "Ended: {}/{} places visited, fees {:.0}",
        summary.total_places_visited, summary.total_places_planned, summary.total_entrance_fees
    );

    Ok(())
}
