//! Offline walkthrough of a trip: optimize, advance twice, end.
//!
//! Feeds canned optimizer responses through the store and prints the
//! segmentation, status panel and map scene after every step.
//!
//! Run with: RUST_LOG=debug cargo run --example trip_walkthrough

use trip_tracker::protocol::{decode_envelope, PlacesResponse};
use trip_tracker::{
    initial_update, reoptimization_update, JourneySummary, MapRenderer, OptimizeResponse, PlaceCatalog,
    ReoptimizeResponse, TripProgress, TripStatusPanel, TripStore,
};

const PLACES: &str = r#"{"status": "success", "data": {"total": 5, "places": [
    {"id": 1, "name": "Candi Borobudur", "latitude": -7.6079, "longitude": 110.2038, "category": "Budaya", "entrance_fee": 50000},
    {"id": 2, "name": "Candi Prambanan", "latitude": -7.7520, "longitude": 110.4914, "category": "Budaya", "entrance_fee": 50000},
    {"id": 3, "name": "Kraton Yogyakarta", "latitude": -7.8050, "longitude": 110.3644, "category": "Budaya", "entrance_fee": 15000},
    {"id": 4, "name": "Malioboro", "latitude": -7.7929, "longitude": 110.3668, "category": "Belanja", "entrance_fee": 0},
    {"id": 5, "name": "Pantai Parangtritis", "latitude": -8.0255, "longitude": 110.3329, "category": "Alam", "entrance_fee": 10000}
]}}"#;

const OPTIMIZE: &str = r#"{"status": "success", "data": {
    "route": [3, 4, 2, 5],
    "schedule": [
        {"location": "Hotel", "activity": "Departure", "time": "08:00", "type": "departure", "place_id": NaN},
        {"location": "Kraton Yogyakarta", "activity": "Visit", "time": "08:20", "type": "visit", "place_id": 3.0},
        {"location": "Malioboro", "activity": "Visit", "time": "10:15", "type": "visit", "place_id": 4.0},
        {"location": "Candi Prambanan", "activity": "Visit", "time": "13:30", "type": "visit", "place_id": 2.0},
        {"location": "Pantai Parangtritis", "activity": "Visit", "time": "16:45", "type": "visit", "place_id": 5.0}
    ],
    "distance_info": {"total_distance_km": 78.4},
    "budget_info": {"remaining_budget": 25000, "total_budget": 100000, "used_budget": 75000}
}}"#;

const ADVANCE_1: &str = r#"{"status": "success", "data": {
    "step2_reoptimize": {"route_ids": [3, 4, 5, 2], "distance_info": {"total_distance_km": 71.2}},
    "summary": {"new_position": 1, "moved_to": "Malioboro"}
}}"#;

const ADVANCE_2: &str = r#"{"status": "success", "data": {
    "step2_reoptimize": {"route_ids": [3, 4, 5, 2], "distance_info": {"total_distance_km": NaN}},
    "summary": {"new_position": 2, "moved_to": "Pantai Parangtritis"}
}}"#;

fn print_state(step: &str, progress: &TripProgress, catalog: &PlaceCatalog, renderer: &mut MapRenderer) {
    let seg = progress.segment(catalog);
    let panel = TripStatusPanel::build(progress, catalog);
    let scene = renderer.render(&seg, catalog);

    println!("== {} ==", step);
    println!("  status:    {:?} ({:.0}%)", panel.status, panel.progress_percentage);
    println!("  visited:   {:?}", seg.visited_ids());
    println!("  remaining: {:?}", seg.remaining_ids());
    if let Some(current) = &panel.current {
        println!("  current:   {} at {:?}", current.name.as_deref().unwrap_or("?"), current.scheduled_time);
    }
    if let Some(next) = &panel.next {
        println!("  next:      {} at {:?}", next.name.as_deref().unwrap_or("?"), next.scheduled_time);
    }
    for marker in &scene.markers {
        println!("  marker {:>2} {:<10?} {}", marker.ordinal, marker.style, marker.title);
    }
    for line in &scene.polylines {
        println!("  {:?} trail: {} points, {:.1} km", line.kind, line.points.len(), line.length_m / 1000.0);
    }
    println!("  viewport:  {:?}\n", scene.viewport);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let places: PlacesResponse = decode_envelope(PLACES)?;
    let catalog = PlaceCatalog::load(places.places)?;
    let mut store = TripStore::new();
    let mut renderer = MapRenderer::default();

    let optimized: OptimizeResponse = decode_envelope(OPTIMIZE)?;
    store.initialize(initial_update(optimized)?)?;
    print_state("Optimized", &store.snapshot(), &catalog, &mut renderer);

    for (step, body) in [("Advance 1", ADVANCE_1), ("Advance 2", ADVANCE_2)] {
        let response: ReoptimizeResponse = decode_envelope(body)?;
        store.apply_reoptimization(reoptimization_update(response)?)?;
        print_state(step, &store.snapshot(), &catalog, &mut renderer);
    }

    let summary = JourneySummary::build(&store.snapshot(), &catalog);
    store.reset();
    println!("== Journey ended ==");
    println!(
        "  {}/{} places ({:.0}%), fees {:.0}, categories {:?}",
        summary.total_places_visited,
        summary.total_places_planned,
        summary.completion_percentage,
        summary.total_entrance_fees,
        summary.categories_visited
    );

    Ok(())
}
