//! Trip status panel and end-of-journey summary.
//!
//! Both are derived from a [`TripProgress`] snapshot and never stored.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::PlaceCatalog;
use crate::protocol::ScheduleEntry;
use crate::store::{TripProgress, TripStatus};
use crate::PlaceId;

/// One stop as shown in the status panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopStatus {
    pub place_id: PlaceId,
    /// `None` while the catalog cannot resolve the id
    pub name: Option<String>,
    pub category: Option<String>,
    /// `HH:MM` of the schedule's visit row for this place
    pub scheduled_time: Option<String>,
}

impl StopStatus {
    fn new(place_id: PlaceId, catalog: &PlaceCatalog, schedule: &[ScheduleEntry]) -> Self {
        let place = catalog.get(place_id);
        Self {
            place_id,
            name: place.map(|p| p.name.clone()),
            category: place.map(|p| p.category.clone()),
            scheduled_time: schedule
                .iter()
                .find(|entry| entry.visited_place() == Some(place_id))
                .map(|entry| entry.time.clone()),
        }
    }
}

/// Current / next destination panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripStatusPanel {
    pub status: TripStatus,
    pub current: Option<StopStatus>,
    pub next: Option<StopStatus>,
    pub can_advance: bool,
    /// `(cursor + 1) / len * 100`, capped at 100; 0 for an empty route
    pub progress_percentage: f64,
}

impl TripStatusPanel {
    pub fn build(progress: &TripProgress, catalog: &PlaceCatalog) -> Self {
        let route = progress.route();
        let cursor = progress.cursor();
        let schedule = progress.schedule();

        let stop = |index: usize| route.get(index).map(|&id| StopStatus::new(id, catalog, schedule));

        Self {
            status: progress.status(),
            current: stop(cursor),
            next: cursor.checked_add(1).and_then(stop),
            can_advance: progress.can_advance(),
            progress_percentage: percentage(cursor.saturating_add(1), route.len()),
        }
    }
}

/// Summary shown after the traveler ends the trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneySummary {
    pub total_places_planned: usize,
    pub total_places_visited: usize,
    pub completion_percentage: f64,
    /// Sum of known entrance fees over the visited stops
    pub total_entrance_fees: f64,
    /// Visit count per category
    pub categories_visited: BTreeMap<String, usize>,
    pub visited_place_ids: Vec<PlaceId>,
}

impl JourneySummary {
    pub fn build(progress: &TripProgress, catalog: &PlaceCatalog) -> Self {
        let route = progress.route();
        let visited = progress.cursor().saturating_add(1).min(route.len());
        let visited_ids = &route[..visited];

        let mut total_entrance_fees = 0.0;
        let mut categories_visited = BTreeMap::new();
        for place in visited_ids.iter().filter_map(|&id| catalog.get(id)) {
            total_entrance_fees += place.entrance_fee.unwrap_or(0.0);
            *categories_visited.entry(place.category.clone()).or_insert(0) += 1;
        }

        Self {
            total_places_planned: route.len(),
            total_places_visited: visited,
            completion_percentage: percentage(visited, route.len()),
            total_entrance_fees,
            categories_visited,
            visited_place_ids: visited_ids.to_vec(),
        }
    }
}

fn percentage(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (done as f64 / total as f64 * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ScheduleKind;
    use crate::store::{TripStore, TripUpdate};
    use crate::Place;

    fn catalog() -> PlaceCatalog {
        let mut places = vec![
            Place::new(1, "Candi Borobudur", -7.6079, 110.2038, "Budaya"),
            Place::new(2, "Candi Prambanan", -7.7520, 110.4914, "Budaya"),
            Place::new(3, "Pantai Parangtritis", -8.0255, 110.3329, "Alam"),
            Place::new(4, "Malioboro", -7.7929, 110.3668, "Belanja"),
        ];
        places[0].entrance_fee = Some(50000.0);
        places[1].entrance_fee = Some(50000.0);
        places[2].entrance_fee = Some(10000.0);
        PlaceCatalog::load(places).unwrap()
    }

    fn visit(place_id: f64, time: &str) -> ScheduleEntry {
        ScheduleEntry {
            location: String::new(),
            activity: "Visit".to_string(),
            time: time.to_string(),
            kind: Some(ScheduleKind::Visit),
            place_id: Some(place_id),
            category: None,
            entrance_fee: None,
        }
    }

    fn progress(route: Vec<PlaceId>, cursor: i64, schedule: Vec<ScheduleEntry>) -> std::sync::Arc<TripProgress> {
        let mut store = TripStore::new();
        let mut update = TripUpdate::new(route, cursor);
        update.schedule = schedule;
        store.initialize(update).unwrap();
        store.snapshot()
    }

    #[test]
    fn test_panel_shows_current_and_next() {
        let snapshot = progress(
            vec![2, 4, 3],
            0,
            vec![visit(2.0, "09:00"), visit(4.0, "11:30"), visit(3.0, "15:00")],
        );
        let panel = TripStatusPanel::build(&snapshot, &catalog());

        let current = panel.current.unwrap();
        assert_eq!(current.place_id, 2);
        assert_eq!(current.name.as_deref(), Some("Candi Prambanan"));
        assert_eq!(current.scheduled_time.as_deref(), Some("09:00"));
        let next = panel.next.unwrap();
        assert_eq!(next.place_id, 4);
        assert_eq!(next.scheduled_time.as_deref(), Some("11:30"));
        assert!(panel.can_advance);
        assert!((panel.progress_percentage - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_panel_at_last_stop() {
        let snapshot = progress(vec![2, 4], 1, Vec::new());
        let panel = TripStatusPanel::build(&snapshot, &catalog());
        assert_eq!(panel.current.unwrap().place_id, 4);
        assert!(panel.next.is_none());
        assert!(!panel.can_advance);
        assert_eq!(panel.progress_percentage, 100.0);
    }

    #[test]
    fn test_panel_complete_and_empty() {
        let done = progress(vec![2, 4], 2, Vec::new());
        let panel = TripStatusPanel::build(&done, &catalog());
        assert_eq!(panel.status, TripStatus::Completed);
        assert!(panel.current.is_none());
        assert_eq!(panel.progress_percentage, 100.0);

        let empty = TripProgress::default();
        let panel = TripStatusPanel::build(&empty, &catalog());
        assert_eq!(panel.status, TripStatus::Empty);
        assert_eq!(panel.progress_percentage, 0.0);
    }

    #[test]
    fn test_panel_without_catalog() {
        let snapshot = progress(vec![2, 4], 0, Vec::new());
        let panel = TripStatusPanel::build(&snapshot, &PlaceCatalog::unloaded());
        let current = panel.current.unwrap();
        assert_eq!(current.place_id, 2);
        assert!(current.name.is_none());
    }

    #[test]
    fn test_journey_summary() {
        let snapshot = progress(vec![1, 3, 2, 4], 2, Vec::new());
        let summary = JourneySummary::build(&snapshot, &catalog());

        assert_eq!(summary.total_places_planned, 4);
        assert_eq!(summary.total_places_visited, 3);
        assert_eq!(summary.completion_percentage, 75.0);
        assert_eq!(summary.total_entrance_fees, 110000.0);
        assert_eq!(summary.categories_visited.get("Budaya"), Some(&2));
        assert_eq!(summary.categories_visited.get("Alam"), Some(&1));
        assert_eq!(summary.visited_place_ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_journey_summary_empty() {
        let summary = JourneySummary::build(&TripProgress::default(), &catalog());
        assert_eq!(summary.total_places_visited, 0);
        assert_eq!(summary.completion_percentage, 0.0);
        assert!(summary.categories_visited.is_empty());
    }
}
