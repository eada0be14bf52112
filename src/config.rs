//! Trip preferences and client configuration.
//!
//! [`TripConfig`] is captured once when a trip starts and passed through
//! unchanged on every re-optimization request. [`ClientConfig`] controls
//! where and how long the client talks to the optimizer.

use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::catalog::PlaceCatalog;
use crate::error::{Result, TripError};
use crate::{GpsPoint, PlaceId};

const TIME_FORMAT: &str = "%H:%M";

/// Crossover operator used by the optimizer's genetic algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverMethod {
    /// One-point crossover
    #[default]
    Original,
    /// Order crossover
    Order,
    /// Cycle crossover
    Cycle,
}

/// Evolutionary algorithm variant run by the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Generational GA
    #[default]
    Simple,
    /// Steady-state GA (mu + lambda)
    MuPlusLambda,
    /// Evolutionary strategy (mu, lambda)
    MuCommaLambda,
}

/// Named start point of the trip (usually the traveler's hotel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl StartLocation {
    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// Trip preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripConfig {
    /// Day start, `HH:MM`. Default: 08:00
    pub start_time: String,
    /// Day end, `HH:MM`. Default: 20:00
    pub end_time: String,
    /// Preferred lunch time, `HH:MM`. Default: 12:00
    pub lunch_time: String,
    /// Where the trip starts. The optimizer uses its own default when absent.
    pub start_location: Option<StartLocation>,
    /// Maximum number of stops. Default: 5
    pub max_places: u32,
    /// Entrance fee budget. Default: 0
    pub budget: f64,
    pub must_visit: Vec<PlaceId>,
    pub preferred_categories: Vec<String>,
    pub crossover_method: CrossoverMethod,
    pub algorithm: Algorithm,
}

impl Default for TripConfig {
    fn default() -> Self {
        Self {
            start_time: "08:00".to_string(),
            end_time: "20:00".to_string(),
            lunch_time: "12:00".to_string(),
            start_location: None,
            max_places: 5,
            budget: 0.0,
            must_visit: Vec::new(),
            preferred_categories: Vec::new(),
            crossover_method: CrossoverMethod::default(),
            algorithm: Algorithm::default(),
        }
    }
}

impl TripConfig {
    /// Check the preferences on their own.
    pub fn validate(&self) -> Result<()> {
        let start = parse_time("start_time", &self.start_time)?;
        let end = parse_time("end_time", &self.end_time)?;
        parse_time("lunch_time", &self.lunch_time)?;

        if end <= start {
            return Err(TripError::invalid_config(format!(
                "end_time {} must be after start_time {}",
                self.end_time, self.start_time
            )));
        }
        if self.max_places == 0 {
            return Err(TripError::invalid_config("max_places must be at least 1"));
        }
        if !self.budget.is_finite() || self.budget < 0.0 {
            return Err(TripError::invalid_config(format!("invalid budget {}", self.budget)));
        }
        if let Some(location) = &self.start_location {
            if !location.position().is_valid() {
                return Err(TripError::invalid_config(format!(
                    "start_location '{}' has invalid coordinates",
                    location.name
                )));
            }
        }
        Ok(())
    }

    /// Check the preferences and, once the catalog is loaded, that every
    /// must-visit id and preferred category exists in it.
    pub fn validate_against(&self, catalog: &PlaceCatalog) -> Result<()> {
        self.validate()?;
        if !catalog.is_loaded() {
            return Ok(());
        }
        if let Some(missing) = self.must_visit.iter().find(|id| !catalog.contains(**id)) {
            return Err(TripError::invalid_config(format!(
                "must_visit place {} is not in the catalog",
                missing
            )));
        }
        let known = catalog.categories();
        if let Some(unknown) = self.categories().into_iter().find(|c| !known.contains(c)) {
            return Err(TripError::invalid_config(format!(
                "preferred category {:?} is not in the catalog (known: {})",
                unknown,
                known.join(", ")
            )));
        }
        Ok(())
    }

    /// Preferred categories with blank entries dropped.
    pub fn categories(&self) -> Vec<String> {
        self.preferred_categories
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|e| TripError::invalid_config(format!("{} '{}': {}", field, value, e)))
}

/// Optimizer API client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL the endpoint paths are joined to.
    /// Default: `http://localhost:5000/api`
    pub base_url: String,
    /// Per-request timeout. Default: 30s
    pub request_timeout: Duration,
    /// Upper bound for a whole advance (next + re-optimize) round trip.
    /// Re-optimization runs a GA server-side, so this is generous. Default: 120s
    pub advance_timeout: Duration,
    /// Idle connection lifetime in the pool. Default: 60s
    pub pool_idle_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            request_timeout: Duration::from_secs(30),
            advance_timeout: Duration::from_secs(120),
            pool_idle_timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Join an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Place;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TripConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_times() {
        let config = TripConfig {
            start_time: "8am".to_string(),
            ..TripConfig::default()
        };
        assert!(matches!(config.validate(), Err(TripError::InvalidConfig { .. })));

        let config = TripConfig {
            start_time: "18:00".to_string(),
            end_time: "09:00".to_string(),
            ..TripConfig::default()
        };
        assert!(matches!(config.validate(), Err(TripError::InvalidConfig { .. })));
    }

    #[test]
    fn test_rejects_bad_limits() {
        let config = TripConfig {
            max_places: 0,
            ..TripConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TripConfig {
            budget: -1.0,
            ..TripConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TripConfig {
            start_location: Some(StartLocation {
                name: "Nowhere".to_string(),
                latitude: 120.0,
                longitude: 0.0,
            }),
            ..TripConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_must_visit_checked_against_catalog() {
        let config = TripConfig {
            must_visit: vec![1, 3],
            ..TripConfig::default()
        };
        let catalog = PlaceCatalog::load(vec![
            Place::new(1, "Candi Borobudur", -7.6079, 110.2038, "Budaya"),
            Place::new(2, "Candi Prambanan", -7.7520, 110.4914, "Budaya"),
        ])
        .unwrap();

        assert!(config.validate_against(&PlaceCatalog::unloaded()).is_ok());
        assert!(config.validate_against(&catalog).is_err());
    }

    #[test]
    fn test_preferred_categories_checked_against_catalog() {
        let catalog = PlaceCatalog::load(vec![
            Place::new(1, "Candi Borobudur", -7.6079, 110.2038, "Budaya"),
            Place::new(2, "Pantai Parangtritis", -8.0255, 110.3329, "Alam"),
        ])
        .unwrap();

        let known = TripConfig {
            preferred_categories: vec!["Alam".to_string(), " Budaya ".to_string(), String::new()],
            ..TripConfig::default()
        };
        assert!(known.validate_against(&catalog).is_ok());

        let unknown = TripConfig {
            preferred_categories: vec!["Alam".to_string(), "Rekreasi".to_string()],
            ..TripConfig::default()
        };
        assert!(unknown.validate_against(&PlaceCatalog::unloaded()).is_ok());
        match unknown.validate_against(&catalog) {
            Err(TripError::InvalidConfig { message }) => assert!(message.contains("Rekreasi")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&CrossoverMethod::Order).unwrap(), "\"order\"");
        assert_eq!(
            serde_json::to_string(&Algorithm::MuCommaLambda).unwrap(),
            "\"mu_comma_lambda\""
        );
    }

    #[test]
    fn test_endpoint_join() {
        let config = ClientConfig::with_base_url("http://localhost:5000/api/");
        assert_eq!(config.endpoint("/places"), "http://localhost:5000/api/places");
        assert_eq!(
            ClientConfig::default().endpoint("next-and-reoptimize"),
            "http://localhost:5000/api/next-and-reoptimize"
        );
    }

    #[test]
    fn test_blank_categories_dropped() {
        let config = TripConfig {
            preferred_categories: vec!["Alam".to_string(), " ".to_string(), String::new()],
            ..TripConfig::default()
        };
        assert_eq!(config.categories(), vec!["Alam".to_string()]);
    }
}
