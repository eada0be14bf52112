//! Place catalog lookup.
//!
//! The catalog is fetched once per session and never mutated. Place ids are
//! 1-based and `catalog[id - 1]` is the place with that id; this module is
//! the only place in the crate that performs that offset.

use std::collections::BTreeSet;

use log::debug;

use crate::error::{OptionExt, Result, TripError};
use crate::{Place, PlaceId};

/// Read-only place catalog, possibly not loaded yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceCatalog {
    places: Option<Vec<Place>>,
}

impl PlaceCatalog {
    /// A catalog that has not been fetched yet. Every lookup misses.
    pub fn unloaded() -> Self {
        Self { places: None }
    }

    /// Build a catalog from the rows returned by the catalog endpoint.
    ///
    /// Rows may arrive in any order but their ids must form the contiguous
    /// sequence `1..=n`.
    pub fn load(mut places: Vec<Place>) -> Result<Self> {
        places.sort_by_key(|p| p.id);

        for (index, place) in places.iter().enumerate() {
            let expected = index as PlaceId + 1;
            if place.id != expected {
                return Err(TripError::InvalidCatalog {
                    message: format!("expected place id {} at position {}, found {}", expected, index, place.id),
                });
            }
        }

        debug!("[PlaceCatalog] Loaded {} places", places.len());
        Ok(Self { places: Some(places) })
    }

    pub fn is_loaded(&self) -> bool {
        self.places.is_some()
    }

    pub fn len(&self) -> usize {
        self.places.as_ref().map_or(0, |p| p.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a place id.
    ///
    /// Fails with [`TripError::CatalogNotLoaded`] before the catalog arrives
    /// and with [`TripError::NotFound`] for ids outside `[1, len]`.
    pub fn resolve(&self, id: PlaceId) -> Result<&Place> {
        let places = self.places.as_ref().ok_or(TripError::CatalogNotLoaded)?;
        let index = (id as usize).checked_sub(1).ok_or_not_found(id)?;
        places.get(index).ok_or_not_found(id)
    }

    /// Resolve a place id, treating any miss as "nothing to show".
    pub fn get(&self, id: PlaceId) -> Option<&Place> {
        self.resolve(id).ok()
    }

    pub fn contains(&self, id: PlaceId) -> bool {
        self.get(id).is_some()
    }

    /// All places in id order. Empty while unloaded.
    pub fn places(&self) -> &[Place] {
        self.places.as_deref().unwrap_or(&[])
    }

    /// First place in the catalog, used as a fallback map center.
    pub fn first(&self) -> Option<&Place> {
        self.places().first()
    }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.places()
            .iter()
            .map(|p| p.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
