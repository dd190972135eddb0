//! Join of loaded site geometries with filtered observations.
//!
//! The catalog has one entry per site that has a boundary. Sites that only
//! appear in the observations cannot be placed on the map; they are listed
//! as orphans instead of failing the join.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use wsd_core::geometry::GeometryIndex;
use wsd_core::observation::Observation;
use wsd_core::site::{Centroid, SiteId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub id: SiteId,
    pub name: String,
    pub centroid: Centroid,
    pub observation_count: usize,
    pub radar_count: usize,
    pub optical_count: usize,
    /// `None` whenever no filtered row carries a classified area.
    pub mean_area_km2: Option<f64>,
    pub max_area_km2: Option<f64>,
    pub min_area_km2: Option<f64>,
}

impl CatalogEntry {
    pub fn has_observations(&self) -> bool {
        self.observation_count > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogTotals {
    pub locations: usize,
    pub observations: usize,
    pub radar_observations: usize,
    pub optical_observations: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SiteCatalog {
    /// In site id order.
    pub entries: Vec<CatalogEntry>,
    /// Site ids with observations but no boundary.
    pub orphans: Vec<SiteId>,
    pub totals: CatalogTotals,
}

/// How the user asked for a site.
#[derive(Debug, Clone, PartialEq)]
pub enum SiteQuery {
    Id(String),
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection<'a> {
    Single(&'a CatalogEntry),
    /// Several names matched; the caller lets the user choose.
    Multiple(Vec<&'a CatalogEntry>),
    NoMatch,
}

#[derive(Default)]
struct SiteAccumulator {
    count: usize,
    radar: usize,
    optical: usize,
    area_sum: f64,
    area_count: usize,
    max: Option<f64>,
    min: Option<f64>,
}

impl SiteAccumulator {
    fn add(&mut self, obs: &Observation) {
        self.count += 1;
        if obs.is_radar() {
            self.radar += 1;
        } else if obs.is_optical() {
            self.optical += 1;
        }
        if let Some(area) = obs.area_km2 {
            self.area_sum += area;
            self.area_count += 1;
            self.max = Some(self.max.map_or(area, |m| m.max(area)));
            self.min = Some(self.min.map_or(area, |m| m.min(area)));
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.area_count > 0).then(|| self.area_sum / self.area_count as f64)
    }
}

/// Join `geometries` with already-filtered `observations`.
///
/// Pure and deterministic: entries follow site id order and aggregates are
/// accumulated in observation order.
pub fn build_catalog(geometries: &GeometryIndex, observations: &[Observation]) -> SiteCatalog {
    let mut per_site: BTreeMap<&SiteId, SiteAccumulator> = BTreeMap::new();
    let mut orphans: BTreeSet<SiteId> = BTreeSet::new();
    let mut totals = CatalogTotals::default();

    for obs in observations {
        totals.observations += 1;
        if obs.is_radar() {
            totals.radar_observations += 1;
        } else if obs.is_optical() {
            totals.optical_observations += 1;
        }
        if geometries.contains(&obs.site_id) {
            per_site.entry(&obs.site_id).or_default().add(obs);
        } else {
            orphans.insert(obs.site_id.clone());
        }
    }

    let empty = SiteAccumulator::default();
    let entries: Vec<CatalogEntry> = geometries
        .sites()
        .map(|site| {
            let acc = per_site.get(&site.id).unwrap_or(&empty);
            CatalogEntry {
                id: site.id.clone(),
                name: site.name.clone(),
                centroid: site.centroid,
                observation_count: acc.count,
                radar_count: acc.radar,
                optical_count: acc.optical,
                mean_area_km2: acc.mean(),
                max_area_km2: acc.max,
                min_area_km2: acc.min,
            }
        })
        .collect();
    totals.locations = entries.len();

    if !orphans.is_empty() {
        log::debug!(
            "[WSD] catalog: {} site(s) with observations but no geometry",
            orphans.len()
        );
    }

    SiteCatalog {
        entries,
        orphans: orphans.into_iter().collect(),
        totals,
    }
}

impl SiteCatalog {
    pub fn find_by_id(&self, id: &str) -> Option<&CatalogEntry> {
        let id = SiteId::new(id);
        self.entries.iter().find(|e| e.id == id)
    }

    /// Case-insensitive substring match on display names.
    pub fn search_by_name(&self, query: &str) -> Vec<&CatalogEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Resolve a search control to a site. An exact (case-insensitive)
    /// name match wins over partial matches.
    pub fn select(&self, query: &SiteQuery) -> Selection<'_> {
        match query {
            SiteQuery::Id(id) => self
                .find_by_id(id)
                .map_or(Selection::NoMatch, Selection::Single),
            SiteQuery::Name(name) => {
                let mut matches = self.search_by_name(name);
                let needle = name.trim().to_lowercase();
                let exact: Vec<&CatalogEntry> = matches
                    .iter()
                    .copied()
                    .filter(|e| e.name.to_lowercase() == needle)
                    .collect();
                if exact.len() == 1 {
                    return Selection::Single(exact[0]);
                }
                match matches.len() {
                    0 => Selection::NoMatch,
                    1 => Selection::Single(matches.remove(0)),
                    _ => Selection::Multiple(matches),
                }
            }
        }
    }

    /// Entries ordered for the overview table: most observations first,
    /// ties by site id.
    pub fn by_observation_count(&self) -> Vec<&CatalogEntry> {
        let mut sorted: Vec<&CatalogEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| {
            b.observation_count
                .cmp(&a.observation_count)
                .then_with(|| a.id.cmp(&b.id))
        });
        sorted
    }

    /// Entries that can carry a mean-based visual encoding.
    pub fn with_observations(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(|e| e.has_observations())
    }
}
