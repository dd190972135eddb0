//! View payloads. Each is a pure function of the shared state and the
//! request's filter.

use crate::state::{AppState, LoadWarning};
use serde::Serialize;
use wsd_core::filter::FilterState;
use wsd_core::model_artifact::FeatureScore;
use wsd_core::site::SiteId;
use wsd_data::catalog::{build_catalog, CatalogEntry, CatalogTotals, SiteCatalog, SiteQuery, Selection};
use wsd_data::comparison::{compare, Comparison};
use wsd_data::monthly::{monthly_means, MonthlyMeans};
use wsd_data::series::{build_series, SiteSeries};
use wsd_data::stats::{site_stats, SiteStats};
use wsd_db::models::DateBounds;

/// Either a populated view or the explicit empty state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum View<T> {
    Ok(T),
    NoData,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub filter: FilterState,
    pub totals: CatalogTotals,
    pub dataset_span: Option<DateBounds>,
    pub dataset_span_days: Option<i64>,
    /// Map markers, in site id order.
    pub sites: Vec<CatalogEntry>,
    /// Overview table rows, most observations first.
    pub table: Vec<CatalogEntry>,
    pub unmapped_sites: usize,
    pub warnings: Vec<LoadWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteDetail {
    pub site: CatalogEntry,
    pub stats: SiteStats,
    pub series: SiteSeries,
    pub comparison: Option<Comparison>,
    pub monthly: MonthlyMeans,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub matches: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Features {
    pub scores: Vec<FeatureScore>,
}

fn catalog(state: &AppState, filter: &FilterState) -> anyhow::Result<SiteCatalog> {
    let observations = state.db.query_observations(filter)?;
    Ok(build_catalog(&state.geometries, &observations))
}

pub fn overview(state: &AppState, filter: &FilterState) -> anyhow::Result<View<Overview>> {
    let catalog = catalog(state, filter)?;
    if catalog.entries.is_empty() || catalog.totals.observations == 0 {
        return Ok(View::NoData);
    }
    let table = catalog.by_observation_count().into_iter().cloned().collect();
    Ok(View::Ok(Overview {
        filter: filter.clone(),
        totals: catalog.totals,
        dataset_span: state.dataset_span,
        dataset_span_days: state
            .dataset_span
            .map(|b| wsd_utils::dates::span_days(&b.first, &b.last)),
        table,
        unmapped_sites: catalog.orphans.len(),
        sites: catalog.entries,
        warnings: state.report.warnings.clone(),
    }))
}

/// `Ok(None)` when the site has no boundary; `NoData` when it has no rows
/// under the filter.
pub fn site_detail(
    state: &AppState,
    site_id: &SiteId,
    filter: &FilterState,
) -> anyhow::Result<Option<View<SiteDetail>>> {
    let observations = state.db.query_site_observations(site_id, filter)?;
    let catalog = build_catalog(&state.geometries, &observations);
    let Some(site) = catalog.find_by_id(site_id.as_str()).cloned() else {
        return Ok(None);
    };
    if observations.is_empty() {
        return Ok(Some(View::NoData));
    }
    Ok(Some(View::Ok(SiteDetail {
        site,
        stats: site_stats(&observations),
        series: build_series(&observations),
        comparison: compare(&observations),
        monthly: monthly_means(&observations),
    })))
}

pub fn search(
    state: &AppState,
    query: &SiteQuery,
    filter: &FilterState,
) -> anyhow::Result<View<SearchResults>> {
    let catalog = catalog(state, filter)?;
    let matches = match catalog.select(query) {
        Selection::Single(entry) => vec![entry.clone()],
        Selection::Multiple(entries) => entries.into_iter().cloned().collect(),
        Selection::NoMatch => return Ok(View::NoData),
    };
    Ok(View::Ok(SearchResults { matches }))
}

pub fn features(state: &AppState) -> View<Features> {
    match state.model.feature_importance() {
        Some(importance) if !importance.scores.is_empty() => View::Ok(Features {
            scores: importance.scores.clone(),
        }),
        _ => View::NoData,
    }
}
