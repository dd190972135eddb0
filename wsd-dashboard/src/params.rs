//! Query-string parameters and their translation into filter updates.
//!
//! Every request carries the complete filter, e.g.
//! `?start=2020-01-01&end=2020-12-31&sensors=radar,optical&include_flagged=false`.
//! Omitted parameters fall back to the default (unrestricted) filter.

use chrono::NaiveDate;
use serde::Deserialize;
use wsd_core::filter::{FilterContext, FilterState, FilterUpdate, FlagPolicy, SensorSelection};
use wsd_core::observation::SensorClass;
use wsd_core::site::SiteId;
use wsd_data::catalog::SiteQuery;
use wsd_db::models::DateBounds;
use wsd_utils::dates::parse_date;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    pub start: Option<String>,
    pub end: Option<String>,
    /// `all`, or a comma separated list of `radar` / `optical`. An empty
    /// value selects nothing.
    pub sensors: Option<String>,
    pub include_flagged: Option<bool>,
}

impl FilterParams {
    /// One update per control present in the query.
    pub fn updates(&self, bounds: Option<DateBounds>) -> anyhow::Result<Vec<FilterUpdate>> {
        let mut updates = Vec::new();

        let start = optional_date(&self.start)?;
        let end = optional_date(&self.end)?;
        match (start, end, bounds) {
            (None, None, _) => {}
            (Some(start), Some(end), _) => updates.push(FilterUpdate::DateRange { start, end }),
            (Some(start), None, Some(b)) => {
                updates.push(FilterUpdate::DateRange { start, end: b.last })
            }
            (None, Some(end), Some(b)) => {
                updates.push(FilterUpdate::DateRange { start: b.first, end })
            }
            (Some(_), None, None) | (None, Some(_), None) => {
                anyhow::bail!("both start and end are required when the store is empty")
            }
        }

        if let Some(sensors) = &self.sensors {
            updates.push(FilterUpdate::Sensors(parse_sensors(sensors)?));
        }
        if let Some(include) = self.include_flagged {
            let policy = if include { FlagPolicy::Include } else { FlagPolicy::Exclude };
            updates.push(FilterUpdate::Flags(policy));
        }
        Ok(updates)
    }

    /// Build the filter for this request. `bounds` is the dataset extent
    /// used to complete a half-open date range.
    pub fn filter(&self, bounds: Option<DateBounds>) -> anyhow::Result<FilterState> {
        let mut context = FilterContext::default();
        context.update(self.updates(bounds)?)?;
        Ok(context.current().clone())
    }
}

fn optional_date(value: &Option<String>) -> anyhow::Result<Option<NaiveDate>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Ok(Some(parse_date(s)?)),
    }
}

fn parse_sensors(value: &str) -> anyhow::Result<SensorSelection> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("all") {
        return Ok(SensorSelection::All);
    }
    let classes = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            SensorClass::parse(s).ok_or_else(|| anyhow::anyhow!("unknown sensor class '{}'", s))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(SensorSelection::only(classes))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl SearchParams {
    /// `id` takes precedence when both are given.
    pub fn query(&self) -> Option<SiteQuery> {
        let non_empty = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        non_empty(&self.id)
            .map(|id| SiteQuery::Id(SiteId::new(id).to_string()))
            .or_else(|| non_empty(&self.name).map(SiteQuery::Name))
    }
}
