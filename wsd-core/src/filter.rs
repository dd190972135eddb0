//! Filter state shared by the observation reader and every view.
//!
//! A [`FilterState`] is an immutable value. Changes go through
//! [`FilterContext::update`], which validates a whole batch of
//! [`FilterUpdate`]s against a copy and swaps it in only if every update
//! succeeds, so a recomputation never observes a half-applied filter.

use crate::date_range::DateRange;
use crate::observation::{Observation, SensorClass};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

/// Which sensor classes pass the filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorSelection {
    /// No restriction; rows without a sensor id also pass.
    All,
    /// Only the listed classes. An empty set is a valid "show nothing" state.
    Only(BTreeSet<SensorClass>),
}

impl SensorSelection {
    pub fn only(classes: impl IntoIterator<Item = SensorClass>) -> Self {
        SensorSelection::Only(classes.into_iter().collect())
    }

    pub fn admits(&self, class: Option<SensorClass>) -> bool {
        match self {
            SensorSelection::All => true,
            SensorSelection::Only(set) => class.is_some_and(|c| set.contains(&c)),
        }
    }

    /// Whether rows of `class` can appear at all under this selection.
    pub fn includes(&self, class: SensorClass) -> bool {
        self.admits(Some(class))
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, SensorSelection::All)
    }
}

/// Inclusion policy for rows carrying an error/quality flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagPolicy {
    #[default]
    Exclude,
    Include,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterState {
    /// `None` means the full extent of the data.
    pub date_range: Option<DateRange>,
    pub sensors: SensorSelection,
    pub flags: FlagPolicy,
}

impl Default for FilterState {
    fn default() -> Self {
        FilterState {
            date_range: None,
            sensors: SensorSelection::All,
            flags: FlagPolicy::Exclude,
        }
    }
}

/// A change coming from one dashboard control.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterUpdate {
    DateRange { start: NaiveDate, end: NaiveDate },
    ClearDateRange,
    Sensors(SensorSelection),
    Flags(FlagPolicy),
}

impl FilterState {
    /// Return the state with `update` applied, leaving `self` untouched.
    pub fn apply(&self, update: FilterUpdate) -> anyhow::Result<FilterState> {
        let mut next = self.clone();
        match update {
            FilterUpdate::DateRange { start, end } => {
                next.date_range = Some(DateRange::new(start, end)?);
            }
            FilterUpdate::ClearDateRange => next.date_range = None,
            FilterUpdate::Sensors(selection) => next.sensors = selection,
            FilterUpdate::Flags(policy) => next.flags = policy,
        }
        Ok(next)
    }

    pub fn admits(&self, obs: &Observation) -> bool {
        if let Some(range) = &self.date_range {
            if !range.contains(&obs.date) {
                return false;
            }
        }
        if obs.flagged && self.flags == FlagPolicy::Exclude {
            return false;
        }
        self.sensors.admits(obs.sensor_class)
    }
}

/// Holder of the current filter for one session.
#[derive(Debug, Clone, Default)]
pub struct FilterContext {
    current: FilterState,
}

impl FilterContext {
    pub fn new(initial: FilterState) -> Self {
        FilterContext { current: initial }
    }

    pub fn current(&self) -> &FilterState {
        &self.current
    }

    /// Apply a batch of updates atomically.
    ///
    /// On error the context keeps its previous state.
    pub fn update(&mut self, updates: impl IntoIterator<Item = FilterUpdate>) -> anyhow::Result<()> {
        let mut next = self.current.clone();
        for update in updates {
            next = next.apply(update)?;
        }
        self.current = next;
        Ok(())
    }
}
