//! The read-only contract every sensor data backend satisfies.
//!
//! Backends (in-memory CSV, remote CSV, relational store) return empty
//! collections when nothing matches and fail with
//! [`AqmError::DataUnavailable`](crate::error::AqmError::DataUnavailable)
//! only when the store cannot be reached or its data cannot be read.

use crate::error::Result;
use crate::reading::{AveragingPeriod, Reading};
use crate::sensor::{Sensor, SiteId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Sensor attributes whose distinct values populate the filter options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistinctField {
    Borough,
    Pollutant,
    SensorType,
}

/// Reading query: every `Some` constraint must match, `None` matches all.
///
/// An empty set matches nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingQuery {
    pub site_ids: Option<BTreeSet<SiteId>>,
    pub pollutants: Option<BTreeSet<String>>,
    pub period: AveragingPeriod,
    pub years: Option<BTreeSet<i32>>,
    pub months: Option<BTreeSet<u32>>,
}

impl ReadingQuery {
    pub fn new(period: AveragingPeriod) -> Self {
        ReadingQuery {
            period,
            ..Default::default()
        }
    }

    pub fn with_sites<I: IntoIterator<Item = SiteId>>(mut self, sites: I) -> Self {
        self.site_ids = Some(sites.into_iter().collect());
        self
    }

    pub fn with_pollutant(mut self, pollutant: &str) -> Self {
        self.pollutants = Some(BTreeSet::from([pollutant.to_string()]));
        self
    }

    pub fn with_years<I: IntoIterator<Item = i32>>(mut self, years: I) -> Self {
        self.years = Some(years.into_iter().collect());
        self
    }

    pub fn with_months<I: IntoIterator<Item = u32>>(mut self, months: I) -> Self {
        self.months = Some(months.into_iter().collect());
        self
    }

    /// True when the query can only match nothing, so backends may skip I/O.
    pub fn is_empty_match(&self) -> bool {
        self.site_ids.as_ref().is_some_and(BTreeSet::is_empty)
            || self.pollutants.as_ref().is_some_and(BTreeSet::is_empty)
            || self.years.as_ref().is_some_and(BTreeSet::is_empty)
            || self.months.as_ref().is_some_and(BTreeSet::is_empty)
    }

    pub fn matches(&self, reading: &Reading) -> bool {
        if reading.period != self.period {
            return false;
        }
        if let Some(sites) = &self.site_ids {
            if !sites.contains(&reading.site_id) {
                return false;
            }
        }
        if let Some(pollutants) = &self.pollutants {
            if !pollutants.contains(&reading.pollutant) {
                return false;
            }
        }
        if let Some(years) = &self.years {
            if !years.contains(&reading.year) {
                return false;
            }
        }
        if let Some(months) = &self.months {
            match reading.month {
                Some(month) if months.contains(&month) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Read-only access to sensor metadata and readings.
pub trait DataSource: Send + Sync {
    /// All sensors with their metadata.
    fn list_sensors(&self) -> Result<Vec<Sensor>>;

    /// Readings matching `query`.
    fn list_readings(&self, query: &ReadingQuery) -> Result<Vec<Reading>>;

    /// Distinct values of `field`, used to populate filter option lists.
    fn list_distinct_values(&self, field: DistinctField) -> Result<BTreeSet<String>>;

    /// Every year from the earliest reading to the current calendar year.
    ///
    /// Empty when the source holds no readings.
    fn year_range(&self) -> Result<Vec<i32>> {
        let mut first: Option<i32> = None;
        for period in [AveragingPeriod::Annual, AveragingPeriod::Month] {
            for reading in self.list_readings(&ReadingQuery::new(period))? {
                first = Some(first.map_or(reading.year, |y| y.min(reading.year)));
            }
        }
        Ok(match first {
            Some(first) => (first..=aqm_utils::dates::current_year().max(first)).collect(),
            None => Vec::new(),
        })
    }
}

impl<T: DataSource + ?Sized> DataSource for Box<T> {
    fn list_sensors(&self) -> Result<Vec<Sensor>> {
        (**self).list_sensors()
    }

    fn list_readings(&self, query: &ReadingQuery) -> Result<Vec<Reading>> {
        (**self).list_readings(query)
    }

    fn list_distinct_values(&self, field: DistinctField) -> Result<BTreeSet<String>> {
        (**self).list_distinct_values(field)
    }

    fn year_range(&self) -> Result<Vec<i32>> {
        (**self).year_range()
    }
}

impl<T: DataSource + ?Sized> DataSource for Arc<T> {
    fn list_sensors(&self) -> Result<Vec<Sensor>> {
        (**self).list_sensors()
    }

    fn list_readings(&self, query: &ReadingQuery) -> Result<Vec<Reading>> {
        (**self).list_readings(query)
    }

    fn list_distinct_values(&self, field: DistinctField) -> Result<BTreeSet<String>> {
        (**self).list_distinct_values(field)
    }

    fn year_range(&self) -> Result<Vec<i32>> {
        (**self).year_range()
    }
}
