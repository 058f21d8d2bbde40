use crate::error::Result;
use crate::reading::AveragingPeriod;
use crate::source::{DataSource, DistinctField, ReadingQuery};
use crate::threshold::ColorStandard;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Pollutant selected when a dashboard starts.
pub const DEFAULT_POLLUTANT: &str = "NO2";

/// Month selected when the period switches to monthly for the first time.
pub const DEFAULT_MONTH: u32 = 1;

/// The values each filter control can take, derived from the data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub boroughs: Vec<String>,
    pub pollutants: Vec<String>,
    pub sensor_types: Vec<String>,
    pub years: Vec<i32>,
    pub months: Vec<u32>,
    /// Years holding at least one reading, ascending
    #[serde(default)]
    pub data_years: Vec<i32>,
}

impl FilterOptions {
    /// Build the option lists from a data source.
    ///
    /// Years span the source's [`DataSource::year_range`]; months are the
    /// distinct months present in monthly readings.
    pub fn load(source: &dyn DataSource) -> Result<Self> {
        let boroughs = source.list_distinct_values(DistinctField::Borough)?;
        let pollutants = source.list_distinct_values(DistinctField::Pollutant)?;
        let sensor_types = source.list_distinct_values(DistinctField::SensorType)?;
        let years = source.year_range()?;

        let mut months = BTreeSet::new();
        let mut data_years = BTreeSet::new();
        for period in [AveragingPeriod::Annual, AveragingPeriod::Month] {
            for reading in source.list_readings(&ReadingQuery::new(period))? {
                data_years.insert(reading.year);
                months.extend(reading.month);
            }
        }

        log::info!(
            "[AQM] filter: {} boroughs, {} pollutants, {} sensor types, {} years",
            boroughs.len(),
            pollutants.len(),
            sensor_types.len(),
            years.len()
        );
        Ok(FilterOptions {
            boroughs: boroughs.into_iter().collect(),
            pollutants: pollutants.into_iter().collect(),
            sensor_types: sensor_types.into_iter().collect(),
            years,
            months: months.into_iter().collect(),
            data_years: data_years.into_iter().collect(),
        })
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.years.iter().copied().max()
    }

    /// The most recent year that actually has readings.
    pub fn latest_data_year(&self) -> Option<i32> {
        self.data_years.iter().copied().max()
    }

    /// Borough names paired with their short button labels.
    pub fn borough_labels(&self) -> Vec<(String, String)> {
        self.boroughs
            .iter()
            .map(|b| (b.clone(), aqm_utils::boroughs::short_label(b).to_string()))
            .collect()
    }
}

/// The working five-dimensional filter plus the color standard.
///
/// `boroughs` and `sensor_types` are never emptied through the toggle
/// operations; `month` is only consulted when `period` is
/// [`AveragingPeriod::Month`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub boroughs: BTreeSet<String>,
    pub pollutant: String,
    pub sensor_types: BTreeSet<String>,
    pub period: AveragingPeriod,
    pub year: i32,
    pub month: u32,
    pub standard: ColorStandard,
}

impl FilterSelection {
    /// Default selection for a set of options: every borough and sensor
    /// type, NO2, annual averages for the latest year with readings, WHO
    /// colors.
    ///
    /// Falls back to the current calendar year when there are no readings.
    pub fn from_options(options: &FilterOptions) -> Self {
        FilterSelection {
            boroughs: options.boroughs.iter().cloned().collect(),
            pollutant: DEFAULT_POLLUTANT.to_string(),
            sensor_types: options.sensor_types.iter().cloned().collect(),
            period: AveragingPeriod::Annual,
            year: options
                .latest_data_year()
                .or_else(|| options.latest_year())
                .unwrap_or_else(aqm_utils::dates::current_year),
            month: DEFAULT_MONTH,
            standard: ColorStandard::Who,
        }
    }

    /// The month constraint, present only for monthly averages.
    pub fn effective_month(&self) -> Option<u32> {
        match self.period {
            AveragingPeriod::Annual => None,
            AveragingPeriod::Month => Some(self.month),
        }
    }

    /// Add or remove a borough. Removing the last one is refused so the
    /// selection can always be recovered; returns whether anything changed.
    pub fn toggle_borough(&mut self, borough: &str) -> bool {
        toggle_non_empty(&mut self.boroughs, borough)
    }

    /// Add or remove a sensor type, with the same non-empty rule as boroughs.
    pub fn toggle_sensor_type(&mut self, sensor_type: &str) -> bool {
        toggle_non_empty(&mut self.sensor_types, sensor_type)
    }

    /// Set the month, clamping into 1-12.
    pub fn set_month(&mut self, month: u32) {
        self.month = month.clamp(1, 12);
    }
}

fn toggle_non_empty(set: &mut BTreeSet<String>, value: &str) -> bool {
    if set.contains(value) {
        if set.len() == 1 {
            log::debug!("[AQM] filter: refusing to deselect last value '{}'", value);
            return false;
        }
        set.remove(value)
    } else {
        set.insert(value.to_string())
    }
}
