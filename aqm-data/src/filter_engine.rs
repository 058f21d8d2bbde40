//! Resolves a [`FilterSelection`] against a data source.

use crate::render::DropdownOption;
use aqm_core::{DataSource, FilterSelection, ReadingQuery, Result, Sensor, SiteId};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// The outcome of resolving a filter.
///
/// `eligible` holds every sensor meeting the borough and type constraints,
/// once per site id. `values` holds the matching reading value for the
/// subset of those sensors that have one; sensors without a value are still
/// eligible and drawn as plain markers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub eligible: Vec<Sensor>,
    pub values: BTreeMap<SiteId, f64>,
}

impl Resolution {
    pub fn value_for(&self, site_id: &SiteId) -> Option<f64> {
        self.values.get(site_id).copied()
    }

    pub fn eligible_ids(&self) -> BTreeSet<SiteId> {
        self.eligible.iter().map(|s| s.site_id.clone()).collect()
    }

    /// Eligible sensors paired with their value, if any.
    pub fn sensors_with_values(&self) -> impl Iterator<Item = (&Sensor, Option<f64>)> {
        self.eligible
            .iter()
            .map(|s| (s, self.values.get(&s.site_id).copied()))
    }
}

pub struct FilterEngine<'a> {
    source: &'a dyn DataSource,
}

impl<'a> FilterEngine<'a> {
    pub fn new(source: &'a dyn DataSource) -> Self {
        Self { source }
    }

    /// Sensors whose borough and sensor type are selected, deduplicated by
    /// site id with the first occurrence kept.
    pub fn eligible_sensors(&self, filter: &FilterSelection) -> Result<Vec<Sensor>> {
        let mut seen = HashSet::new();
        let eligible: Vec<Sensor> = self
            .source
            .list_sensors()?
            .into_iter()
            .filter(|s| {
                filter.boroughs.contains(&s.borough)
                    && filter.sensor_types.contains(&s.sensor_type)
            })
            .filter(|s| seen.insert(s.site_id.clone()))
            .collect();
        Ok(eligible)
    }

    /// Resolve `filter` into eligible sensors and one value per sensor.
    ///
    /// Fails only with `DataUnavailable`; an empty match is an empty
    /// [`Resolution`].
    pub fn resolve(&self, filter: &FilterSelection) -> Result<Resolution> {
        let eligible = self.eligible_sensors(filter)?;
        if eligible.is_empty() {
            log::info!("[AQM] engine: no sensors match the borough/type filter");
            return Ok(Resolution::default());
        }

        let ids: BTreeSet<SiteId> = eligible.iter().map(|s| s.site_id.clone()).collect();
        let mut query = ReadingQuery::new(filter.period)
            .with_sites(ids.iter().cloned())
            .with_pollutant(&filter.pollutant)
            .with_years([filter.year]);
        if let Some(month) = filter.effective_month() {
            query = query.with_months([month]);
        }

        let mut values = BTreeMap::new();
        for reading in self.source.list_readings(&query)? {
            if !ids.contains(&reading.site_id) || reading.value.is_nan() {
                continue;
            }
            if values.contains_key(&reading.site_id) {
                log::warn!(
                    "[AQM] engine: duplicate {} reading for {} in {}, keeping the first",
                    reading.pollutant,
                    reading.site_id,
                    reading.year
                );
                continue;
            }
            values.insert(reading.site_id, reading.value);
        }

        log::info!(
            "[AQM] engine: resolved {} eligible sensors, {} with values",
            eligible.len(),
            values.len()
        );
        Ok(Resolution { eligible, values })
    }

    /// Dropdown entries for the sensors eligible under `filter`, sorted by id.
    pub fn dropdown_options(&self, filter: &FilterSelection) -> Result<Vec<DropdownOption>> {
        let mut options: Vec<DropdownOption> = self
            .eligible_sensors(filter)?
            .iter()
            .map(DropdownOption::for_sensor)
            .collect();
        options.sort_by(|a, b| a.value.cmp(&b.value));
        Ok(options)
    }
}
