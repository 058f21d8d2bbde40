//! Per-sensor time series and bar averages for the charts.

use aqm_core::{AveragingPeriod, DataSource, ReadingQuery, Result, SiteId};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One chart point; the date is synthesized from the reading's period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarAverage {
    pub site_id: SiteId,
    pub mean: f64,
}

/// Inclusive date bounds for the detailed chart; open on a missing side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

pub type TimeSeries = BTreeMap<SiteId, Vec<SeriesPoint>>;

pub struct ChartAggregator<'a> {
    source: &'a dyn DataSource,
}

impl<'a> ChartAggregator<'a> {
    pub fn new(source: &'a dyn DataSource) -> Self {
        Self { source }
    }

    /// Every reading of `pollutant`/`period` for the given sensors, across all
    /// years (and months), sorted ascending by date per sensor.
    ///
    /// Sensors without readings are omitted rather than mapped to an empty
    /// series.
    pub fn time_series(
        &self,
        sensors: &BTreeSet<SiteId>,
        pollutant: &str,
        period: AveragingPeriod,
    ) -> Result<TimeSeries> {
        self.time_series_within(sensors, pollutant, period, DateWindow::default())
    }

    /// [`time_series`](Self::time_series) restricted to `window`.
    pub fn time_series_within(
        &self,
        sensors: &BTreeSet<SiteId>,
        pollutant: &str,
        period: AveragingPeriod,
        window: DateWindow,
    ) -> Result<TimeSeries> {
        if sensors.is_empty() {
            return Ok(TimeSeries::new());
        }
        let query = ReadingQuery::new(period)
            .with_sites(sensors.iter().cloned())
            .with_pollutant(pollutant);

        let mut series = TimeSeries::new();
        for reading in self.source.list_readings(&query)? {
            if !sensors.contains(&reading.site_id) || reading.value.is_nan() {
                continue;
            }
            let Some(date) = reading.date() else {
                continue;
            };
            if !window.contains(date) {
                continue;
            }
            series.entry(reading.site_id).or_default().push(SeriesPoint {
                date,
                value: reading.value,
            });
        }
        for points in series.values_mut() {
            points.sort_by_key(|p| p.date);
        }
        log::info!(
            "[AQM] aggregate: {} series for {} requested sensors",
            series.len(),
            sensors.len()
        );
        Ok(series)
    }

    /// Mean value per sensor for one year (and month, for monthly averages),
    /// sorted by mean descending with ties broken by site id ascending.
    pub fn bar_averages(
        &self,
        sensors: &BTreeSet<SiteId>,
        pollutant: &str,
        period: AveragingPeriod,
        year: i32,
        month: Option<u32>,
    ) -> Result<Vec<BarAverage>> {
        if sensors.is_empty() {
            return Ok(Vec::new());
        }
        let mut query = ReadingQuery::new(period)
            .with_sites(sensors.iter().cloned())
            .with_pollutant(pollutant)
            .with_years([year]);
        if period == AveragingPeriod::Month {
            if let Some(month) = month {
                query = query.with_months([month]);
            }
        }

        let mut sums: BTreeMap<SiteId, (f64, u32)> = BTreeMap::new();
        for reading in self.source.list_readings(&query)? {
            if !sensors.contains(&reading.site_id) || reading.value.is_nan() {
                continue;
            }
            let entry = sums.entry(reading.site_id).or_insert((0.0, 0));
            entry.0 += reading.value;
            entry.1 += 1;
        }

        let mut bars: Vec<BarAverage> = sums
            .into_iter()
            .map(|(site_id, (sum, count))| BarAverage {
                site_id,
                mean: sum / f64::from(count),
            })
            .collect();
        bars.sort_by(|a, b| {
            b.mean
                .total_cmp(&a.mean)
                .then_with(|| a.site_id.cmp(&b.site_id))
        });
        Ok(bars)
    }
}

/// Largest value across every series, if any.
pub fn max_series_value(series: &TimeSeries) -> Option<f64> {
    series
        .values()
        .flatten()
        .map(|p| p.value)
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
}
