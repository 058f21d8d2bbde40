use crate::error::AqmError;
use crate::sensor::SiteId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, str::FromStr};

/// The temporal granularity of a reading: one value per year or per month.
#[derive(Debug, Default, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum AveragingPeriod {
    #[default]
    Annual,
    Month,
}

impl AveragingPeriod {
    /// Label used by the data sources and the CSV exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            AveragingPeriod::Annual => "Annual",
            AveragingPeriod::Month => "Month",
        }
    }
}

impl fmt::Display for AveragingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AveragingPeriod {
    type Err = AqmError;

    /// Accepts the legacy "Year" label used by older automatic-sensor exports.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "annual" | "year" | "yearly" => Ok(AveragingPeriod::Annual),
            "month" | "monthly" => Ok(AveragingPeriod::Month),
            _ => Err(AqmError::Unrecognized {
                kind: "averaging period",
                value: s.to_string(),
            }),
        }
    }
}

/// A single averaged concentration for one site, pollutant and period.
///
/// `month` is present only for [`AveragingPeriod::Month`] readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub site_id: SiteId,
    pub pollutant: String,
    pub period: AveragingPeriod,
    pub year: i32,
    pub month: Option<u32>,
    /// Concentration in µg/m³
    pub value: f64,
}

impl Reading {
    pub fn annual(site_id: impl Into<SiteId>, pollutant: &str, year: i32, value: f64) -> Self {
        Reading {
            site_id: site_id.into(),
            pollutant: pollutant.to_string(),
            period: AveragingPeriod::Annual,
            year,
            month: None,
            value,
        }
    }

    pub fn monthly(
        site_id: impl Into<SiteId>,
        pollutant: &str,
        year: i32,
        month: u32,
        value: f64,
    ) -> Self {
        Reading {
            site_id: site_id.into(),
            pollutant: pollutant.to_string(),
            period: AveragingPeriod::Month,
            year,
            month: Some(month),
            value,
        }
    }

    /// The date a chart plots this reading at (Jan 1 for annual readings,
    /// the 1st of the month otherwise).
    pub fn date(&self) -> Option<NaiveDate> {
        let month = match self.period {
            AveragingPeriod::Annual => None,
            AveragingPeriod::Month => self.month,
        };
        aqm_utils::dates::period_date(self.year, month)
    }

    /// Ordering key used for chronological sorting within one site.
    fn sort_key(&self) -> (i32, u32) {
        (self.year, self.month.unwrap_or(0))
    }

    /// Chronological comparison of two readings; ties keep their order.
    pub fn cmp_chronological(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}
