//! Command implementations for the AQM CLI.
//!
//! Each subcommand loads the merged sensor export, drives a
//! [`aqm_data::dashboard::Dashboard`] to the requested state and prints the
//! resulting render model as JSON.

use aqm_core::{AveragingPeriod, ColorStandard};
use aqm_data::dashboard::FilterChange;
use clap::{Args, Subcommand};
use std::collections::BTreeSet;

pub mod query;
pub mod source;

use source::SourceArgs;

/// Filter flags shared by every rendering subcommand. Omitted flags keep the
/// dashboard defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Borough to include (repeatable); all boroughs when omitted
    #[arg(long = "borough")]
    pub boroughs: Vec<String>,

    /// Pollutant code, e.g. NO2, PM2.5, PM10
    #[arg(long)]
    pub pollutant: Option<String>,

    /// Sensor type to include (repeatable); all types when omitted
    #[arg(long = "sensor-type")]
    pub sensor_types: Vec<String>,

    /// Averaging period: Annual or Month
    #[arg(long)]
    pub period: Option<AveragingPeriod>,

    #[arg(long)]
    pub year: Option<i32>,

    /// Month (1-12), used with `--period Month`
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,

    /// Color standard: WHO, Borough or UK
    #[arg(long)]
    pub standard: Option<ColorStandard>,
}

impl FilterArgs {
    /// The filter edits these flags describe, in application order.
    pub fn changes(&self) -> Vec<FilterChange> {
        let mut changes = Vec::new();
        if !self.boroughs.is_empty() {
            let boroughs: BTreeSet<String> = self
                .boroughs
                .iter()
                .map(|b| aqm_utils::boroughs::normalize_borough(b))
                .collect();
            changes.push(FilterChange::Boroughs(boroughs));
        }
        if let Some(pollutant) = &self.pollutant {
            changes.push(FilterChange::Pollutant(pollutant.clone()));
        }
        if !self.sensor_types.is_empty() {
            changes.push(FilterChange::SensorTypes(
                self.sensor_types.iter().cloned().collect(),
            ));
        }
        if let Some(period) = self.period {
            changes.push(FilterChange::Period(period));
        }
        if let Some(year) = self.year {
            changes.push(FilterChange::Year(year));
        }
        if let Some(month) = self.month {
            changes.push(FilterChange::Month(month));
        }
        if let Some(standard) = self.standard {
            changes.push(FilterChange::Standard(standard));
        }
        changes
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the filter options and the default filter
    Options {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Render the sensor map for a filter
    Map {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Sensor to mark as selected (repeatable)
        #[arg(long = "site")]
        sites: Vec<String>,

        #[arg(long)]
        zoom: Option<f64>,

        /// Map center latitude
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Map center longitude
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Basemap style, e.g. carto-voyager
        #[arg(long)]
        style: Option<String>,
    },

    /// List the sensors offered for selection
    Sensors {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long = "site")]
        sites: Vec<String>,
    },

    /// Time series of the selected sensors across all years
    Series {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Sensor to plot (repeatable)
        #[arg(long = "site")]
        sites: Vec<String>,
    },

    /// Average concentration per selected sensor
    Bars {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long = "site")]
        sites: Vec<String>,
    },

    /// Detailed time series with reference lines and a date window
    Detailed {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long = "site")]
        sites: Vec<String>,

        /// First date shown (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// Last date shown (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Legend layout, 0-4
        #[arg(long, default_value_t = 0)]
        legend_mode: usize,
    },

    /// Classify a single concentration
    Classify {
        /// Concentration in µg/m³
        #[arg(allow_hyphen_values = true)]
        value: f64,

        #[arg(long, default_value = "NO2")]
        pollutant: String,

        #[arg(long, default_value = "WHO")]
        standard: ColorStandard,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Options { source } => query::run_options(&source).await,
        Command::Map {
            source,
            filter,
            sites,
            zoom,
            lat,
            lon,
            style,
        } => {
            let view = query::ViewArgs {
                zoom,
                center: lat.zip(lon),
                style,
            };
            query::run_map(&source, &filter, &sites, &view).await
        }
        Command::Sensors {
            source,
            filter,
            sites,
        } => query::run_sensors(&source, &filter, &sites).await,
        Command::Series {
            source,
            filter,
            sites,
        } => query::run_series(&source, &filter, &sites).await,
        Command::Bars {
            source,
            filter,
            sites,
        } => query::run_bars(&source, &filter, &sites).await,
        Command::Detailed {
            source,
            filter,
            sites,
            start,
            end,
            legend_mode,
        } => {
            query::run_detailed(
                &source,
                &filter,
                &sites,
                start.as_deref(),
                end.as_deref(),
                legend_mode,
            )
            .await
        }
        Command::Classify {
            value,
            pollutant,
            standard,
        } => query::run_classify(value, &pollutant, standard),
    }
}
