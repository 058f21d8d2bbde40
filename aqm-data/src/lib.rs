//! Filtering, selection, view state and chart aggregation for air quality
//! sensor data.
//!
//! This crate turns a [`DataSource`](aqm_core::DataSource) and the current
//! filter, selection and map view into render models for the map, the
//! sensor dropdown and the three charts.
//!
//! - [`filter_engine`] resolves a filter into eligible sensors and their values
//! - [`aggregate`] builds per-sensor time series and bar averages
//! - [`selection`] and [`view`] hold the user-driven selection and map view
//! - [`render`] assembles the render models
//! - [`cache`], [`sequence`] and [`dashboard`] tie everything together for a
//!   long-lived, multi-threaded session
//!
//! # Usage
//!
//! ```rust
//! use aqm_core::{FilterOptions, FilterSelection, MemorySource};
//! use aqm_data::filter_engine::FilterEngine;
//!
//! let source = MemorySource::from_csv_str(
//!     "site_code,borough,lat,lon,sensor_type,year,pollutant,value,averaging_period\n\
//!      R1,Richmond,51.44,-0.30,Automatic,2024,NO2,12.0,Annual\n",
//! )
//! .unwrap();
//! let options = FilterOptions::load(&source).unwrap();
//! let filter = FilterSelection::from_options(&options);
//! assert_eq!(filter.year, 2024);
//!
//! let resolution = FilterEngine::new(&source).resolve(&filter).unwrap();
//! assert_eq!(resolution.eligible.len(), 1);
//! assert_eq!(resolution.value_for(&"R1".into()), Some(12.0));
//! ```

pub mod aggregate;
pub mod cache;
pub mod dashboard;
pub mod filter_engine;
pub mod render;
pub mod selection;
pub mod sequence;
pub mod view;

/// Regulatory reference levels drawn as guide lines on the charts.
pub mod reference {
    use serde::Serialize;

    /// Pollutants with fixed guideline and legal-limit constants.
    pub const REGULATED_POLLUTANTS: [&str; 3] = ["NO2", "PM2.5", "PM10"];

    /// Annual-mean guideline and limit values in µg/m³.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
    pub struct ReferenceLevels {
        pub who: Option<f64>,
        pub uk: Option<f64>,
    }

    impl ReferenceLevels {
        pub fn is_empty(&self) -> bool {
            self.who.is_none() && self.uk.is_none()
        }
    }

    pub fn reference_levels(pollutant: &str) -> ReferenceLevels {
        match pollutant {
            "NO2" => ReferenceLevels {
                who: Some(10.0),
                uk: Some(40.0),
            },
            "PM2.5" => ReferenceLevels {
                who: Some(5.0),
                uk: Some(20.0),
            },
            "PM10" => ReferenceLevels {
                who: Some(15.0),
                uk: Some(40.0),
            },
            _ => ReferenceLevels::default(),
        }
    }

    /// Lowest y-axis ceiling for a pollutant, keeping reference lines on screen.
    pub fn regulatory_floor(pollutant: &str) -> f64 {
        match pollutant {
            "NO2" => 50.0,
            "PM2.5" | "PM10" => 30.0,
            _ => 0.0,
        }
    }

    /// Upper y-axis bound: `max(1.05 * max_observed, regulatory_floor)`.
    ///
    /// Falls back to 1.0 when there is nothing to show and no floor applies,
    /// so the axis never collapses to zero height.
    pub fn y_axis_max(max_observed: Option<f64>, pollutant: &str) -> f64 {
        let observed = max_observed.filter(|v| v.is_finite()).unwrap_or(0.0);
        let upper = (1.05 * observed).max(regulatory_floor(pollutant));
        if upper > 0.0 {
            upper
        } else {
            1.0
        }
    }

}
