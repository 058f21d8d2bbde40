//! Core types for London air quality sensor data.
//!
//! This crate holds the domain model shared by every other `aqm-*` crate:
//!
//! - [`sensor`] - sensor metadata and site identifiers
//! - [`reading`] - averaged pollutant concentrations
//! - [`threshold`] - the band tables for each pollutant and color standard
//! - [`classify`] - value to color classification
//! - [`source`] - the [`DataSource`] contract backends implement
//! - [`csv_source`] - an in-memory backend over the merged CSV export
//! - [`filter`] - filter option lists and the working filter selection
//!
//! # Usage
//!
//! ```rust
//! use aqm_core::{ColorClassifier, ColorStandard, DataSource, MemorySource};
//!
//! let csv = "site_code,borough,lat,lon,sensor_type,year,pollutant,value,averaging_period\n\
//!            RI1,Richmond,51.44,-0.30,Automatic,2024,NO2,12.0,Annual\n";
//! let source = MemorySource::from_csv_str(csv).unwrap();
//! assert_eq!(source.list_sensors().unwrap().len(), 1);
//!
//! let color = ColorClassifier::default().classify(Some(12.0), "NO2", ColorStandard::Who);
//! assert_eq!(color.label, "Good");
//! ```

pub mod classify;
pub mod csv_source;
pub mod error;
pub mod filter;
pub mod reading;
pub mod sensor;
pub mod source;
pub mod threshold;

pub use classify::{ColorClassification, ColorClassifier, NEUTRAL_COLOR};
pub use csv_source::MemorySource;
pub use error::{AqmError, Result};
pub use filter::{FilterOptions, FilterSelection};
pub use reading::{AveragingPeriod, Reading};
pub use sensor::{Sensor, SiteId};
pub use source::{DataSource, DistinctField, ReadingQuery};
pub use threshold::{ColorBand, ColorStandard, ThresholdCatalog};
