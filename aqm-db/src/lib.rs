//! In-memory SQLite backend for London air quality sensor data.
//!
//! Loads the merged sensor CSV export into an in-memory SQLite database and
//! exposes typed query methods. [`Database`] also implements
//! [`aqm_core::DataSource`], so it can stand in for the plain in-memory
//! backend anywhere a dashboard needs one.
//!
//! # Usage
//!
//! ```rust
//! use aqm_core::{AveragingPeriod, ReadingQuery};
//! use aqm_db::Database;
//!
//! let db = Database::new().unwrap();
//! db.load_merged_csv(
//!     "site_code,borough,lat,lon,sensor_type,year,pollutant,value,averaging_period\n\
//!      WA7,Wandsworth,51.46,-0.21,Automatic,2024,NO2,38.1,Annual\n",
//! )
//! .unwrap();
//!
//! let sensors = db.query_sensors().unwrap();
//! assert_eq!(sensors.len(), 1);
//! let readings = db
//!     .query_readings(&ReadingQuery::new(AveragingPeriod::Annual).with_pollutant("NO2"))
//!     .unwrap();
//! assert_eq!(readings[0].value, 38.1);
//! ```
//!
//! # Tables
//!
//! See [`schema::create_schema`] for the full SQL schema.

pub mod schema;
mod loader;
mod queries;
mod source;

use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory SQLite database holding sensors and readings.
///
/// Cheaply cloneable; clones share one connection behind a mutex so the
/// database can be handed to several threads.
///
/// # Example
///
/// ```rust
/// use aqm_db::Database;
///
/// let db = Database::new().unwrap();
/// let db2 = db.clone();
/// db.load_merged_csv(
///     "site_code,borough,sensor_type,year,pollutant,value,averaging_period\n\
///      ME9,Merton,Clarity,2023,PM2.5,9.5,Annual\n",
/// )
/// .unwrap();
/// assert_eq!(db2.query_sensors().unwrap().len(), 1);
/// ```
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Create a new in-memory database with the full schema applied.
    pub fn new() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::create_schema())?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn connection(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_creates_successfully() {
        let db = Database::new();
        assert!(db.is_ok(), "Database should create without errors");
    }

    #[test]
    fn database_starts_empty() {
        let db = Database::new().unwrap();
        assert!(db.query_sensors().unwrap().is_empty());
        assert!(db.query_year_range().unwrap().is_empty());
    }

    #[test]
    fn database_is_shareable_across_threads() {
        let db = Database::new().unwrap();
        let writer = db.clone();
        std::thread::spawn(move || {
            writer
                .load_merged_csv(
                    "site_code,borough,sensor_type,year,pollutant,value,averaging_period\n\
                     RI1,Richmond,Automatic,2024,NO2,12.0,Annual\n",
                )
                .unwrap();
        })
        .join()
        .unwrap();
        assert_eq!(db.query_sensors().unwrap().len(), 1);
    }
}
