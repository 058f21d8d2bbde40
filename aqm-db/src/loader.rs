//! Loading sensors and readings into the database.
//!
//! The merged CSV export is parsed with the same lenient rules as the
//! in-memory backend (see [`aqm_core::csv_source::parse_merged_csv`]) and
//! written in one transaction, so a failed load leaves the tables unchanged.

use crate::Database;
use aqm_core::{AveragingPeriod, Reading, Sensor};
use rusqlite::{params, Transaction};

fn insert_sensors(tx: &Transaction<'_>, sensors: &[Sensor]) -> anyhow::Result<usize> {
    let mut stmt = tx.prepare(
        "INSERT OR REPLACE INTO sensors (site_id, borough, sensor_type, site_name, lat, lon)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for s in sensors {
        stmt.execute(params![
            s.site_id.as_str(),
            s.borough,
            s.sensor_type,
            s.name,
            s.latitude,
            s.longitude
        ])?;
    }
    Ok(sensors.len())
}

fn insert_readings(tx: &Transaction<'_>, readings: &[Reading]) -> anyhow::Result<usize> {
    let mut stmt = tx.prepare(
        "INSERT OR REPLACE INTO readings (site_id, pollutant, averaging_period, year, month, value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    let mut count = 0;
    for r in readings {
        let month = match r.period {
            AveragingPeriod::Annual => 0,
            AveragingPeriod::Month => match r.month {
                Some(m) => m,
                None => {
                    log::warn!(
                        "[AQM] loader: skipping monthly reading for {} without a month",
                        r.site_id
                    );
                    continue;
                }
            },
        };
        stmt.execute(params![
            r.site_id.as_str(),
            r.pollutant,
            r.period.as_str(),
            r.year,
            month,
            r.value
        ])?;
        count += 1;
    }
    Ok(count)
}

impl Database {
    /// Insert or replace sensor metadata rows.
    pub fn load_sensors(&self, sensors: &[Sensor]) -> anyhow::Result<()> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let count = insert_sensors(&tx, sensors)?;
        tx.commit()?;
        log::info!("[AQM] loader: Loaded {} sensors", count);
        Ok(())
    }

    /// Insert or replace readings. Annual readings are stored with month 0.
    pub fn load_readings(&self, readings: &[Reading]) -> anyhow::Result<()> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let count = insert_readings(&tx, readings)?;
        tx.commit()?;
        log::info!("[AQM] loader: Loaded {} readings", count);
        Ok(())
    }

    /// Load the merged sensor CSV export.
    ///
    /// # Example CSV
    /// ```text
    /// site_code,borough,lat,lon,sensor_type,year,month,pollutant,value,date,averaging_period,site_name
    /// WA7,Wandsworth,51.46,-0.21,Automatic,2024,3,NO2,41.2,2024-03,Month,Putney High Street
    /// ```
    pub fn load_merged_csv(&self, csv_data: &str) -> anyhow::Result<()> {
        let (sensors, readings) = aqm_core::csv_source::parse_merged_csv(csv_data.as_bytes())?;
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let sensor_count = insert_sensors(&tx, &sensors)?;
        let reading_count = insert_readings(&tx, &readings)?;
        tx.commit()?;
        log::info!(
            "[AQM] loader: Loaded {} sensors and {} readings",
            sensor_count,
            reading_count
        );
        Ok(())
    }
}
