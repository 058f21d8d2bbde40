//! Typed query methods over the sensor database.

use crate::Database;
use aqm_core::{AveragingPeriod, DistinctField, Reading, ReadingQuery, Sensor, SiteId};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Row};
use std::collections::BTreeSet;

const SENSOR_COLUMNS: &str = "site_id, borough, sensor_type, site_name, lat, lon";

fn sensor_from_row(row: &Row<'_>) -> rusqlite::Result<Sensor> {
    Ok(Sensor {
        site_id: SiteId::new(row.get::<_, String>(0)?),
        borough: row.get(1)?,
        sensor_type: row.get(2)?,
        name: row.get(3)?,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
    })
}

/// Append `column IN (?, ?, ...)` for a constraint set.
fn push_in_clause<T, F>(
    clauses: &mut Vec<String>,
    values: &mut Vec<Value>,
    column: &str,
    set: &Option<BTreeSet<T>>,
    to_value: F,
) where
    F: Fn(&T) -> Value,
{
    if let Some(set) = set {
        let placeholders = vec!["?"; set.len()].join(", ");
        clauses.push(format!("{} IN ({})", column, placeholders));
        values.extend(set.iter().map(to_value));
    }
}

impl Database {
    /// All sensors, ordered by site id.
    pub fn query_sensors(&self) -> anyhow::Result<Vec<Sensor>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sensors ORDER BY site_id",
            SENSOR_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], sensor_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        log::info!("[AQM] query: query_sensors returned {} records", rows.len());
        Ok(rows)
    }

    /// Sensors that have at least one reading, ordered by site id.
    pub fn query_active_sensors(&self) -> anyhow::Result<Vec<Sensor>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM active_sensors ORDER BY site_id",
            SENSOR_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], sensor_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        log::info!(
            "[AQM] query: query_active_sensors returned {} records",
            rows.len()
        );
        Ok(rows)
    }

    /// Readings matching every constraint of `query`, ordered by site then date.
    pub fn query_readings(&self, query: &ReadingQuery) -> anyhow::Result<Vec<Reading>> {
        if query.is_empty_match() {
            return Ok(Vec::new());
        }
        let mut clauses = vec!["averaging_period = ?".to_string()];
        let mut values = vec![Value::Text(query.period.as_str().to_string())];
        push_in_clause(&mut clauses, &mut values, "site_id", &query.site_ids, |s| {
            Value::Text(s.as_str().to_string())
        });
        push_in_clause(&mut clauses, &mut values, "pollutant", &query.pollutants, |p| {
            Value::Text(p.clone())
        });
        push_in_clause(&mut clauses, &mut values, "year", &query.years, |y| {
            Value::Integer(i64::from(*y))
        });
        push_in_clause(&mut clauses, &mut values, "month", &query.months, |m| {
            Value::Integer(i64::from(*m))
        });

        let sql = format!(
            "SELECT site_id, pollutant, year, month, value FROM readings
             WHERE {}
             ORDER BY site_id, year, month",
            clauses.join(" AND ")
        );
        let period = query.period;
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                let month: u32 = row.get(3)?;
                Ok(Reading {
                    site_id: SiteId::new(row.get::<_, String>(0)?),
                    pollutant: row.get(1)?,
                    period,
                    year: row.get(2)?,
                    month: match period {
                        AveragingPeriod::Annual => None,
                        AveragingPeriod::Month => Some(month),
                    },
                    value: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        log::info!("[AQM] query: query_readings returned {} records", rows.len());
        Ok(rows)
    }

    /// Distinct filter values. Boroughs and sensor types come from active
    /// sensors only; pollutants from the readings table.
    pub fn query_distinct(&self, field: DistinctField) -> anyhow::Result<BTreeSet<String>> {
        let sql = match field {
            DistinctField::Borough => "SELECT DISTINCT borough FROM active_sensors",
            DistinctField::SensorType => "SELECT DISTINCT sensor_type FROM active_sensors",
            DistinctField::Pollutant => "SELECT DISTINCT pollutant FROM readings",
        };
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql)?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        log::info!(
            "[AQM] query: query_distinct({:?}) returned {} values",
            field,
            values.len()
        );
        Ok(values)
    }

    /// Every year from the earliest reading to the current calendar year.
    pub fn query_year_range(&self) -> anyhow::Result<Vec<i32>> {
        let conn = self.connection()?;
        let first: Option<i32> =
            conn.query_row("SELECT MIN(year) FROM readings", [], |row| row.get(0))?;
        Ok(match first {
            Some(first) => (first..=aqm_utils::dates::current_year().max(first)).collect(),
            None => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use aqm_core::{AveragingPeriod, DistinctField, ReadingQuery, SiteId};

    const CSV: &str = "\
site_code,borough,lat,lon,sensor_type,year,month,pollutant,value,date,averaging_period,site_name
RI1,Richmond,51.4452,-0.2967,Automatic,2023,,NO2,18.0,2023,Annual,Castelnau
RI1,Richmond,51.4452,-0.2967,Automatic,2024,,NO2,12.0,2024,Annual,Castelnau
RI1,Richmond,51.4452,-0.2967,Automatic,2024,3,NO2,14.5,2024-03,Month,Castelnau
WA7,Wandsworth,51.4633,-0.2153,Automatic,2024,,NO2,38.1,2024,Annual,Putney High Street
WA7,Wandsworth,51.4633,-0.2153,Automatic,2024,3,NO2,41.0,2024-03,Month,Putney High Street
ME9,Merton,51.40,-0.19,Clarity,2024,,PM2.5,9.5,2024,Annual,Morden Road
";

    fn sample_db() -> Database {
        let db = Database::new().unwrap();
        db.load_merged_csv(CSV).unwrap();
        db
    }

    #[test]
    fn query_sensors_ordered_by_id() {
        let db = sample_db();
        let ids: Vec<String> = db
            .query_sensors()
            .unwrap()
            .into_iter()
            .map(|s| s.site_id.to_string())
            .collect();
        assert_eq!(ids, vec!["ME9", "RI1", "WA7"]);
    }

    #[test]
    fn active_sensors_exclude_sensors_without_readings() {
        let db = sample_db();
        let mut idle = db.query_sensors().unwrap().remove(0);
        idle.site_id = SiteId::new("KT1");
        idle.borough = "Kingston".to_string();
        db.load_sensors(&[idle]).unwrap();

        assert_eq!(db.query_sensors().unwrap().len(), 4);
        assert_eq!(db.query_active_sensors().unwrap().len(), 3);
        let boroughs = db.query_distinct(DistinctField::Borough).unwrap();
        assert!(!boroughs.contains("Kingston"));
    }

    #[test]
    fn query_readings_applies_in_lists() {
        let db = sample_db();
        let query = ReadingQuery::new(AveragingPeriod::Annual)
            .with_pollutant("NO2")
            .with_years([2024])
            .with_sites([SiteId::new("RI1"), SiteId::new("WA7")]);
        let rows = db.query_readings(&query).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.year == 2024 && r.month.is_none()));
    }

    #[test]
    fn query_readings_monthly_filters_by_month() {
        let db = sample_db();
        let query = ReadingQuery::new(AveragingPeriod::Month).with_months([3]);
        let rows = db.query_readings(&query).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.month == Some(3)));

        let none = db
            .query_readings(&ReadingQuery::new(AveragingPeriod::Month).with_months([4]))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn empty_constraint_matches_nothing() {
        let db = sample_db();
        let query = ReadingQuery::new(AveragingPeriod::Annual).with_sites(Vec::new());
        assert!(db.query_readings(&query).unwrap().is_empty());
    }

    #[test]
    fn distinct_pollutants_and_year_range() {
        let db = sample_db();
        let pollutants = db.query_distinct(DistinctField::Pollutant).unwrap();
        assert_eq!(
            pollutants.into_iter().collect::<Vec<_>>(),
            vec!["NO2", "PM2.5"]
        );
        let years = db.query_year_range().unwrap();
        assert_eq!(years.first(), Some(&2023));
        assert!(years.len() >= 2);
    }
}
