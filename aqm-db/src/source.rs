use crate::Database;
use aqm_core::{AqmError, DataSource, DistinctField, Reading, ReadingQuery, Sensor};
use std::collections::BTreeSet;

fn unavailable(err: anyhow::Error) -> AqmError {
    log::error!("[AQM] query: database error: {:#}", err);
    AqmError::unavailable(format!("{:#}", err))
}

impl DataSource for Database {
    fn list_sensors(&self) -> aqm_core::Result<Vec<Sensor>> {
        self.query_sensors().map_err(unavailable)
    }

    fn list_readings(&self, query: &ReadingQuery) -> aqm_core::Result<Vec<Reading>> {
        self.query_readings(query).map_err(unavailable)
    }

    fn list_distinct_values(&self, field: DistinctField) -> aqm_core::Result<BTreeSet<String>> {
        self.query_distinct(field).map_err(unavailable)
    }

    fn year_range(&self) -> aqm_core::Result<Vec<i32>> {
        self.query_year_range().map_err(unavailable)
    }
}
