use aqm_core::{DataSource, DistinctField, Reading, ReadingQuery, Result, Sensor};
use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

/// Wraps a [`DataSource`] and caches its sensor metadata.
///
/// Sensor lists and distinct filter values are kept until
/// [`invalidate`](Self::invalidate) is called; there is no time-based expiry.
/// Readings always go to the inner source.
pub struct CachedSource<S> {
    inner: S,
    sensors: RwLock<Option<Vec<Sensor>>>,
    distinct: RwLock<HashMap<DistinctField, BTreeSet<String>>>,
}

impl<S: DataSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        CachedSource {
            inner,
            sensors: RwLock::new(None),
            distinct: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop all cached metadata; the next lookup refetches it.
    pub fn invalidate(&self) {
        *self.sensors.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.distinct
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        log::info!("[AQM] cache: sensor metadata invalidated");
    }

    pub fn is_warm(&self) -> bool {
        self.sensors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<S: DataSource> DataSource for CachedSource<S> {
    fn list_sensors(&self) -> Result<Vec<Sensor>> {
        if let Some(sensors) = self
            .sensors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(sensors.clone());
        }
        // Fetch without holding the lock; a concurrent fill stores the same data.
        let sensors = self.inner.list_sensors()?;
        log::info!("[AQM] cache: cached {} sensors", sensors.len());
        *self.sensors.write().unwrap_or_else(PoisonError::into_inner) = Some(sensors.clone());
        Ok(sensors)
    }

    fn list_readings(&self, query: &ReadingQuery) -> Result<Vec<Reading>> {
        self.inner.list_readings(query)
    }

    fn list_distinct_values(&self, field: DistinctField) -> Result<BTreeSet<String>> {
        if let Some(values) = self
            .distinct
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&field)
        {
            return Ok(values.clone());
        }
        let values = self.inner.list_distinct_values(field)?;
        self.distinct
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(field, values.clone());
        Ok(values)
    }

    fn year_range(&self) -> Result<Vec<i32>> {
        self.inner.year_range()
    }
}
