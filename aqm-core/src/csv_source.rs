//! In-memory [`DataSource`] built from the merged sensor CSV export.
//!
//! The merged export repeats sensor metadata on every reading row:
//!
//! ```text
//! site_code,borough,lat,lon,sensor_type,year,month,pollutant,value,date,averaging_period,site_name
//! RI1,Richmond upon Thames,51.45,-0.30,Automatic,2024,1,NO2,12.0,2024,Annual,Castelnau
//! ```
//!
//! The relational backend names the id column `id_site`; both spellings are
//! accepted. `lat`, `lon`, `month`, `date` and `site_name` are optional
//! columns. The same text can come from a local file, a gzip-compressed
//! file, or an HTTP response body.

use crate::error::{AqmError, Result};
use crate::reading::{AveragingPeriod, Reading};
use crate::sensor::{Sensor, SiteId};
use crate::source::{DataSource, DistinctField, ReadingQuery};
use csv::{ReaderBuilder, StringRecord};
use flate2::read::GzDecoder;
use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

const REQUIRED_COLUMNS: [&str; 6] = [
    "borough",
    "sensor_type",
    "pollutant",
    "value",
    "year",
    "averaging_period",
];

/// Column positions resolved from the header row.
struct Columns {
    site: usize,
    borough: usize,
    sensor_type: usize,
    pollutant: usize,
    value: usize,
    year: usize,
    period: usize,
    lat: Option<usize>,
    lon: Option<usize>,
    month: Option<usize>,
    date: Option<usize>,
    name: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                AqmError::unavailable(format!("CSV is missing required column '{}'", name))
            })
        };
        for column in REQUIRED_COLUMNS {
            require(column)?;
        }
        let site = find("site_code").or_else(|| find("id_site")).ok_or_else(|| {
            AqmError::unavailable("CSV has neither a 'site_code' nor an 'id_site' column")
        })?;
        Ok(Columns {
            site,
            borough: require("borough")?,
            sensor_type: require("sensor_type")?,
            pollutant: require("pollutant")?,
            value: require("value")?,
            year: require("year")?,
            period: require("averaging_period")?,
            lat: find("lat"),
            lon: find("lon"),
            month: find("month"),
            date: find("date"),
            name: find("site_name"),
        })
    }
}

fn field<'r>(record: &'r StringRecord, idx: usize) -> &'r str {
    record.get(idx).unwrap_or("").trim()
}

fn optional_f64(record: &StringRecord, idx: Option<usize>) -> Option<f64> {
    idx.and_then(|i| field(record, i).parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parse an integer that pandas may have written as "2024.0".
fn lenient_int(raw: &str) -> Option<i64> {
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    (v.is_finite() && v.fract() == 0.0).then_some(v as i64)
}

/// Read a CSV file into a string, decompressing it if the name ends in `.gz`.
pub fn read_csv_text(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut text = String::new();
    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz")) {
        GzDecoder::new(file).read_to_string(&mut text)?;
    } else {
        std::io::BufReader::new(file).read_to_string(&mut text)?;
    }
    log::info!(
        "[AQM] loader: read {} bytes from {}",
        text.len(),
        path.display()
    );
    Ok(text)
}

/// Parse merged CSV rows into deduplicated sensors and readings.
///
/// Sensor metadata comes from the first row of each site. Rows without a
/// site id, a numeric value, a year or a known averaging period are skipped;
/// monthly rows take their month from `month`, falling back to `date`.
/// A later row for the same (site, pollutant, period, year, month) replaces
/// an earlier one.
pub fn parse_merged_csv<R: Read>(reader: R) -> Result<(Vec<Sensor>, Vec<Reading>)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let cols = Columns::resolve(rdr.headers()?)?;

    let mut sensors: Vec<Sensor> = Vec::new();
    let mut sensor_index: HashMap<SiteId, usize> = HashMap::new();
    let mut readings: Vec<Reading> = Vec::new();
    let mut reading_index: HashMap<(SiteId, String, AveragingPeriod, i32, Option<u32>), usize> =
        HashMap::new();
    let mut skipped = 0u32;

    for result in rdr.records() {
        let r = result?;
        let site_raw = field(&r, cols.site);
        if site_raw.is_empty() {
            skipped += 1;
            continue;
        }
        let site_id = SiteId::new(site_raw);

        if !sensor_index.contains_key(&site_id) {
            sensor_index.insert(site_id.clone(), sensors.len());
            sensors.push(Sensor {
                site_id: site_id.clone(),
                borough: aqm_utils::boroughs::normalize_borough(field(&r, cols.borough)),
                sensor_type: field(&r, cols.sensor_type).to_string(),
                name: cols
                    .name
                    .map(|i| field(&r, i).to_string())
                    .unwrap_or_default(),
                latitude: optional_f64(&r, cols.lat),
                longitude: optional_f64(&r, cols.lon),
            });
        }

        let pollutant = field(&r, cols.pollutant);
        let value = field(&r, cols.value).parse::<f64>().ok().filter(|v| v.is_finite());
        let year = lenient_int(field(&r, cols.year)).and_then(|y| i32::try_from(y).ok());
        let period = field(&r, cols.period).parse::<AveragingPeriod>().ok();
        let (Some(value), Some(year), Some(period)) = (value, year, period) else {
            skipped += 1;
            continue;
        };
        if pollutant.is_empty() {
            skipped += 1;
            continue;
        }

        let month = match period {
            AveragingPeriod::Annual => None,
            AveragingPeriod::Month => {
                let from_column = cols
                    .month
                    .and_then(|i| lenient_int(field(&r, i)))
                    .and_then(|m| u32::try_from(m).ok())
                    .filter(|m| (1..=12).contains(m));
                let from_date = || {
                    cols.date
                        .and_then(|i| aqm_utils::dates::parse_year_month(field(&r, i)).ok())
                        .map(|(_, m)| m)
                };
                match from_column.or_else(from_date) {
                    Some(m) => Some(m),
                    None => {
                        skipped += 1;
                        continue;
                    }
                }
            }
        };

        let reading = Reading {
            site_id,
            pollutant: pollutant.to_string(),
            period,
            year,
            month,
            value,
        };
        let key = (
            reading.site_id.clone(),
            reading.pollutant.clone(),
            period,
            year,
            month,
        );
        match reading_index.get(&key) {
            Some(&idx) => readings[idx] = reading,
            None => {
                reading_index.insert(key, readings.len());
                readings.push(reading);
            }
        }
    }

    log::info!(
        "[AQM] loader: parsed {} sensors, {} readings, skipped {} rows",
        sensors.len(),
        readings.len(),
        skipped
    );
    Ok((sensors, readings))
}

/// A data source holding every sensor and reading in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    sensors: Vec<Sensor>,
    readings: Vec<Reading>,
}

impl MemorySource {
    pub fn new(sensors: Vec<Sensor>, readings: Vec<Reading>) -> Self {
        Self { sensors, readings }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let (sensors, readings) = parse_merged_csv(reader)?;
        Ok(Self::new(sensors, readings))
    }

    /// Parse CSV text, e.g. a response body fetched from a remote export.
    pub fn from_csv_str(csv_data: &str) -> Result<Self> {
        Self::from_reader(csv_data.as_bytes())
    }

    /// Load a local `.csv` or `.csv.gz` file.
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_csv_str(&read_csv_text(path)?)
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }
}

impl DataSource for MemorySource {
    fn list_sensors(&self) -> Result<Vec<Sensor>> {
        Ok(self.sensors.clone())
    }

    fn list_readings(&self, query: &ReadingQuery) -> Result<Vec<Reading>> {
        if query.is_empty_match() {
            return Ok(Vec::new());
        }
        Ok(self
            .readings
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect())
    }

    fn list_distinct_values(&self, field: DistinctField) -> Result<BTreeSet<String>> {
        let values = match field {
            DistinctField::Borough => self.sensors.iter().map(|s| s.borough.clone()).collect(),
            DistinctField::SensorType => {
                self.sensors.iter().map(|s| s.sensor_type.clone()).collect()
            }
            DistinctField::Pollutant => {
                self.readings.iter().map(|r| r.pollutant.clone()).collect()
            }
        };
        Ok(values)
    }
}
