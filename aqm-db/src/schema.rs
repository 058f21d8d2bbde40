//! SQL schema for the in-memory sensor database.
//!
//! Annual readings are stored with `month = 0` so the composite primary key
//! stays total; queries translate it back to "no month".

/// Returns the full SQL schema as a single batch string.
///
/// - `sensors` - one row per site with borough, type, name and position
/// - `readings` - averaged concentrations keyed by site, pollutant, period, year, month
/// - `active_sensors` - view of sensors that have at least one reading
/// - `annual_averages` / `monthly_averages` - per-period views joined with sensor metadata
pub fn create_schema() -> &'static str {
    r#"
    CREATE TABLE IF NOT EXISTS sensors (
        site_id TEXT PRIMARY KEY,
        borough TEXT NOT NULL,
        sensor_type TEXT NOT NULL,
        site_name TEXT NOT NULL DEFAULT '',
        lat REAL,
        lon REAL
    );
    CREATE INDEX IF NOT EXISTS idx_sensors_borough ON sensors(borough);
    CREATE INDEX IF NOT EXISTS idx_sensors_type ON sensors(sensor_type);

    CREATE TABLE IF NOT EXISTS readings (
        site_id TEXT NOT NULL,
        pollutant TEXT NOT NULL,
        averaging_period TEXT NOT NULL CHECK (averaging_period IN ('Annual', 'Month')),
        year INTEGER NOT NULL,
        month INTEGER NOT NULL DEFAULT 0,
        value REAL NOT NULL,
        PRIMARY KEY (site_id, pollutant, averaging_period, year, month)
    );
    CREATE INDEX IF NOT EXISTS idx_readings_lookup ON readings(averaging_period, pollutant, year);
    CREATE INDEX IF NOT EXISTS idx_readings_site ON readings(site_id);

    CREATE VIEW IF NOT EXISTS active_sensors AS
        SELECT s.* FROM sensors s
        WHERE EXISTS (SELECT 1 FROM readings r WHERE r.site_id = s.site_id);

    CREATE VIEW IF NOT EXISTS annual_averages AS
        SELECT r.site_id, r.pollutant, r.year, r.value,
               s.borough, s.sensor_type, s.site_name, s.lat, s.lon
        FROM readings r LEFT JOIN sensors s ON s.site_id = r.site_id
        WHERE r.averaging_period = 'Annual';

    CREATE VIEW IF NOT EXISTS monthly_averages AS
        SELECT r.site_id, r.pollutant, r.year, r.month, r.value,
               s.borough, s.sensor_type, s.site_name, s.lat, s.lon
        FROM readings r LEFT JOIN sensors s ON s.site_id = r.site_id
        WHERE r.averaging_period = 'Month';
    "#
}
