use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable key of a physical sensor.
///
/// Backends disagree on the format (a site code such as "WA7" in the CSV
/// exports, a numeric id in the relational store), so the id is kept as
/// text and numeric ids are rendered in decimal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    pub fn new(id: impl Into<String>) -> Self {
        SiteId(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SiteId {
    fn from(value: &str) -> Self {
        SiteId::new(value)
    }
}

impl From<String> for SiteId {
    fn from(value: String) -> Self {
        SiteId::new(value)
    }
}

impl From<i64> for SiteId {
    fn from(value: i64) -> Self {
        SiteId(value.to_string())
    }
}

/// Marker symbols per sensor family, as drawn on the map.
pub const SENSOR_SYMBOLS: &[(&str, &str)] = &[
    ("DT", "square"),
    ("Clarity", "circle"),
    ("Automatic", "triangle-up"),
];

/// Symbol used for sensor types missing from [`SENSOR_SYMBOLS`].
pub const DEFAULT_SYMBOL: &str = "circle";

/// Represents an air-quality monitoring site and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub site_id: SiteId,
    /// Borough the site belongs to (already normalized)
    pub borough: String,
    /// Sensor family tag, e.g. "Automatic", "Clarity" or "DT"
    pub sensor_type: String,
    /// Human-readable site name
    pub name: String,
    /// Latitude in decimal degrees
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees
    pub longitude: Option<f64>,
}

impl Sensor {
    /// Map position as (lat, lon), or `None` when either coordinate is
    /// missing, non-finite or out of range. Such sensors are left off the map.
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon))
                if lat.is_finite()
                    && lon.is_finite()
                    && (-90.0..=90.0).contains(&lat)
                    && (-180.0..=180.0).contains(&lon) =>
            {
                Some((lat, lon))
            }
            _ => None,
        }
    }

    /// The display name, falling back to the site id when the name is blank.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.site_id.as_str()
        } else {
            &self.name
        }
    }

    pub fn marker_symbol(&self) -> &'static str {
        SENSOR_SYMBOLS
            .iter()
            .find(|(kind, _)| *kind == self.sensor_type)
            .map(|(_, symbol)| *symbol)
            .unwrap_or(DEFAULT_SYMBOL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor(lat: Option<f64>, lon: Option<f64>) -> Sensor {
        Sensor {
            site_id: SiteId::from("WA7"),
            borough: "Wandsworth".to_string(),
            sensor_type: "Automatic".to_string(),
            name: "Wandsworth - Putney High Street".to_string(),
            latitude: lat,
            longitude: lon,
        }
    }

    #[test]
    fn position_requires_both_valid_coordinates() {
        assert_eq!(
            sensor(Some(51.46), Some(-0.21)).position(),
            Some((51.46, -0.21))
        );
        assert_eq!(sensor(None, Some(-0.21)).position(), None);
        assert_eq!(sensor(Some(f64::NAN), Some(-0.21)).position(), None);
        assert_eq!(sensor(Some(151.0), Some(-0.21)).position(), None);
    }

    #[test]
    fn site_ids_from_numbers_and_text_compare_as_text() {
        assert_eq!(SiteId::from(42i64), SiteId::from("42"));
        assert_eq!(SiteId::from(" RI1 ").as_str(), "RI1");
    }

    #[test]
    fn marker_symbol_by_sensor_type() {
        let mut s = sensor(None, None);
        assert_eq!(s.marker_symbol(), "triangle-up");
        s.sensor_type = "Clarity".to_string();
        assert_eq!(s.marker_symbol(), "circle");
        s.sensor_type = "Unknown".to_string();
        assert_eq!(s.marker_symbol(), DEFAULT_SYMBOL);
    }

    #[test]
    fn display_name_falls_back_to_site_id() {
        let mut s = sensor(None, None);
        s.name = "  ".to_string();
        assert_eq!(s.display_name(), "WA7");
    }
}
