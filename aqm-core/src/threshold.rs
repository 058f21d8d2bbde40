//! Regulatory concentration bands per pollutant and standard.
//!
//! Every registered (pollutant, standard) table is an ascending list of
//! contiguous bands starting at 0 whose last band is unbounded, so together
//! they cover `[0, +inf)`. A band contains `lower <= value < upper`.

use crate::error::AqmError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The threshold table a map is colored by.
#[derive(Debug, Default, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum ColorStandard {
    #[default]
    #[serde(rename = "WHO")]
    Who,
    Borough,
    #[serde(rename = "UK")]
    Uk,
}

impl ColorStandard {
    pub const ALL: [ColorStandard; 3] = [ColorStandard::Who, ColorStandard::Borough, ColorStandard::Uk];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorStandard::Who => "WHO",
            ColorStandard::Borough => "Borough",
            ColorStandard::Uk => "UK",
        }
    }

    /// Long name shown above the legend.
    pub fn title(&self) -> &'static str {
        match self {
            ColorStandard::Who => "WHO Guidelines",
            ColorStandard::Borough => "Borough Standards",
            ColorStandard::Uk => "UK Legal Limits",
        }
    }
}

impl fmt::Display for ColorStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorStandard {
    type Err = AqmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WHO" => Ok(ColorStandard::Who),
            "BOROUGH" => Ok(ColorStandard::Borough),
            "UK" => Ok(ColorStandard::Uk),
            _ => Err(AqmError::Unrecognized {
                kind: "color standard",
                value: s.to_string(),
            }),
        }
    }
}

/// One concentration interval with its display color and label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorBand {
    /// Inclusive lower bound (µg/m³)
    pub lower: f64,
    /// Exclusive upper bound; `None` for the final, unbounded band
    pub upper: Option<f64>,
    pub label: &'static str,
    /// Hex color, e.g. "#33ccff"
    pub color: &'static str,
}

impl ColorBand {
    const fn new(lower: f64, upper: f64, label: &'static str, color: &'static str) -> Self {
        ColorBand {
            lower,
            upper: Some(upper),
            label,
            color,
        }
    }

    const fn open(lower: f64, label: &'static str, color: &'static str) -> Self {
        ColorBand {
            lower,
            upper: None,
            label,
            color,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && self.upper.map_or(true, |upper| value < upper)
    }

    /// Legend text, e.g. "Good (10-20)" or "Very Poor (60-∞)".
    pub fn legend_text(&self) -> String {
        match self.upper {
            Some(upper) => format!("{} ({}-{})", self.label, self.lower, upper),
            None => format!("{} ({}-∞)", self.label, self.lower),
        }
    }
}

/// The bands registered for one (pollutant, standard) pair.
#[derive(Debug, Clone, Copy)]
pub struct BandTable {
    pub pollutant: &'static str,
    pub standard: ColorStandard,
    pub bands: &'static [ColorBand],
}

const NO2_WHO: &[ColorBand] = &[
    ColorBand::new(0.0, 10.0, "WHO compliant", "#ccffff"),
    ColorBand::new(10.0, 20.0, "Good", "#33ccff"),
    ColorBand::new(20.0, 30.0, "Moderate", "#00ffcc"),
    ColorBand::new(30.0, 40.0, "UK Limit compliant", "#00ff00"),
    ColorBand::new(40.0, 60.0, "Poor", "#ffa500"),
    ColorBand::new(60.0, 100.0, "Very Poor", "#ff0000"),
    ColorBand::open(100.0, "Extremely Poor", "#660033"),
];

const NO2_BOROUGH: &[ColorBand] = &[
    ColorBand::new(0.0, 10.0, "Excellent", "#ccffff"),
    ColorBand::new(10.0, 30.0, "Good", "#33ccff"),
    ColorBand::new(30.0, 40.0, "Moderate", "#00ff00"),
    ColorBand::new(40.0, 60.0, "Poor", "#ffa500"),
    ColorBand::open(60.0, "Very Poor", "#ff0000"),
];

const NO2_UK: &[ColorBand] = &[
    ColorBand::new(0.0, 40.0, "Moderate", "#00ff00"),
    ColorBand::new(40.0, 60.0, "Poor", "#ffa500"),
    ColorBand::open(60.0, "Very Poor", "#ff0000"),
];

const PM25_WHO: &[ColorBand] = &[
    ColorBand::new(0.0, 5.0, "Excellent", "#00ff00"),
    ColorBand::new(5.0, 10.0, "Good", "#ffff00"),
    ColorBand::new(10.0, 15.0, "Moderate", "#ffa500"),
    ColorBand::new(15.0, 20.0, "Poor", "#ff6600"),
    ColorBand::open(20.0, "Very Poor", "#ff0000"),
];

const PM25_BOROUGH: &[ColorBand] = &[
    ColorBand::new(0.0, 8.0, "Excellent", "#00ff00"),
    ColorBand::new(8.0, 12.0, "Good", "#ffff00"),
    ColorBand::new(12.0, 16.0, "Moderate", "#ffa500"),
    ColorBand::new(16.0, 20.0, "Poor", "#ff6600"),
    ColorBand::open(20.0, "Very Poor", "#ff0000"),
];

const PM25_UK: &[ColorBand] = &[
    ColorBand::new(0.0, 10.0, "Excellent", "#00ff00"),
    ColorBand::new(10.0, 15.0, "Good", "#ffff00"),
    ColorBand::new(15.0, 20.0, "Moderate", "#ffa500"),
    ColorBand::new(20.0, 25.0, "Poor", "#ff6600"),
    ColorBand::open(25.0, "Very Poor", "#ff0000"),
];

const PM10_WHO: &[ColorBand] = &[
    ColorBand::new(0.0, 15.0, "Excellent", "#00ff00"),
    ColorBand::new(15.0, 25.0, "Good", "#ffff00"),
    ColorBand::new(25.0, 35.0, "Moderate", "#ffa500"),
    ColorBand::new(35.0, 45.0, "Poor", "#ff6600"),
    ColorBand::open(45.0, "Very Poor", "#ff0000"),
];

const PM10_BOROUGH: &[ColorBand] = &[
    ColorBand::new(0.0, 20.0, "Excellent", "#00ff00"),
    ColorBand::new(20.0, 30.0, "Good", "#ffff00"),
    ColorBand::new(30.0, 40.0, "Moderate", "#ffa500"),
    ColorBand::new(40.0, 50.0, "Poor", "#ff6600"),
    ColorBand::open(50.0, "Very Poor", "#ff0000"),
];

const PM10_UK: &[ColorBand] = &[
    ColorBand::new(0.0, 25.0, "Excellent", "#00ff00"),
    ColorBand::new(25.0, 35.0, "Good", "#ffff00"),
    ColorBand::new(35.0, 45.0, "Moderate", "#ffa500"),
    ColorBand::new(45.0, 50.0, "Poor", "#ff6600"),
    ColorBand::open(50.0, "Very Poor", "#ff0000"),
];

/// Built-in tables for the pollutants the dashboard colors.
pub static DEFAULT_TABLES: &[BandTable] = &[
    BandTable { pollutant: "NO2", standard: ColorStandard::Who, bands: NO2_WHO },
    BandTable { pollutant: "NO2", standard: ColorStandard::Borough, bands: NO2_BOROUGH },
    BandTable { pollutant: "NO2", standard: ColorStandard::Uk, bands: NO2_UK },
    BandTable { pollutant: "PM2.5", standard: ColorStandard::Who, bands: PM25_WHO },
    BandTable { pollutant: "PM2.5", standard: ColorStandard::Borough, bands: PM25_BOROUGH },
    BandTable { pollutant: "PM2.5", standard: ColorStandard::Uk, bands: PM25_UK },
    BandTable { pollutant: "PM10", standard: ColorStandard::Who, bands: PM10_WHO },
    BandTable { pollutant: "PM10", standard: ColorStandard::Borough, bands: PM10_BOROUGH },
    BandTable { pollutant: "PM10", standard: ColorStandard::Uk, bands: PM10_UK },
];

/// Static lookup of band tables.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdCatalog {
    tables: &'static [BandTable],
}

impl Default for ThresholdCatalog {
    fn default() -> Self {
        Self {
            tables: DEFAULT_TABLES,
        }
    }
}

impl ThresholdCatalog {
    pub fn new(tables: &'static [BandTable]) -> Self {
        Self { tables }
    }

    /// The ascending bands for `(pollutant, standard)`.
    ///
    /// `None` is the "unknown" sentinel: the pair is not registered and the
    /// caller must fall back to a neutral color.
    pub fn bands(&self, pollutant: &str, standard: ColorStandard) -> Option<&'static [ColorBand]> {
        self.tables
            .iter()
            .find(|t| t.pollutant == pollutant && t.standard == standard)
            .map(|t| t.bands)
    }

    /// Pollutants with at least one registered table, in registration order.
    pub fn pollutants(&self) -> Vec<&'static str> {
        let mut seen: Vec<&'static str> = Vec::new();
        for table in self.tables {
            if !seen.contains(&table.pollutant) {
                seen.push(table.pollutant);
            }
        }
        seen
    }

    pub fn tables(&self) -> &'static [BandTable] {
        self.tables
    }
}

/// Check that `bands` start at 0, touch end to end and end unbounded.
pub fn is_exhaustive(bands: &[ColorBand]) -> bool {
    let (first, last) = match (bands.first(), bands.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return false,
    };
    if first.lower != 0.0 || last.upper.is_some() {
        return false;
    }
    bands
        .windows(2)
        .all(|pair| pair[0].upper == Some(pair[1].lower) && pair[0].lower < pair[1].lower)
}
