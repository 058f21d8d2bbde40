use crate::threshold::{ColorStandard, ThresholdCatalog};
use serde::Serialize;

/// Color drawn for readings that cannot be classified.
pub const NEUTRAL_COLOR: &str = "#cccccc";

/// Result of classifying a reading: a band color and its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorClassification {
    pub color: &'static str,
    /// Band label; empty for the neutral fallback
    pub label: &'static str,
}

impl ColorClassification {
    pub const fn neutral() -> Self {
        ColorClassification {
            color: NEUTRAL_COLOR,
            label: "",
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.label.is_empty() && self.color == NEUTRAL_COLOR
    }
}

/// Maps concentrations to color bands using a [`ThresholdCatalog`].
///
/// Never fails: missing values, NaN, negative values and unregistered
/// pollutant/standard pairs all classify as [`ColorClassification::neutral`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorClassifier {
    catalog: ThresholdCatalog,
}

impl ColorClassifier {
    pub fn new(catalog: ThresholdCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ThresholdCatalog {
        &self.catalog
    }

    pub fn classify(
        &self,
        value: Option<f64>,
        pollutant: &str,
        standard: ColorStandard,
    ) -> ColorClassification {
        let value = match value {
            Some(v) if !v.is_nan() => v,
            _ => return ColorClassification::neutral(),
        };
        let Some(bands) = self.catalog.bands(pollutant, standard) else {
            log::debug!("[AQM] classify: no bands for {} / {}", pollutant, standard);
            return ColorClassification::neutral();
        };
        bands
            .iter()
            .find(|band| band.contains(value))
            .map(|band| ColorClassification {
                color: band.color,
                label: band.label,
            })
            .unwrap_or_else(ColorClassification::neutral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::DEFAULT_TABLES;

    fn classify(value: f64, pollutant: &str, standard: ColorStandard) -> ColorClassification {
        ColorClassifier::default().classify(Some(value), pollutant, standard)
    }

    #[test]
    fn no2_who_twelve_is_good() {
        let c = classify(12.0, "NO2", ColorStandard::Who);
        assert_eq!(c.label, "Good");
        assert_eq!(c.color, "#33ccff");
    }

    #[test]
    fn boundary_value_belongs_to_the_upper_band() {
        assert_eq!(classify(10.0, "NO2", ColorStandard::Who).label, "Good");
        assert_eq!(classify(9.999, "NO2", ColorStandard::Who).label, "WHO compliant");
        assert_eq!(classify(0.0, "NO2", ColorStandard::Who).label, "WHO compliant");
        assert_eq!(classify(40.0, "NO2", ColorStandard::Uk).label, "Poor");
    }

    #[test]
    fn open_ended_band_catches_large_values() {
        assert_eq!(classify(1.0e6, "PM10", ColorStandard::Borough).label, "Very Poor");
        assert_eq!(classify(f64::INFINITY, "NO2", ColorStandard::Who).label, "Extremely Poor");
    }

    #[test]
    fn unclassifiable_values_are_neutral() {
        let classifier = ColorClassifier::default();
        assert!(classifier.classify(None, "NO2", ColorStandard::Who).is_neutral());
        assert!(classifier
            .classify(Some(f64::NAN), "NO2", ColorStandard::Who)
            .is_neutral());
        assert!(classify(-1.0, "NO2", ColorStandard::Who).is_neutral());
        assert!(classify(12.0, "SO2", ColorStandard::Who).is_neutral());
    }

    #[test]
    fn classified_band_contains_value_for_every_table() {
        let classifier = ColorClassifier::default();
        for table in DEFAULT_TABLES {
            let mut value = 0.0;
            while value < 150.0 {
                let c = classifier.classify(Some(value), table.pollutant, table.standard);
                let band = table
                    .bands
                    .iter()
                    .find(|b| b.label == c.label && b.color == c.color)
                    .expect("classification must come from the table");
                assert!(band.contains(value), "{} not in {:?}", value, band);
                value += 0.5;
            }
        }
    }
}
