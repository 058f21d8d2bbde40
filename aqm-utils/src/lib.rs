//! Shared utility functions for AQM crates.

/// Date utility functions
pub mod dates {
    use chrono::{Datelike, Local, NaiveDate};

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
    }

    /// Synthesize the chart date of a reading.
    ///
    /// Annual readings (no month) land on January 1st of their year, monthly
    /// readings on the first day of their month. Returns `None` for a month
    /// outside 1-12.
    pub fn period_date(year: i32, month: Option<u32>) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, month.unwrap_or(1), 1)
    }

    /// Parse the year and month out of a "YYYY-MM" or "YYYY-MM-DD" string.
    ///
    /// Monthly rows in the merged sensor CSV carry their month only in the
    /// `date` column for some sensor families, so loaders fall back to this.
    pub fn parse_year_month(s: &str) -> anyhow::Result<(i32, u32)> {
        let s = s.trim();
        let mut parts = s.splitn(3, '-');
        let year: i32 = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty date"))?
            .parse()?;
        let month: u32 = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("date '{}' has no month", s))?
            .parse()?;
        if !(1..=12).contains(&month) {
            anyhow::bail!("month {} out of range in '{}'", month, s);
        }
        Ok((year, month))
    }

    /// The current calendar year in local time.
    pub fn current_year() -> i32 {
        Local::now().date_naive().year()
    }

}

/// Borough naming helpers
pub mod boroughs {
    /// Short labels used on the borough filter buttons.
    pub const BOROUGH_LABELS: &[(&str, &str)] = &[
        ("Wandsworth", "Wand"),
        ("Richmond", "Rich"),
        ("Merton", "Mert"),
    ];

    /// Normalize a raw borough name from a data source.
    ///
    /// Every spelling of Richmond ("Richmond upon Thames", "richmond", ...)
    /// collapses to "Richmond"; other names are only trimmed.
    pub fn normalize_borough(raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.to_ascii_lowercase().starts_with("richmond") {
            "Richmond".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Short display label for a borough, or the name itself if none is defined.
    pub fn short_label(borough: &str) -> &str {
        BOROUGH_LABELS
            .iter()
            .find(|(name, _)| *name == borough)
            .map(|(_, label)| *label)
            .unwrap_or(borough)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_normalize_richmond_variants() {
            assert_eq!(normalize_borough("Richmond upon Thames"), "Richmond");
            assert_eq!(normalize_borough("  RICHMOND "), "Richmond");
            assert_eq!(normalize_borough("Merton"), "Merton");
            assert_eq!(normalize_borough(" Wandsworth"), "Wandsworth");
        }

        #[test]
        fn test_short_label() {
            assert_eq!(short_label("Wandsworth"), "Wand");
            assert_eq!(short_label("Richmond"), "Rich");
            assert_eq!(short_label("Hackney"), "Hackney");
        }
    }
}
