//! Calendar Feature Extraction
//!
//! Cyclical sine/cosine encodings so that 23:00 sits next to 00:00 and
//! December next to January.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Number of calendar features written per row
pub const CALENDAR_FEATURES: usize = 9;

/// `(sin, cos)` of `value` on a cycle of length `period`
pub fn cyclical(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

/// Calendar features for one timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarFeatures {
    pub hour: (f64, f64),
    pub day_of_week: (f64, f64),
    pub day_of_month: (f64, f64),
    pub month: (f64, f64),
    pub is_weekend: bool,
}

impl CalendarFeatures {
    pub fn from_timestamp(ts: DateTime<Utc>) -> Self {
        // Monday = 0 .. Sunday = 6
        let weekday = ts.weekday().num_days_from_monday();

        Self {
            hour: cyclical(ts.hour() as f64, 24.0),
            day_of_week: cyclical(weekday as f64, 7.0),
            day_of_month: cyclical(ts.day() as f64, 31.0),
            month: cyclical(ts.month() as f64, 12.0),
            is_weekend: weekday >= 5,
        }
    }

    /// Values in layout order (hour, day_of_week, day_of_month, month, weekend)
    pub fn to_array(&self) -> [f64; CALENDAR_FEATURES] {
        [
            self.hour.0,
            self.hour.1,
            self.day_of_week.0,
            self.day_of_week.1,
            self.day_of_month.0,
            self.day_of_month.1,
            self.month.0,
            self.month.1,
            if self.is_weekend { 1.0 } else { 0.0 },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cyclical_wraps() {
        let (s0, c0) = cyclical(0.0, 24.0);
        let (s24, c24) = cyclical(24.0, 24.0);
        assert!((s0 - s24).abs() < 1e-12);
        assert!((c0 - c24).abs() < 1e-12);

        let (s6, c6) = cyclical(6.0, 24.0);
        assert!((s6 - 1.0).abs() < 1e-12);
        assert!(c6.abs() < 1e-12);
    }

    #[test]
    fn test_weekend_detection() {
        // 2024-06-01 is a Saturday
        let saturday = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let monday = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();

        assert!(CalendarFeatures::from_timestamp(saturday).is_weekend);
        assert!(!CalendarFeatures::from_timestamp(monday).is_weekend);

        let monday_features = CalendarFeatures::from_timestamp(monday);
        assert!(monday_features.day_of_week.0.abs() < 1e-12);
        assert!((monday_features.day_of_week.1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_to_array_layout() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap();
        let values = CalendarFeatures::from_timestamp(ts).to_array();
        assert_eq!(values.len(), CALENDAR_FEATURES);
        assert!((values[0] - 1.0).abs() < 1e-12); // hour_sin at 06:00
        assert_eq!(values[8], 1.0);
    }
}
