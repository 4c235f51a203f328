// src/window.rs
// Operating-window gate: the agency feed is quiet overnight and posting at
// 3 AM helps nobody. The pipeline only consumes the boolean; the calendar
// math lives here, outside the core.

use chrono::{DateTime, FixedOffset, Timelike, Utc};

/// True when `now`, shifted into the configured fixed UTC offset, falls at
/// or after `window_start_hour` (through 11:59 PM local). DST handling is
/// deliberately not modeled; the offset is plain configuration.
pub fn within_operating_window(
    now_utc: DateTime<Utc>,
    utc_offset_hours: i32,
    window_start_hour: u32,
) -> bool {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
    let local = now_utc.with_timezone(&offset);
    local.hour() >= window_start_hour
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn early_morning_is_outside() {
        // 08:00 UTC at offset -5 = 03:00 local
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
        assert!(!within_operating_window(now, -5, 5));
    }

    #[test]
    fn five_am_local_is_inside() {
        // 10:00 UTC at offset -5 = 05:00 local
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
        assert!(within_operating_window(now, -5, 5));
    }

    #[test]
    fn late_evening_is_inside() {
        // 04:30 UTC next day at offset -5 = 23:30 local
        let now = Utc.with_ymd_and_hms(2025, 3, 11, 4, 30, 0).unwrap();
        assert!(within_operating_window(now, -5, 5));
    }
}
