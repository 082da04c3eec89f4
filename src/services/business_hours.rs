//! Business-hours send window.
//!
//! Sends are restricted to weekday business hours in a fixed timezone.
//! The gate is a pure function of the timestamp; the scheduler checks it
//! before starting a tick, and the executor re-checks it between contacts
//! so a long-running loop cannot spill outside the window.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc, Weekday};

use crate::config::SendingSettings;

/// Weekday/hour window in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SendWindow {
    start_hour: u32,
    end_hour: u32,
    offset: FixedOffset,
    include_weekends: bool,
}

impl SendWindow {
    /// Creates a window from explicit bounds.
    ///
    /// `start_hour` is inclusive, `end_hour` exclusive, both in the local
    /// time of `utc_offset_hours`. Weekends are always closed.
    pub fn new(start_hour: u32, end_hour: u32, utc_offset_hours: i32) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
        Self {
            start_hour,
            end_hour,
            offset,
            include_weekends: false,
        }
    }

    /// A window that is open at every instant.
    ///
    /// Bypasses the weekday rule as well; intended for tests and manual
    /// one-off runs, not production configuration.
    pub fn always_open() -> Self {
        Self {
            start_hour: 0,
            end_hour: 24,
            offset: FixedOffset::east_opt(0).expect("zero offset is valid"),
            include_weekends: true,
        }
    }

    /// Creates a window from sending settings.
    pub fn from_settings(settings: &SendingSettings) -> Self {
        Self::new(
            settings.window_start_hour,
            settings.window_end_hour,
            settings.utc_offset_hours,
        )
    }

    /// Returns whether `now` falls inside the sending window.
    ///
    /// Weekends are always closed.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.offset);
        if !self.include_weekends && matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let hour = local.hour();
        hour >= self.start_hour && hour < self.end_hour
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> SendWindow {
        // 9-18 in UTC-5.
        SendWindow::new(9, 18, -5)
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn open_on_weekday_inside_hours() {
        // Wed 2024-06-12 10:00 local = 15:00 UTC.
        assert!(window().is_open(utc(2024, 6, 12, 15, 0)));
    }

    #[test]
    fn closed_before_opening_hour() {
        // Wed 08:59 local = 13:59 UTC.
        assert!(!window().is_open(utc(2024, 6, 12, 13, 59)));
    }

    #[test]
    fn closed_at_end_hour() {
        // End hour is exclusive: 18:00 local = 23:00 UTC.
        assert!(!window().is_open(utc(2024, 6, 12, 23, 0)));
        // 17:59 local is still open.
        assert!(window().is_open(utc(2024, 6, 12, 22, 59)));
    }

    #[test]
    fn closed_on_weekends() {
        // Sat 2024-06-15 12:00 local = 17:00 UTC.
        assert!(!window().is_open(utc(2024, 6, 15, 17, 0)));
        // Sun 2024-06-16 12:00 local.
        assert!(!window().is_open(utc(2024, 6, 16, 17, 0)));
    }

    #[test]
    fn offset_shifts_the_weekday_boundary() {
        // 2024-06-14 23:30 UTC is Friday 18:30 local in UTC-5 (closed by
        // hour), but Saturday 00:30 in UTC+1 (closed by weekday).
        let late_friday = utc(2024, 6, 14, 23, 30);
        assert!(!SendWindow::new(0, 24, 1).is_open(late_friday));
        // In UTC-5 it is still Friday, so a 0-24 window is open.
        assert!(SendWindow::new(0, 24, -5).is_open(late_friday));
    }

    #[test]
    fn configured_windows_always_close_on_weekends() {
        let all_day = SendWindow::new(0, 24, 0);
        // Monday midnight.
        assert!(all_day.is_open(utc(2024, 6, 10, 0, 0)));
        // Still closed on Saturday.
        assert!(!all_day.is_open(utc(2024, 6, 15, 12, 0)));
    }

    #[test]
    fn always_open_ignores_weekends() {
        let window = SendWindow::always_open();
        assert!(window.is_open(utc(2024, 6, 15, 3, 0)));
        assert!(window.is_open(utc(2024, 6, 10, 0, 0)));
    }
}
