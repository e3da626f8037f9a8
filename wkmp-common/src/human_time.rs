//! Human-readable time formatting for session feedback
//!
//! Provides consistent display of elapsed session time and fix rates in
//! user-facing hints.

/// Elapsed-time display thresholds (seconds)
const SECONDS_ONLY_MAX: u64 = 60;         // < 1m → Xs
const MINUTES_MAX: u64 = 3600;            // < 1h → Xm YYs
                                          // >= 1h → Xh YYm

/// Format elapsed seconds for display in hints.
///
/// Format selection by magnitude:
/// - Seconds (`45s`): under one minute
/// - Minutes (`5m 30s`): one minute to one hour
/// - Hours (`1h 02m`): one hour and above (seconds dropped)
///
/// # Examples
///
/// ```
/// use wkmp_common::human_time::format_elapsed;
///
/// assert_eq!(format_elapsed(45), "45s");
/// assert_eq!(format_elapsed(330), "5m 30s");
/// assert_eq!(format_elapsed(3720), "1h 02m");
/// ```
pub fn format_elapsed(seconds: u64) -> String {
    if seconds < SECONDS_ONLY_MAX {
        format!("{}s", seconds)
    } else if seconds < MINUTES_MAX {
        let minutes = seconds / 60;
        let secs = seconds % 60;
        if secs == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m {:02}s", minutes, secs)
        }
    } else {
        let hours = seconds / 3600;
        let mins = (seconds % 3600) / 60;
        format!("{}h {:02}m", hours, mins)
    }
}

/// Format a per-minute rate with one decimal place.
///
/// ```
/// use wkmp_common::human_time::format_rate_per_minute;
///
/// assert_eq!(format_rate_per_minute(0.5), "0.5/min");
/// assert_eq!(format_rate_per_minute(2.0), "2.0/min");
/// ```
pub fn format_rate_per_minute(rate: f64) -> String {
    if !rate.is_finite() {
        return "0.0/min".to_string();
    }
    format!("{:.1}/min", rate)
}
