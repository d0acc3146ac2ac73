//! Clock helpers
//!
//! Activity bookkeeping uses Unix milliseconds; session log lines carry a
//! local wall-clock stamp.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Format used for session log timestamps
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Milliseconds since the Unix epoch; 0 on a clock set before 1970
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Milliseconds elapsed since `since`, saturating at 0 for future stamps
pub fn elapsed_millis(since: u64) -> u64 {
    current_time_millis().saturating_sub(since)
}

/// [`elapsed_millis`] as a `Duration`
pub fn elapsed_duration(since_millis: u64) -> Duration {
    Duration::from_millis(elapsed_millis(since_millis))
}

/// Local wall-clock timestamp for session log lines
pub fn log_timestamp() -> String {
    chrono::Local::now().format(LOG_TIMESTAMP_FORMAT).to_string()
}
