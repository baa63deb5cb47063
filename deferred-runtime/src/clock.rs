//! Wall-clock access in milliseconds since the Unix epoch.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// This is not monotonic: a backward clock adjustment delays pending jobs and
/// a forward one fires them early.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A point in time that can be expressed as milliseconds since the Unix epoch.
pub trait UnixMillis {
    fn unix_millis(&self) -> i64;
}

impl<Tz: TimeZone> UnixMillis for DateTime<Tz> {
    fn unix_millis(&self) -> i64 {
        self.timestamp_millis()
    }
}

/// Naive date/times are read as UTC.
impl UnixMillis for NaiveDateTime {
    fn unix_millis(&self) -> i64 {
        self.and_utc().timestamp_millis()
    }
}

impl UnixMillis for SystemTime {
    fn unix_millis(&self) -> i64 {
        match self.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
            Err(before) => i64::try_from(before.duration().as_millis())
                .map(|ms| -ms)
                .unwrap_or(i64::MIN),
        }
    }
}
