use chrono::{DateTime, Local};
use chrono_tz::Tz;

/// The current wall-clock time where the business operates.
pub fn business_datetime_now(timezone: Tz) -> DateTime<Tz> {
    Local::now().with_timezone(&timezone)
}
