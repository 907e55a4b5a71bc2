use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HorizonError {
    #[error("week offset {0} is outside the supported date range")]
    OutOfRange(i64),
}

/// The span a planning run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    pub start: DateTime<Utc>,
    pub duration: Duration,
}

impl Horizon {
    pub fn new(start: DateTime<Utc>, duration: Duration) -> Self {
        Self { start, duration }
    }

    /// Monday 00:00 local time of the week containing `now`, shifted by
    /// `week_offset` weeks, lasting seven days.
    pub fn week(
        now: DateTime<Utc>,
        zone: FixedOffset,
        week_offset: i64,
    ) -> Result<Self, HorizonError> {
        let out_of_range = || HorizonError::OutOfRange(week_offset);

        let today = now.with_timezone(&zone).date_naive();
        let monday = today
            .checked_sub_signed(Duration::days(today.weekday().num_days_from_monday() as i64))
            .and_then(|d| d.checked_add_signed(Duration::try_weeks(week_offset)?))
            .ok_or_else(out_of_range)?;
        let start = monday
            .and_time(NaiveTime::MIN)
            .checked_sub_signed(Duration::seconds(zone.local_minus_utc() as i64))
            .ok_or_else(out_of_range)?
            .and_utc();

        let duration = Duration::weeks(1);
        start.checked_add_signed(duration).ok_or_else(out_of_range)?;
        Ok(Self::new(start, duration))
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration
    }

    /// True once `cursor` is strictly past the end; the boundary itself is inside.
    pub fn is_exceeded_by(&self, cursor: DateTime<Utc>) -> bool {
        cursor - self.start > self.duration
    }
}
