//! Time utilities: the evaluation instant used for due-date scoring.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// The instant a priority is evaluated at, plus the timezone used to turn a
/// calendar due date into an instant (its local midnight).
///
/// Scoring never reads the wall clock itself; callers build one of these and
/// pass it in, so the same clock always yields the same scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringClock {
    now: DateTime<Utc>,
    tz: Tz,
}

impl ScoringClock {
    /// Evaluate at `now`, reading due dates as UTC midnight.
    pub fn utc(now: DateTime<Utc>) -> Self {
        Self { now, tz: Tz::UTC }
    }

    pub fn in_zone(now: DateTime<Utc>, tz: Tz) -> Self {
        Self { now, tz }
    }

    /// Snapshot the system clock.
    pub fn system(tz: Tz) -> Self {
        Self::in_zone(Utc::now(), tz)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Today's calendar date in the clock's timezone.
    pub fn today(&self) -> NaiveDate {
        self.now.with_timezone(&self.tz).date_naive()
    }

    /// `ceil((due - now) / 1 day)` at millisecond precision.
    ///
    /// A due date later today yields 0 or 1; anything in the past yields a
    /// value <= 0.
    pub fn days_until(&self, due: NaiveDate) -> i64 {
        let due_at = local_midnight_utc(due, self.tz);
        let millis = (due_at - self.now).num_milliseconds();
        let days = millis.div_euclid(MILLIS_PER_DAY);
        if millis.rem_euclid(MILLIS_PER_DAY) > 0 {
            days + 1
        } else {
            days
        }
    }
}

/// Midnight at the start of `date` in `tz`, as UTC.
///
/// If midnight does not exist locally (DST gap) the naive time is read as UTC.
pub fn local_midnight_utc(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    match tz.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&midnight),
    }
}

/// Parse an IANA timezone like "Asia/Bangkok".
pub fn parse_timezone(tz: &str) -> Result<Tz> {
    tz.parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))
}

/// Parse a calendar date: `YYYY-MM-DD`, or an RFC3339 timestamp whose date
/// part is taken as-is.
pub fn parse_due_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.date_naive())
        .map_err(|e| anyhow::anyhow!("invalid due date '{s}': {e}"))
}
