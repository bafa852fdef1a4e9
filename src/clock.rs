//! Run timestamps in Alaska local time.
//!
//! Rows are stamped in US/Alaska time (AKST, UTC-9; AKDT, UTC-8 during US
//! daylight saving time). The `hour` column carries a 12-hour label of the
//! same instant, and every row expires a fixed number of hours later.
//!
//! # Clock injection
//! The evaluator owns a `Box<dyn Clock>` and reads it once per run rather
//! than calling `Utc::now()` internally. The same reading is handed to the
//! rainfall source. Tests pass a `FixedClock`, which keeps timestamps, hour
//! labels, expiry and the rainfall window fully deterministic.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Utc, Weekday};

/// Default lifetime of a stored risk record.
pub const DEFAULT_EXPIRY_HOURS: i64 = 3;

/// Longest accepted record lifetime: one year.
pub const MAX_EXPIRY_HOURS: i64 = 24 * 366;

// ---------------------------------------------------------------------------
// Clock sources
// ---------------------------------------------------------------------------

pub trait Clock {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Alaska time
// ---------------------------------------------------------------------------

// Both Alaska offsets are well inside one day, so the UTC fallback is never taken.
fn hours_west(hours: i32) -> FixedOffset {
    FixedOffset::west_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// UTC instant of 02:00 local time on the `n`th Sunday of `month`, given the
/// local offset in force just before the change.
fn transition_utc(year: i32, month: u32, n: u8, hours_behind_utc: i64) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Sun, n)?;
    let local = date.and_hms_opt(2, 0, 0)?;
    Some(Utc.from_utc_datetime(&(local + Duration::hours(hours_behind_utc))))
}

/// Whether US daylight saving time is in force in Alaska at `instant`.
///
/// DST runs from 02:00 AKST on the second Sunday of March to 02:00 AKDT on
/// the first Sunday of November.
pub fn is_alaska_dst(instant: DateTime<Utc>) -> bool {
    use chrono::Datelike;

    let year = instant.year();
    match (
        transition_utc(year, 3, 2, 9),
        transition_utc(year, 11, 1, 8),
    ) {
        (Some(start), Some(end)) => instant >= start && instant < end,
        _ => false,
    }
}

/// The UTC offset of Alaska local time at `instant`.
pub fn alaska_offset(instant: DateTime<Utc>) -> FixedOffset {
    if is_alaska_dst(instant) {
        hours_west(8)
    } else {
        hours_west(9)
    }
}

pub fn to_alaska(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&alaska_offset(instant))
}

/// Zero-padded 12-hour label with AM/PM, e.g. "02PM".
pub fn hour_label(local: &DateTime<FixedOffset>) -> String {
    local.format("%I%p").to_string()
}

// ---------------------------------------------------------------------------
// Run timestamps
// ---------------------------------------------------------------------------

/// The timestamps shared by every row written in one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunTimes {
    pub now: DateTime<FixedOffset>,
    pub expires_at: DateTime<FixedOffset>,
    pub hour: String,
}

impl RunTimes {
    /// Reads `clock` once. `None` when `expiry_hours` is not positive or
    /// the expiry instant is not representable.
    pub fn at(clock: &dyn Clock, expiry_hours: i64) -> Option<Self> {
        let utc = clock.now_utc();
        Self::from_utc(utc, expiry_hours)
    }

    pub fn from_utc(utc: DateTime<Utc>, expiry_hours: i64) -> Option<Self> {
        if expiry_hours <= 0 {
            return None;
        }
        let now = to_alaska(utc);
        let expires_at = now.checked_add_signed(Duration::try_hours(expiry_hours)?)?;
        let hour = hour_label(&now);
        Some(Self { now, expires_at, hour })
    }

    pub fn now_utc(&self) -> DateTime<Utc> {
        self.now.with_timezone(&Utc)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
