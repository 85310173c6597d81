use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Offset, TimeZone};

/// Instant at which `date` starts in `tz`. When midnight falls into a DST gap the day starts at
/// the transition, which is midnight read with the offset in effect the day before.
pub fn local_day_start<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| {
            let before = tz
                .offset_from_local_datetime(&(midnight - Duration::days(1)))
                .earliest()
                .map(|offset| offset.fix().local_minus_utc())
                .unwrap_or(0);
            tz.from_utc_datetime(&(midnight - Duration::seconds(before as i64)))
        })
}

/// Returns start of the next day.
pub fn next_day_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    let tz = date.timezone();
    let next = date
        .date_naive()
        .succ_opt()
        .expect("End of time should never happen");
    local_day_start(&tz, next)
}

pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

/// Zone that moves from the `BEFORE` to the `AFTER` offset (seconds east of UTC) at the unix
/// timestamp `SWITCH`.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct ShiftingZone<const BEFORE: i32, const AFTER: i32, const SWITCH: i64>;

#[cfg(test)]
impl<const BEFORE: i32, const AFTER: i32, const SWITCH: i64> ShiftingZone<BEFORE, AFTER, SWITCH> {
    fn offset_at(utc: &chrono::NaiveDateTime) -> chrono::FixedOffset {
        let seconds = if utc.and_utc().timestamp() < SWITCH {
            BEFORE
        } else {
            AFTER
        };
        chrono::FixedOffset::east_opt(seconds).expect("Offsets should be within a day")
    }
}

#[cfg(test)]
impl<const BEFORE: i32, const AFTER: i32, const SWITCH: i64> TimeZone
    for ShiftingZone<BEFORE, AFTER, SWITCH>
{
    type Offset = chrono::FixedOffset;

    fn from_offset(_offset: &chrono::FixedOffset) -> Self {
        Self
    }

    fn offset_from_local_date(&self, local: &NaiveDate) -> chrono::LocalResult<chrono::FixedOffset> {
        self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
    }

    fn offset_from_local_datetime(
        &self,
        local: &chrono::NaiveDateTime,
    ) -> chrono::LocalResult<chrono::FixedOffset> {
        // a local time is valid under an offset when converting it back lands on the same offset
        let valid = |seconds: i32| {
            let offset = chrono::FixedOffset::east_opt(seconds)?;
            let utc = *local - Duration::seconds(seconds as i64);
            (Self::offset_at(&utc) == offset).then_some(offset)
        };
        match (valid(BEFORE), valid(AFTER)) {
            (Some(before), Some(after)) if before != after => {
                chrono::LocalResult::Ambiguous(before, after)
            }
            (Some(offset), _) | (None, Some(offset)) => chrono::LocalResult::Single(offset),
            (None, None) => chrono::LocalResult::None,
        }
    }

    fn offset_from_utc_date(&self, utc: &NaiveDate) -> chrono::FixedOffset {
        Self::offset_at(&utc.and_time(NaiveTime::MIN))
    }

    fn offset_from_utc_datetime(&self, utc: &chrono::NaiveDateTime) -> chrono::FixedOffset {
        Self::offset_at(utc)
    }
}

/// Santiago-like spring forward: midnight of 2024-09-08 is skipped, clocks go from -4 to -3.
#[cfg(test)]
pub const SPRING_FORWARD: ShiftingZone<{ -4 * 3600 }, { -3 * 3600 }, 1_725_768_000> = ShiftingZone;

/// Santiago-like fall back: at midnight of 2024-04-07 clocks return from -3 to 23:00 at -4.
#[cfg(test)]
pub const FALL_BACK: ShiftingZone<{ -3 * 3600 }, { -4 * 3600 }, 1_712_458_800> = ShiftingZone;
