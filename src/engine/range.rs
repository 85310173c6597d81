use std::{fmt::Display, str::FromStr};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc, Weekday};
use clap::ValueEnum;
use serde::Serialize;

use crate::utils::time::local_day_start;

/// Named ranges a report can be shown for. Each one decides how the range is split into buckets,
/// so the set is closed on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RangePreset {
    Today,
    #[value(name = "week")]
    ThisWeek,
    #[value(name = "month")]
    ThisMonth,
}

impl Display for RangePreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangePreset::Today => write!(f, "Today"),
            RangePreset::ThisWeek => write!(f, "This week"),
            RangePreset::ThisMonth => write!(f, "This month"),
        }
    }
}

impl FromStr for RangePreset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Today" | "today" => Ok(RangePreset::Today),
            "This week" | "week" => Ok(RangePreset::ThisWeek),
            "This month" | "month" => Ok(RangePreset::ThisMonth),
            _ => Err(anyhow!("Unknown range {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl Display for WeekStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeekStart::Sunday => write!(f, "sunday"),
            WeekStart::Monday => write!(f, "monday"),
        }
    }
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }

    /// Position of `day` in a week starting on `self`, 0..7.
    pub fn days_into_week(self, day: Weekday) -> u32 {
        (day.num_days_from_monday() + 7 - self.weekday().num_days_from_monday()) % 7
    }
}

/// A span of time a report covers. `start` is inclusive and `end` is the instant the next period
/// begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(anyhow!("Range end {end} is before its start {start}"));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// What a single bucket stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BucketUnit {
    /// Hour of day, 24 buckets.
    Hour,
    /// Day of week, 7 buckets ordered from the week start.
    Weekday(WeekStart),
    /// Day of month, one bucket per day of the range's month.
    DayOfMonth(u32),
}

/// Ordered bucket labels together with the unit they stand for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Buckets {
    unit: BucketUnit,
    labels: Vec<String>,
}

impl Buckets {
    pub fn unit(&self) -> BucketUnit {
        self.unit
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl RangePreset {
    /// The period of this preset that contains `now`, in `now`'s timezone.
    pub fn range<Tz: TimeZone>(self, now: &DateTime<Tz>, week_start: WeekStart) -> DateRange {
        let tz = now.timezone();
        let today = now.date_naive();
        let (first, next) = match self {
            RangePreset::Today => (today, day_after(today)),
            RangePreset::ThisWeek => {
                let offset = week_start.days_into_week(today.weekday());
                let first = today - Duration::days(offset as i64);
                (first, first + Duration::days(7))
            }
            RangePreset::ThisMonth => {
                let first = today.with_day(1).expect("Every month has a first day");
                (first, first + Months::new(1))
            }
        };
        DateRange {
            start: local_day_start(&tz, first).to_utc(),
            end: local_day_start(&tz, next).to_utc(),
        }
    }

    /// Labels and unit the range is split into. The month length is taken from the month `range`
    /// starts in.
    pub fn resolve<Tz: TimeZone>(self, range: &DateRange, tz: &Tz, week_start: WeekStart) -> Buckets {
        match self {
            RangePreset::Today => Buckets {
                unit: BucketUnit::Hour,
                labels: (0..24).map(|v| v.to_string()).collect(),
            },
            RangePreset::ThisWeek => Buckets {
                unit: BucketUnit::Weekday(week_start),
                labels: std::iter::successors(Some(week_start.weekday()), |day| Some(day.succ()))
                    .take(7)
                    .map(weekday_name)
                    .collect(),
            },
            RangePreset::ThisMonth => {
                let first = range.start.with_timezone(tz).date_naive();
                let days = days_in_month(first);
                Buckets {
                    unit: BucketUnit::DayOfMonth(days),
                    labels: (1..=days).map(|v| v.to_string()).collect(),
                }
            }
        }
    }
}

fn day_after(date: NaiveDate) -> NaiveDate {
    date.succ_opt().expect("End of time should never happen")
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = date.with_day(1).expect("Every month has a first day");
    let next = first + Months::new(1);
    (next - first).num_days() as u32
}

fn weekday_name(day: Weekday) -> String {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
    .to_string()
}
