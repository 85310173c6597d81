use std::fmt::Display;

use ansi_term::Style;
use anyhow::Result;
use chrono::{DateTime, Duration, Local, TimeZone};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use now::DateTimeNow;

use crate::{
    engine::{
        Aggregation, aggregate,
        range::{BucketUnit, DateRange, RangePreset, WeekStart},
    },
    storage::{LogStore, ProjectStore},
    utils::{clock::Clock, time::{format_duration, next_day_start}},
};

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct ReportCommand {
    #[arg(
        short,
        long,
        value_enum,
        default_value_t = RangePreset::Today,
        help = "Range to report on. Today is split by hour, week by weekday and month by day"
    )]
    range: RangePreset,
    #[arg(long, value_enum, default_value_t = WeekStart::Sunday, help = "First day of the week")]
    week_start: WeekStart,
    #[arg(
        long = "start",
        short,
        help = "Start of a custom range instead of a preset. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\". Custom ranges only show totals"
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "End of a custom range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(
        long = "days",
        default_value_t = false,
        help = "Take custom range inputs as whole days. For example if start and end are both 15/03/2025 this option allows to extract the whole day"
    )]
    treat_as_days: bool,
    #[arg(long, help = "Print the report as JSON")]
    json: bool,
}

/// Command to process `report` command. Reads every log, aggregates it over the selected range
/// and prints totals followed by the bucket breakdown.
pub async fn process_report_command(
    ReportCommand {
        range,
        week_start,
        start_date,
        end_date,
        date_style,
        treat_as_days,
        json,
    }: ReportCommand,
    projects: &impl ProjectStore,
    logs: &impl LogStore,
    clock: &dyn Clock,
) -> Result<()> {
    let now = clock.time().with_timezone(&Local);

    let (preset, date_range) =
        match parse_custom_range(start_date, end_date, date_style, treat_as_days, now)? {
            Some(custom) => (None, custom),
            None => (Some(range), range.range(&now, week_start)),
        };

    let projects = projects.list().await?;
    let logs = logs.list(None, None).await?;

    let aggregation = aggregate(preset, date_range, &projects, &logs, &Local, week_start);

    if json {
        println!("{}", serde_json::to_string_pretty(&aggregation)?);
    } else {
        print_report(&aggregation, preset, &Local);
    }
    Ok(())
}

/// Parses `--start`/`--end` into a range. `None` when neither was given and a preset applies.
fn parse_custom_range<Tz: TimeZone>(
    start_date: Option<String>,
    end_date: Option<String>,
    date_style: DateStyle,
    treat_as_days: bool,
    now: DateTime<Tz>,
) -> Result<Option<DateRange>>
where
    Tz::Offset: Copy,
{
    if start_date.is_none() && end_date.is_none() {
        return Ok(None);
    }
    let dialect: chrono_english::Dialect = date_style.into();
    let mut start = match start_date.map(|s| parse_date_string(&s, now.clone(), dialect)) {
        Some(Ok(v)) => v,
        Some(Err(e)) => {
            return Err(validation_error(format!("Failed to validate start date {e}")));
        }
        None => now.beginning_of_day(),
    };
    let mut end = match end_date.map(|s| parse_date_string(&s, now.clone(), dialect)) {
        Some(Ok(v)) => v,
        Some(Err(e)) => {
            return Err(validation_error(format!("Failed to validate end date {e}")));
        }
        None => now,
    };
    if treat_as_days {
        start = start.beginning_of_day();
        end = next_day_start(end);
    }
    if end < start {
        return Err(validation_error(format!(
            "Range end {end:?} is before its start {start:?}"
        )));
    }
    Ok(Some(DateRange::new(start.to_utc(), end.to_utc())?))
}

fn validation_error(message: String) -> anyhow::Error {
    Args::command()
        .error(clap::error::ErrorKind::ValueValidation, message)
        .into()
}

fn print_report<Tz: TimeZone>(aggregation: &Aggregation, preset: Option<RangePreset>, tz: &Tz)
where
    Tz::Offset: Display,
{
    let heading = Style::new().bold();
    let range = &aggregation.range;
    let title = preset.map_or_else(|| "Custom range".to_string(), |v| v.to_string());
    println!(
        "{} {} - {}",
        heading.paint(title),
        range.start.with_timezone(tz).format("%x %H:%M"),
        range.end.with_timezone(tz).format("%x %H:%M")
    );
    println!();

    if aggregation.totals.is_empty() {
        println!("No projects yet. Create one with `tmt project add`");
        return;
    }

    for total in &aggregation.totals {
        println!(
            "{}\t{}\t{}",
            heading.paint(total.project.to_string()),
            format_duration(total.duration),
            total.share
        );
    }

    let Some(breakdown) = &aggregation.buckets else {
        return;
    };

    println!();
    let unit_name = match breakdown.buckets.unit() {
        BucketUnit::Hour => "Hour",
        BucketUnit::Weekday(_) => "Day",
        BucketUnit::DayOfMonth(_) => "Date",
    };
    let header = breakdown
        .matrix
        .rows
        .iter()
        .map(|row| row.project.to_string())
        .collect::<Vec<_>>()
        .join("\t");
    println!("{}", heading.paint(format!("{unit_name}\t{header}")));

    for (index, label) in breakdown.buckets.labels().iter().enumerate() {
        let cells = breakdown
            .matrix
            .rows
            .iter()
            .map(|row| format_duration(Duration::seconds(row.seconds[index])))
            .collect::<Vec<_>>()
            .join("\t");
        println!("{label}\t{cells}");
    }
}
