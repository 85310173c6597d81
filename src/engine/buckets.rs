use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Offset, TimeZone, Timelike, Utc};
use serde::Serialize;
use tracing::{instrument, trace};

use crate::{
    storage::entities::{Project, TimeLog},
    utils::time::local_day_start,
};

use super::range::{BucketUnit, Buckets};

/// Seconds a project spent in each bucket, aligned with the bucket labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectBuckets {
    pub project: Arc<str>,
    pub seconds: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketMatrix {
    pub rows: Vec<ProjectBuckets>,
}

impl BucketMatrix {
    pub fn get(&self, project: &str) -> Option<&[i64]> {
        self.rows
            .iter()
            .find(|row| &*row.project == project)
            .map(|row| row.seconds.as_slice())
    }
}

impl BucketUnit {
    /// Start of the unit that contains `time`.
    fn period_start<Tz: TimeZone>(&self, tz: &Tz, time: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            BucketUnit::Hour => {
                // Truncating through the offset keeps half-hour timezones on local hour bounds.
                let offset = tz
                    .offset_from_utc_datetime(&time.naive_utc())
                    .fix()
                    .local_minus_utc() as i64;
                let local = time.timestamp() + offset;
                let truncated = local - local.rem_euclid(3600) - offset;
                DateTime::from_timestamp(truncated, 0).expect("Truncated time stays in range")
            }
            BucketUnit::Weekday(_) | BucketUnit::DayOfMonth(_) => {
                local_day_start(tz, time.with_timezone(tz).date_naive()).to_utc()
            }
        }
    }

    /// Start of the unit following the one that starts at `period_start`.
    fn next_period<Tz: TimeZone>(&self, tz: &Tz, period_start: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            BucketUnit::Hour => period_start + Duration::hours(1),
            BucketUnit::Weekday(_) | BucketUnit::DayOfMonth(_) => {
                let next = period_start
                    .with_timezone(tz)
                    .date_naive()
                    .succ_opt()
                    .expect("End of time should never happen");
                local_day_start(tz, next).to_utc()
            }
        }
    }

    /// Bucket a unit belongs to. Days past the end of a shorter month have no bucket.
    fn index_of<Tz: TimeZone>(&self, tz: &Tz, period_start: DateTime<Utc>) -> Option<usize> {
        let local = period_start.with_timezone(tz);
        match self {
            BucketUnit::Hour => Some(local.hour() as usize),
            BucketUnit::Weekday(week_start) => {
                Some(week_start.days_into_week(local.weekday()) as usize)
            }
            BucketUnit::DayOfMonth(days) => {
                let day = local.day();
                (day <= *days).then(|| day as usize - 1)
            }
        }
    }
}

/// Splits a finished log across the buckets it touches. Each unit the log overlaps is clipped to
/// the log, so the parts always add up to the log's duration.
///
/// Seconds are counted from the log start, so a part gets the whole seconds elapsed at its end
/// minus those elapsed at its start. Fractional seconds carry over to the next part instead of
/// being lost at every boundary.
fn split_log<Tz: TimeZone>(log: &TimeLog, buckets: &Buckets, tz: &Tz, into: &mut [i64]) {
    let Some(end) = log.end_time else {
        return;
    };
    let unit = buckets.unit();
    let elapsed_at = |time: DateTime<Utc>| (time - log.start_time).num_seconds();
    let mut period_start = unit.period_start(tz, log.start_time);
    while period_start < end {
        let period_end = unit.next_period(tz, period_start);
        let clipped_start = period_start.max(log.start_time);
        let clipped_end = period_end.min(end);
        if clipped_end > clipped_start {
            let seconds = elapsed_at(clipped_end) - elapsed_at(clipped_start);
            match unit
                .index_of(tz, period_start)
                .and_then(|index| into.get_mut(index))
            {
                Some(bucket) => *bucket += seconds,
                None => trace!("No bucket for period starting at {period_start}"),
            }
        }
        period_start = period_end;
    }
}

/// Computes the seconds each project spent in each bucket.
///
/// Buckets are matched by unit value (hour of day, weekday, day of month), not by calendar date,
/// so a log crossing midnight contributes to both the `23` and the `0` bucket.
#[instrument(skip_all, fields(unit = ?buckets.unit(), logs = logs.len()))]
pub fn bucket_matrix<Tz: TimeZone>(
    projects: &[Project],
    logs: &[TimeLog],
    buckets: &Buckets,
    tz: &Tz,
) -> BucketMatrix {
    let rows = projects
        .iter()
        .map(|project| {
            let mut seconds = vec![0; buckets.len()];
            logs.iter()
                .filter(|log| log.project_name == project.name)
                .for_each(|log| split_log(log, buckets, tz, &mut seconds));
            ProjectBuckets {
                project: project.name.clone(),
                seconds,
            }
        })
        .collect();
    BucketMatrix { rows }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

    use crate::{
        engine::range::{BucketUnit, Buckets, RangePreset, WeekStart},
        storage::entities::{Project, TimeLog},
        utils::time::{FALL_BACK, SPRING_FORWARD},
    };

    use super::bucket_matrix;

    fn log(project: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> TimeLog {
        TimeLog::start(project.into(), from).with_end(to)
    }

    fn projects(names: &[&str]) -> Vec<Project> {
        names.iter().map(|v| Project::new(v).unwrap()).collect()
    }

    fn hours() -> Buckets {
        let now = Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap();
        let range = RangePreset::Today.range(&now, WeekStart::Sunday);
        RangePreset::Today.resolve(&range, &Utc, WeekStart::Sunday)
    }

    fn week(week_start: WeekStart) -> Buckets {
        let now = Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap();
        let range = RangePreset::ThisWeek.range(&now, week_start);
        RangePreset::ThisWeek.resolve(&range, &Utc, week_start)
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn work_and_study_scenario() {
        let projects = projects(&["Work", "Study"]);
        let logs = vec![
            log("Work", at(5, 8, 0), at(5, 9, 0)),
            log("Study", at(5, 9, 0), at(5, 9, 45)),
        ];
        let matrix = bucket_matrix(&projects, &logs, &hours(), &Utc);

        let work = matrix.get("Work").unwrap();
        let study = matrix.get("Study").unwrap();
        assert_eq!(work.len(), 24);
        assert_eq!(work[8], 3600);
        assert_eq!(study[9], 2700);
        assert_eq!(work.iter().sum::<i64>(), 3600);
        assert_eq!(study.iter().sum::<i64>(), 2700);
    }

    #[test]
    fn log_inside_one_bucket() {
        let projects = projects(&["Work"]);
        let logs = vec![log("Work", at(5, 14, 10), at(5, 14, 50))];
        let matrix = bucket_matrix(&projects, &logs, &hours(), &Utc);
        let work = matrix.get("Work").unwrap();
        assert_eq!(work[14], 40 * 60);
        assert!(
            work.iter()
                .enumerate()
                .all(|(i, v)| i == 14 || *v == 0)
        );
    }

    #[test]
    fn log_across_midnight_is_split() {
        let projects = projects(&["Work"]);
        let entry = log("Work", at(5, 23, 30), at(6, 0, 30));
        let matrix = bucket_matrix(&projects, &[entry.clone()], &hours(), &Utc);
        let work = matrix.get("Work").unwrap();
        assert_eq!(work[23], 30 * 60);
        assert_eq!(work[0], 30 * 60);
        assert_eq!(work.iter().sum::<i64>(), entry.duration().num_seconds());
    }

    #[test]
    fn log_across_several_hours() {
        let projects = projects(&["Work"]);
        let entry = log("Work", at(5, 8, 15), at(5, 11, 5));
        let matrix = bucket_matrix(&projects, &[entry.clone()], &hours(), &Utc);
        let work = matrix.get("Work").unwrap();
        assert_eq!(work[8], 45 * 60);
        assert_eq!(work[9], 3600);
        assert_eq!(work[10], 3600);
        assert_eq!(work[11], 5 * 60);
        assert_eq!(work.iter().sum::<i64>(), entry.duration().num_seconds());
    }

    #[test]
    fn log_ending_on_boundary_stays_in_its_bucket() {
        let projects = projects(&["Work"]);
        let logs = vec![log("Work", at(5, 9, 0), at(5, 10, 0))];
        let matrix = bucket_matrix(&projects, &logs, &hours(), &Utc);
        let work = matrix.get("Work").unwrap();
        assert_eq!(work[9], 3600);
        assert_eq!(work[10], 0);
    }

    #[test]
    fn active_and_foreign_logs_are_ignored() {
        let projects = projects(&["Work"]);
        let logs = vec![
            TimeLog::start("Work".into(), at(5, 9, 0)),
            log("Study", at(5, 9, 0), at(5, 10, 0)),
        ];
        let matrix = bucket_matrix(&projects, &logs, &hours(), &Utc);
        assert!(matrix.get("Work").unwrap().iter().all(|v| *v == 0));
        assert!(matrix.get("Study").is_none());
    }

    #[test]
    fn aggregation_is_idempotent() {
        let projects = projects(&["Work", "Study"]);
        let logs = vec![
            log("Work", at(5, 22, 0), at(6, 2, 0)),
            log("Study", at(5, 9, 0), at(5, 9, 45)),
        ];
        let first = bucket_matrix(&projects, &logs, &hours(), &Utc);
        let second = bucket_matrix(&projects, &logs, &hours(), &Utc);
        assert_eq!(first, second);
        assert!(first.rows.iter().flat_map(|v| v.seconds.iter()).all(|v| *v >= 0));
    }

    #[test]
    fn week_buckets_split_across_week_end() {
        let projects = projects(&["Work"]);
        // 2024-04-06 is a Saturday
        let entry = log("Work", at(6, 22, 0), at(7, 1, 0));
        let matrix = bucket_matrix(&projects, &[entry], &week(WeekStart::Sunday), &Utc);
        let work = matrix.get("Work").unwrap();
        assert_eq!(work[6], 2 * 3600);
        assert_eq!(work[0], 3600);

        let buckets = week(WeekStart::Monday);
        let entry = log("Work", at(6, 22, 0), at(7, 1, 0));
        let matrix = bucket_matrix(&projects, &[entry], &buckets, &Utc);
        let work = matrix.get("Work").unwrap();
        assert_eq!(work[5], 2 * 3600);
        assert_eq!(work[6], 3600);
    }

    #[test]
    fn month_buckets_follow_day_of_month() {
        let projects = projects(&["Work"]);
        let now = at(10, 12, 0);
        let range = RangePreset::ThisMonth.range(&now, WeekStart::Sunday);
        let buckets = RangePreset::ThisMonth.resolve(&range, &Utc, WeekStart::Sunday);
        assert_eq!(buckets.len(), 30);

        let logs = vec![
            log("Work", at(16, 20, 0), at(17, 2, 0)),
            // a 31st has no bucket in April
            log(
                "Work",
                Utc.with_ymd_and_hms(2024, 3, 31, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 3, 31, 10, 0, 0).unwrap(),
            ),
        ];
        let matrix = bucket_matrix(&projects, &logs, &buckets, &Utc);
        let work = matrix.get("Work").unwrap();
        assert_eq!(work[15], 4 * 3600);
        assert_eq!(work[16], 2 * 3600);
        assert_eq!(work.iter().sum::<i64>(), 6 * 3600);
    }

    #[test]
    fn hours_follow_local_timezone() {
        let tz = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let projects = projects(&["Work"]);
        // 03:45 to 05:15 UTC is 09:15 to 10:45 local
        let logs = vec![log("Work", at(5, 3, 45), at(5, 5, 15))];
        let matrix = bucket_matrix(&projects, &logs, &hours(), &tz);
        let work = matrix.get("Work").unwrap();
        assert_eq!(work[9], 45 * 60);
        assert_eq!(work[10], 45 * 60);
        assert_eq!(work.iter().sum::<i64>(), Duration::minutes(90).num_seconds());
    }

    #[test]
    fn fractional_seconds_are_not_lost_at_boundaries() {
        let projects = projects(&["Work"]);
        let half = Duration::milliseconds(500);
        let entry = log("Work", at(5, 23, 30) + half, at(6, 0, 30) + half);
        let matrix = bucket_matrix(&projects, &[entry.clone()], &hours(), &Utc);
        let work = matrix.get("Work").unwrap();
        assert_eq!(work[23] + work[0], 3600);
        assert_eq!(work.iter().sum::<i64>(), entry.duration().num_seconds());

        let entry = log("Work", at(5, 8, 59) + half, at(5, 11, 0) + Duration::milliseconds(250));
        let matrix = bucket_matrix(&projects, &[entry.clone()], &hours(), &Utc);
        let work = matrix.get("Work").unwrap();
        assert_eq!(work.iter().sum::<i64>(), entry.duration().num_seconds());
    }

    #[test]
    fn weekday_buckets_come_from_resolve() {
        let buckets = week(WeekStart::Sunday);
        assert_eq!(buckets.unit(), BucketUnit::Weekday(WeekStart::Sunday));
        assert_eq!(buckets.len(), 7);
    }

    #[test]
    fn repeated_hour_lands_in_one_bucket() {
        let projects = projects(&["Work"]);
        // 22:30 at -3 until the second 23:30, now at -4
        let entry = log(
            "Work",
            Utc.with_ymd_and_hms(2024, 4, 7, 1, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 7, 3, 30, 0).unwrap(),
        );
        let matrix = bucket_matrix(&projects, &[entry], &hours(), &FALL_BACK);
        let work = matrix.get("Work").unwrap();
        assert_eq!(work[22], 30 * 60);
        assert_eq!(work[23], 90 * 60);
        assert_eq!(work.iter().sum::<i64>(), 2 * 3600);
    }

    #[test]
    fn days_split_at_midnight_after_spring_forward() {
        let projects = projects(&["Work"]);
        let now = SPRING_FORWARD.with_ymd_and_hms(2024, 9, 20, 12, 0, 0).unwrap();
        let range = RangePreset::ThisMonth.range(&now, WeekStart::Sunday);
        let buckets = RangePreset::ThisMonth.resolve(&range, &SPRING_FORWARD, WeekStart::Sunday);

        // 22:00 on the 7th at -4 until 02:00 on the 8th at -3
        let entry = log(
            "Work",
            Utc.with_ymd_and_hms(2024, 9, 8, 2, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 9, 8, 5, 0, 0).unwrap(),
        );
        let matrix = bucket_matrix(&projects, &[entry], &buckets, &SPRING_FORWARD);
        let work = matrix.get("Work").unwrap();
        assert_eq!(work[6], 2 * 3600);
        assert_eq!(work[7], 3600);
    }
}
