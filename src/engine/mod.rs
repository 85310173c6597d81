//! Turns time logs into per-project totals and per-bucket breakdowns.
//!
//! Everything here is a pure function of its inputs: the range preset decides the buckets
//! ([range]), finished logs inside the range give the totals ([totals]) and logs touching the
//! range are split into buckets ([buckets]).

pub mod buckets;
pub mod range;
pub mod totals;

use chrono::TimeZone;
use serde::Serialize;

use crate::storage::{
    entities::{Project, TimeLog},
    within_range,
};

use buckets::{BucketMatrix, bucket_matrix};
use range::{Buckets, DateRange, RangePreset, WeekStart};
use totals::{ProjectTotal, totals};

/// Everything a report shows for one range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    pub range: DateRange,
    pub totals: Vec<ProjectTotal>,
    pub buckets: Option<BucketBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketBreakdown {
    pub preset: String,
    #[serde(flatten)]
    pub buckets: Buckets,
    pub matrix: BucketMatrix,
}

/// Aggregates `logs` over `range`. Totals only count logs lying fully inside the range. Buckets
/// are only computed for presets and take every log that overlaps the range.
pub fn aggregate<Tz: TimeZone>(
    preset: Option<RangePreset>,
    range: DateRange,
    projects: &[Project],
    logs: &[TimeLog],
    tz: &Tz,
    week_start: WeekStart,
) -> Aggregation {
    let contained = logs
        .iter()
        .filter(|log| within_range(log, Some(range.start), Some(range.end)))
        .cloned()
        .collect::<Vec<_>>();

    let buckets = preset.map(|preset| {
        let overlapping = logs
            .iter()
            .filter(|log| overlaps(log, &range))
            .cloned()
            .collect::<Vec<_>>();
        let buckets = preset.resolve(&range, tz, week_start);
        let matrix = bucket_matrix(projects, &overlapping, &buckets, tz);
        BucketBreakdown {
            preset: preset.to_string(),
            buckets,
            matrix,
        }
    });

    Aggregation {
        range,
        totals: totals(projects, &contained),
        buckets,
    }
}

fn overlaps(log: &TimeLog, range: &DateRange) -> bool {
    match log.end_time {
        Some(end) => log.start_time < range.end && end > range.start,
        None => false,
    }
}

mod duration_ser {
    use chrono::Duration;
    use serde::Serializer;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_seconds())
    }
}
