use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;

use crate::{
    storage::entities::{Project, TimeLog},
    utils::percentage::{Percentage, duration_percentage},
};

use super::duration_ser;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectTotal {
    pub project: Arc<str>,
    #[serde(rename = "seconds", with = "duration_ser")]
    pub duration: Duration,
    /// Share of the time booked on all listed projects.
    pub share: Percentage,
}

/// Time spent on `project` across `logs`. Logs are expected to be filtered to the range already;
/// active logs count as zero.
pub fn project_total(project: &str, logs: &[TimeLog]) -> Duration {
    logs.iter()
        .filter(|log| &*log.project_name == project)
        .fold(Duration::zero(), |acc, log| acc + log.duration())
}

/// One total per project, in project order. Logs of projects that are not listed are ignored.
pub fn totals(projects: &[Project], logs: &[TimeLog]) -> Vec<ProjectTotal> {
    let durations = projects
        .iter()
        .map(|project| (project.name.clone(), project_total(&project.name, logs)))
        .collect::<Vec<_>>();

    let whole = durations
        .iter()
        .fold(Duration::zero(), |acc, (_, duration)| acc + *duration);

    durations
        .into_iter()
        .map(|(project, duration)| ProjectTotal {
            project,
            duration,
            share: duration_percentage(duration, whole),
        })
        .collect()
}
