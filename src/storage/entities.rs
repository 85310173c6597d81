use std::sync::Arc;

use anyhow::{Result, bail};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A project logs are booked against. The name is the identifier.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize, Clone)]
pub struct Project {
    pub name: Arc<str>,
}

impl Project {
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Project name can't be empty");
        }
        Ok(Self { name: name.into() })
    }
}

/// A stretch of time spent on a project. A log without `end_time` is the active log; it becomes
/// immutable once finished.
///
/// Logs reference projects by name only. Deleting a project leaves its logs in place.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TimeLog {
    pub project_name: Arc<str>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl TimeLog {
    /// Opens a new active log.
    pub fn start(project_name: Arc<str>, start_time: DateTime<Utc>) -> Self {
        Self {
            project_name,
            start_time,
            end_time: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Closes the log at `end_time`.
    pub fn finish(self, end_time: DateTime<Utc>) -> Result<Self> {
        if let Some(end) = self.end_time {
            bail!(
                "Log for {} started at {} was already finished at {end}",
                self.project_name,
                self.start_time
            );
        }
        let finished = Self {
            end_time: Some(end_time),
            ..self
        };
        finished.validate()?;
        Ok(finished)
    }

    /// Rejects logs that end before they start.
    pub fn validate(&self) -> Result<()> {
        match self.end_time {
            Some(end) if end < self.start_time => bail!(
                "Log for {} ends at {end} before it starts at {}",
                self.project_name,
                self.start_time
            ),
            _ => Ok(()),
        }
    }

    /// Time covered by a finished log. Active logs count as zero.
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end - self.start_time,
            None => Duration::zero(),
        }
    }

    pub fn with_end(self, end_time: DateTime<Utc>) -> Self {
        Self {
            end_time: Some(end_time),
            ..self
        }
    }
}
