//!  Storage is organized through [file_store::FileStore].
//!  The basic idea is:
//!   - There is a directory holding all of the tracker's data.
//!   - Projects live in a single JSON array, rewritten on every change.
//!   - The active log has a file of its own. It exists only while a timer runs.
//!   - Finished logs are appended to a JSON lines file and never rewritten.

pub mod entities;
pub mod file_store;

use std::{future::Future, ops::Deref};

use anyhow::Result;
use chrono::{DateTime, Utc};

use entities::{Project, TimeLog};

/// Interface for abstracting storage of projects.
pub trait ProjectStore {
    fn list(&self) -> impl Future<Output = Result<Vec<Project>>>;

    /// Adds a project and returns the resulting list. Adding a name that already exists leaves the
    /// list unchanged.
    fn create(&self, project: Project) -> impl Future<Output = Result<Vec<Project>>>;

    /// Removes a project by name and returns the resulting list. Logs are left untouched.
    fn delete(&self, name: &str) -> impl Future<Output = Result<Vec<Project>>>;
}

/// Interface for abstracting storage of time logs.
pub trait LogStore {
    /// Finished logs with `start_time >= start` and `end_time <= end`. Logs crossing either bound
    /// are left out entirely.
    fn list(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Vec<TimeLog>>>;

    fn get_active(&self) -> impl Future<Output = Result<Option<TimeLog>>>;

    /// Persists `log` as the active log. Fails if another log is already active.
    fn start(&self, log: TimeLog) -> impl Future<Output = Result<TimeLog>>;

    /// Moves a finished log from the active slot into the completed list.
    fn finish(&self, log: TimeLog) -> impl Future<Output = Result<TimeLog>>;
}

impl<T: Deref> ProjectStore for T
where
    T::Target: ProjectStore,
{
    fn list(&self) -> impl Future<Output = Result<Vec<Project>>> {
        self.deref().list()
    }

    fn create(&self, project: Project) -> impl Future<Output = Result<Vec<Project>>> {
        self.deref().create(project)
    }

    fn delete(&self, name: &str) -> impl Future<Output = Result<Vec<Project>>> {
        self.deref().delete(name)
    }
}

impl<T: Deref> LogStore for T
where
    T::Target: LogStore,
{
    fn list(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Vec<TimeLog>>> {
        self.deref().list(start, end)
    }

    fn get_active(&self) -> impl Future<Output = Result<Option<TimeLog>>> {
        self.deref().get_active()
    }

    fn start(&self, log: TimeLog) -> impl Future<Output = Result<TimeLog>> {
        self.deref().start(log)
    }

    fn finish(&self, log: TimeLog) -> impl Future<Output = Result<TimeLog>> {
        self.deref().finish(log)
    }
}

/// Range filter shared by store implementations.
pub fn within_range(
    log: &TimeLog,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    if start.is_some_and(|start| log.start_time < start) {
        return false;
    }
    match (end, log.end_time) {
        (Some(end), Some(log_end)) => log_end <= end,
        (Some(_), None) => false,
        (None, _) => true,
    }
}
