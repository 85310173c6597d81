//! The single running timer. At most one log is open at a time: starting a project while another
//! one runs closes the running log first.

pub mod ticker;

use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use futures::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    storage::{LogStore, entities::TimeLog},
    utils::clock::Clock,
};

use ticker::elapsed_ticks;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running(TimeLog),
}

/// Holds the active log and keeps it in sync with a [LogStore].
pub struct ActiveTimer<S: LogStore> {
    store: S,
    clock: Arc<dyn Clock>,
    state: TimerState,
}

impl<S: LogStore> ActiveTimer<S> {
    /// Picks up a log left active by a previous run.
    pub async fn restore(store: S, clock: Arc<dyn Clock>) -> Result<Self> {
        let state = match store.get_active().await? {
            Some(log) => {
                debug!("Restored active log for {}", log.project_name);
                TimerState::Running(log)
            }
            None => TimerState::Idle,
        };
        Ok(Self {
            store,
            clock,
            state,
        })
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn active(&self) -> Option<&TimeLog> {
        match &self.state {
            TimerState::Running(log) => Some(log),
            TimerState::Idle => None,
        }
    }

    /// Starts tracking `project`. A log that is already running is finished first and returned.
    pub async fn start(&mut self, project: Arc<str>) -> Result<Option<TimeLog>> {
        let finished = self.stop().await?;
        let log = TimeLog::start(project, self.clock.time());
        let log = self.store.start(log).await?;
        info!("Started {} at {}", log.project_name, log.start_time);
        self.state = TimerState::Running(log);
        Ok(finished)
    }

    /// Finishes the running log. Stopping an idle timer does nothing.
    pub async fn stop(&mut self) -> Result<Option<TimeLog>> {
        let TimerState::Running(log) = &self.state else {
            debug!("Timer is idle, nothing to stop");
            return Ok(None);
        };
        let finished = log.clone().finish(self.clock.time())?;
        let finished = self.store.finish(finished).await?;
        info!(
            "Stopped {} after {}s",
            finished.project_name,
            finished.duration().num_seconds()
        );
        self.state = TimerState::Idle;
        Ok(Some(finished))
    }

    /// Time since the running log started.
    pub fn elapsed(&self) -> Option<Duration> {
        self.active()
            .map(|log| (self.clock.time() - log.start_time).max(Duration::zero()))
    }

    /// Live elapsed time of the running log, see [elapsed_ticks].
    pub fn ticks(&self, shutdown: CancellationToken) -> Option<impl Stream<Item = Duration>> {
        self.active()
            .map(|log| elapsed_ticks(log.start_time, self.clock.clone(), shutdown))
    }
}
