use std::{io::Write, sync::Arc};

use anyhow::{Result, bail};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    storage::{LogStore, ProjectStore},
    timer::ActiveTimer,
    utils::{clock::Clock, shutdown::detect_shutdown, time::format_duration},
};

/// Starts tracking a known project. Whatever ran before is finished first.
pub async fn start_project(
    project: &str,
    projects: &impl ProjectStore,
    logs: impl LogStore,
    clock: Arc<dyn Clock>,
) -> Result<()> {
    let project = project.trim();
    let known = projects.list().await?;
    let Some(project) = known.into_iter().find(|v| &*v.name == project) else {
        bail!("Unknown project {project}. Create it first with `tmt project add`");
    };

    let mut timer = ActiveTimer::restore(logs, clock).await?;
    if let Some(finished) = timer.start(project.name.clone()).await? {
        println!(
            "Stopped {}\t{}",
            finished.project_name,
            format_duration(finished.duration())
        );
    }
    println!("Started {}", project.name);
    Ok(())
}

pub async fn stop_project(logs: impl LogStore, clock: Arc<dyn Clock>) -> Result<()> {
    let mut timer = ActiveTimer::restore(logs, clock).await?;
    match timer.stop().await? {
        Some(finished) => println!(
            "Stopped {}\t{}",
            finished.project_name,
            format_duration(finished.duration())
        ),
        None => println!("No project is being tracked"),
    }
    Ok(())
}

/// Prints the running project. With `watch` the elapsed time is redrawn every second until Ctrl-C
/// or until the log is finished from elsewhere.
pub async fn show_status<S: LogStore>(
    watch: bool,
    logs: &S,
    clock: Arc<dyn Clock>,
) -> Result<()> {
    let timer = ActiveTimer::restore(logs, clock).await?;
    let (Some(active), Some(elapsed)) = (timer.active().cloned(), timer.elapsed()) else {
        println!("No project is being tracked");
        return Ok(());
    };

    if !watch {
        println!("{}\t{}", active.project_name, format_duration(elapsed));
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let Some(ticks) = timer.ticks(shutdown.clone()) else {
        return Ok(());
    };

    let printer = async {
        // Whichever way the printer ends, shutdown detection has to end with it.
        let _cancel_on_exit = shutdown.clone().drop_guard();
        let mut ticks = std::pin::pin!(ticks);
        let mut stdout = std::io::stdout();
        while let Some(elapsed) = ticks.next().await {
            if logs.get_active().await?.as_ref() != Some(&active) {
                debug!("Active log changed, stopping status updates");
                writeln!(stdout)?;
                writeln!(stdout, "{} is no longer tracked", active.project_name)?;
                return Ok(());
            }
            write!(
                stdout,
                "\r{}\t{}   ",
                active.project_name,
                format_duration(elapsed)
            )?;
            stdout.flush()?;
        }
        writeln!(stdout)?;
        anyhow::Ok(())
    };

    let (_, result) = tokio::join!(detect_shutdown(shutdown.clone()), printer);
    result
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use anyhow::{Result, anyhow};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{
        storage::{
            LogStore, ProjectStore,
            entities::{Project, TimeLog},
            file_store::{LogFileStore, ProjectFileStore},
        },
        utils::clock::{MockClock, TestClock},
    };

    use super::{show_status, start_project, stop_project};

    fn fixed_clock(minutes: i64) -> MockClock {
        let mut clock = MockClock::new();
        clock.expect_time().returning(move || {
            Utc.with_ymd_and_hms(2024, 4, 5, 9, 0, 0).unwrap() + Duration::minutes(minutes)
        });
        clock
    }

    #[tokio::test]
    async fn start_requires_known_project() -> Result<()> {
        let dir = tempdir()?;
        let projects = ProjectFileStore::new(dir.path())?;
        let logs = LogFileStore::new(dir.path())?;

        assert!(
            start_project("Work", &projects, &logs, Arc::new(fixed_clock(0)))
                .await
                .is_err()
        );
        assert!(logs.get_active().await?.is_none());

        projects.create(Project::new("Work")?).await?;
        start_project("Work", &projects, &logs, Arc::new(fixed_clock(0))).await?;
        assert_eq!(&*logs.get_active().await?.unwrap().project_name, "Work");

        show_status(false, &logs, Arc::new(fixed_clock(20))).await?;

        stop_project(&logs, Arc::new(fixed_clock(45))).await?;
        assert!(logs.get_active().await?.is_none());
        let finished = logs.list(None, None).await?;
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].duration(), Duration::minutes(45));

        // stopping again is harmless
        stop_project(&logs, Arc::new(fixed_clock(50))).await?;
        assert_eq!(logs.list(None, None).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn names_are_trimmed_like_on_create() -> Result<()> {
        let dir = tempdir()?;
        let projects = ProjectFileStore::new(dir.path())?;
        let logs = LogFileStore::new(dir.path())?;
        projects.create(Project::new(" Work")?).await?;

        start_project(" Work ", &projects, &logs, Arc::new(fixed_clock(0))).await?;
        assert_eq!(&*logs.get_active().await?.unwrap().project_name, "Work");
        Ok(())
    }

    /// Serves the active log once, then fails every read.
    struct BrokenLogStore {
        active: TimeLog,
        reads: AtomicUsize,
    }

    impl LogStore for BrokenLogStore {
        async fn list(
            &self,
            _start: Option<DateTime<Utc>>,
            _end: Option<DateTime<Utc>>,
        ) -> Result<Vec<TimeLog>> {
            Ok(vec![])
        }

        async fn get_active(&self) -> Result<Option<TimeLog>> {
            match self.reads.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(Some(self.active.clone())),
                _ => Err(anyhow!("Storage went away")),
            }
        }

        async fn start(&self, log: TimeLog) -> Result<TimeLog> {
            Ok(log)
        }

        async fn finish(&self, log: TimeLog) -> Result<TimeLog> {
            Ok(log)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn watch_returns_when_store_fails() -> Result<()> {
        let start = Utc.with_ymd_and_hms(2024, 4, 5, 9, 0, 0).unwrap();
        let store = BrokenLogStore {
            active: TimeLog::start("Work".into(), start),
            reads: AtomicUsize::new(0),
        };
        let clock = Arc::new(TestClock::starting_at(start + Duration::minutes(5)));

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            show_status(true, &store, clock),
        )
        .await;
        assert!(matches!(result, Ok(Err(_))));
        Ok(())
    }
}
