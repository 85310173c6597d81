use std::{
    io::{ErrorKind, SeekFrom},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use fs4::tokio::AsyncFileExt;
use serde::{Serialize, de::DeserializeOwned};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, info, warn};

use super::{
    LogStore, ProjectStore,
    entities::{Project, TimeLog},
    within_range,
};

const PROJECTS_FILE: &str = "projects.json";
const ACTIVE_LOG_FILE: &str = "active.json";
const LOGS_FILE: &str = "logs.jsonl";

/// Reads a whole JSON document. A missing file and a document that doesn't parse both read as
/// `None`: losing a corrupted file is preferred to refusing to work.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    async fn extract(path: &Path) -> std::result::Result<String, std::io::Error> {
        debug!("Extracting {path:?}");
        let mut file = File::open(path).await?;
        file.lock_shared()?;
        let mut content = String::new();
        let read = file.read_to_string(&mut content).await;
        file.unlock_async().await?;
        read?;
        Ok(content)
    }

    let content = match extract(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {path:?}"))?,
    };

    if content.trim().is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<T>(&content) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            warn!("Found illegal json in {path:?}, treating it as empty: {e}");
            Ok(None)
        }
    }
}

/// Replaces a file's contents with `value` under an exclusive lock.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let buffer = serde_json::to_vec_pretty(value)?;

    let mut file = File::options()
        .write(true)
        .create(true)
        .read(true)
        .truncate(false)
        .open(path)
        .await?;

    // Semi-safe acquire-release for a file
    file.lock_exclusive()?;
    let result = async {
        file.set_len(0).await?;
        file.seek(SeekFrom::Start(0)).await?;
        file.write_all(&buffer).await?;
        file.flush().await
    }
    .await;
    file.unlock_async().await?;
    result.with_context(|| format!("Failed to write {path:?}"))
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {path:?}")),
    }
}

/// [ProjectStore] keeping the project list in `projects.json`.
pub struct ProjectFileStore {
    path: PathBuf,
}

impl ProjectFileStore {
    pub fn new(dir: &Path) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(PROJECTS_FILE),
        })
    }
}

impl ProjectStore for ProjectFileStore {
    async fn list(&self) -> Result<Vec<Project>> {
        Ok(read_json::<Vec<Project>>(&self.path)
            .await?
            .unwrap_or_default())
    }

    async fn create(&self, project: Project) -> Result<Vec<Project>> {
        let mut projects = self.list().await?;
        if projects.iter().any(|v| v.name == project.name) {
            warn!("Project {} already exists", project.name);
            return Ok(projects);
        }
        info!("Creating project {}", project.name);
        projects.push(project);
        write_json(&self.path, &projects).await?;
        Ok(projects)
    }

    async fn delete(&self, name: &str) -> Result<Vec<Project>> {
        let mut projects = self.list().await?;
        let before = projects.len();
        projects.retain(|v| &*v.name != name);
        if projects.len() == before {
            warn!("Project {name} doesn't exist");
            return Ok(projects);
        }
        info!("Deleting project {name}");
        write_json(&self.path, &projects).await?;
        Ok(projects)
    }
}

/// [LogStore] keeping the active log in `active.json` and finished logs in `logs.jsonl`.
pub struct LogFileStore {
    active_path: PathBuf,
    logs_path: PathBuf,
}

impl LogFileStore {
    pub fn new(dir: &Path) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            active_path: dir.join(ACTIVE_LOG_FILE),
            logs_path: dir.join(LOGS_FILE),
        })
    }

    async fn read_logs(&self) -> Result<Vec<TimeLog>> {
        async fn extract(path: &Path) -> std::result::Result<Vec<TimeLog>, std::io::Error> {
            debug!("Extracting {path:?}");
            let file = File::open(path).await?;
            file.lock_shared()?;
            let mut reader = BufReader::new(file);
            let mut line = vec![];
            let mut logs = vec![];
            let read = loop {
                line.clear();
                match reader.read_until(b'\n', &mut line).await {
                    Ok(0) => break Ok(()),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                }
                if line.trim_ascii().is_empty() {
                    continue;
                }
                // Lines are parsed as bytes so one line of broken UTF-8 doesn't end the read.
                match serde_json::from_slice::<TimeLog>(&line) {
                    Ok(log) if log.is_active() || log.validate().is_err() => {
                        warn!(
                            "Found malformed log in {path:?}, skipping {}",
                            String::from_utf8_lossy(&line).trim_end()
                        );
                    }
                    Ok(log) => logs.push(log),
                    Err(e) => {
                        // ignore illegal values. Might happen after an interrupted write
                        warn!(
                            "During parsing in path {path:?} found illegal json string {}: {e}",
                            String::from_utf8_lossy(&line).trim_end()
                        );
                    }
                }
            };

            reader.into_inner().unlock_async().await?;
            read?;

            Ok(logs)
        }

        match extract(&self.logs_path).await {
            Ok(logs) => Ok(logs),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(vec![]),
            Err(e) => Err(e).with_context(|| format!("Failed to read {:?}", self.logs_path)),
        }
    }

    async fn append_log(&self, log: &TimeLog) -> Result<()> {
        let mut buffer = serde_json::to_vec(log)?;
        buffer.push(b'\n');

        let mut file = File::options()
            .create(true)
            .append(true)
            .open(&self.logs_path)
            .await?;

        file.lock_exclusive()?;
        let result = async {
            file.write_all(&buffer).await?;
            file.flush().await
        }
        .await;
        file.unlock_async().await?;
        result.with_context(|| format!("Failed to append to {:?}", self.logs_path))
    }
}

impl LogStore for LogFileStore {
    async fn list(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<TimeLog>> {
        let logs = self.read_logs().await?;
        Ok(logs
            .into_iter()
            .filter(|log| within_range(log, start, end))
            .collect())
    }

    async fn get_active(&self) -> Result<Option<TimeLog>> {
        match read_json::<TimeLog>(&self.active_path).await? {
            Some(log) if !log.is_active() => {
                warn!("Active log slot holds a finished log, ignoring it {log:?}");
                Ok(None)
            }
            v => Ok(v),
        }
    }

    async fn start(&self, log: TimeLog) -> Result<TimeLog> {
        if !log.is_active() {
            bail!("Can't start a log that is already finished {log:?}");
        }
        if let Some(active) = self.get_active().await? {
            bail!(
                "A log for {} is already active since {}",
                active.project_name,
                active.start_time
            );
        }
        info!("Starting log for {}", log.project_name);
        write_json(&self.active_path, &log).await?;
        Ok(log)
    }

    async fn finish(&self, log: TimeLog) -> Result<TimeLog> {
        if log.is_active() {
            bail!("Can't store a log without an end time {log:?}");
        }
        log.validate()?;
        info!(
            "Finishing log for {} after {}s",
            log.project_name,
            log.duration().num_seconds()
        );
        self.append_log(&log).await?;
        remove_if_exists(&self.active_path).await?;
        Ok(log)
    }
}
