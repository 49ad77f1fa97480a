//! Local activity loop over a queue directory.
//!
//! Each pending task is a `<name>.json` file holding a [`TaskEnvelope`].
//! A worker claims it by renaming it to `<name>.json.running`, runs the
//! handler, then writes `<name>.out.json` (the output list) or
//! `<name>.err.json` (`{"error": "..."}`) and removes the claim file.
//! Renaming is the only coordination, so several workers may share a queue.

use crate::granule::TaskEnvelope;
use crate::temp_file::PartFile;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TASK_SUFFIX: &str = ".json";
const RUNNING_SUFFIX: &str = ".json.running";
const OUT_SUFFIX: &str = ".out.json";
const ERR_SUFFIX: &str = ".err.json";

#[derive(Debug, Serialize)]
struct TaskFailure {
    error: String,
}

/// What happened to one claimed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed { name: String, output: PathBuf },
    Failed { name: String, output: PathBuf },
}

#[derive(Debug, Clone)]
pub struct DirQueue {
    dir: PathBuf,
}

impl DirQueue {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Pending task names (without `.json`), sorted.
    pub fn pending(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let entries =
            fs::read_dir(&self.dir).with_context(|| format!("read queue {}", self.dir.display()))?;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.ends_with(OUT_SUFFIX) || file_name.ends_with(ERR_SUFFIX) {
                continue;
            }
            if let Some(name) = file_name.strip_suffix(TASK_SUFFIX) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Claim `name` by renaming it; `None` if another worker got there first.
    pub fn claim(&self, name: &str) -> Result<Option<PathBuf>> {
        let from = self.dir.join(format!("{}{}", name, TASK_SUFFIX));
        let to = self.dir.join(format!("{}{}", name, RUNNING_SUFFIX));
        match fs::rename(&from, &to) {
            Ok(()) => Ok(Some(to)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("claim {}", from.display())),
        }
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, OUT_SUFFIX))
    }

    pub fn error_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, ERR_SUFFIX))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_vec_pretty(value)?;
    let mut part = PartFile::create(path)?;
    part.append(&data)?;
    part.finalize(path)
}

pub struct ActivityLoop<F> {
    queue: DirQueue,
    handler: F,
    poll_interval: Duration,
    max_tasks: Option<usize>,
    stop: Arc<AtomicBool>,
}

impl<F> ActivityLoop<F>
where
    F: FnMut(&TaskEnvelope) -> Result<Vec<String>>,
{
    pub fn new(queue: DirQueue, poll_interval: Duration, handler: F) -> Self {
        Self {
            queue,
            handler,
            poll_interval,
            max_tasks: None,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop after this many tasks (completed or failed).
    pub fn with_max_tasks(mut self, max: usize) -> Self {
        self.max_tasks = Some(max);
        self
    }

    /// Flag that ends `run` at the next poll when set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Claim and run at most one pending task.
    pub fn run_once(&mut self) -> Result<Option<TaskOutcome>> {
        for name in self.queue.pending()? {
            let Some(claimed) = self.queue.claim(&name)? else {
                continue;
            };
            let outcome = self.run_claimed(&name, &claimed)?;
            fs::remove_file(&claimed)
                .with_context(|| format!("remove claim {}", claimed.display()))?;
            return Ok(Some(outcome));
        }
        Ok(None)
    }

    fn run_claimed(&mut self, name: &str, claimed: &Path) -> Result<TaskOutcome> {
        tracing::info!(task = name, "task claimed");
        let result = fs::read(claimed)
            .with_context(|| format!("read {}", claimed.display()))
            .and_then(|data| {
                serde_json::from_slice::<TaskEnvelope>(&data)
                    .with_context(|| format!("parse task {}", name))
            })
            .and_then(|task| (self.handler)(&task));

        match result {
            Ok(keys) => {
                let output = self.queue.output_path(name);
                write_json(&output, &keys)?;
                tracing::info!(task = name, outputs = keys.len(), "task completed");
                Ok(TaskOutcome::Completed {
                    name: name.to_string(),
                    output,
                })
            }
            Err(e) => {
                let output = self.queue.error_path(name);
                let error = format!("{:#}", e);
                tracing::warn!(task = name, "task failed: {}", error);
                write_json(&output, &TaskFailure { error })?;
                Ok(TaskOutcome::Failed {
                    name: name.to_string(),
                    output,
                })
            }
        }
    }

    /// Poll until stopped or `max_tasks` reached; returns the number of tasks handled.
    pub fn run(&mut self) -> Result<usize> {
        fs::create_dir_all(self.queue.dir())
            .with_context(|| format!("create queue {}", self.queue.dir().display()))?;
        tracing::info!(queue = %self.queue.dir().display(), "activity loop started");
        let mut handled = 0usize;
        loop {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            if self.max_tasks.is_some_and(|max| handled >= max) {
                break;
            }
            match self.run_once()? {
                Some(_) => handled += 1,
                None => std::thread::sleep(self.poll_interval),
            }
        }
        tracing::info!(handled, "activity loop stopped");
        Ok(handled)
    }
}
