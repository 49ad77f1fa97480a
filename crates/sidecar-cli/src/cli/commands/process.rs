//! `sidecar process` – run the activity on a single task.

use anyhow::{Context, Result};
use sidecar_core::config::SidecarConfig;
use sidecar_core::granule::{TaskConfig, TaskEnvelope, TaskInput};
use sidecar_core::process::{run_task, Workspace};
use std::io::Read;
use std::path::Path;

fn read_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read task from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(source).with_context(|| format!("read {}", source))
}

/// Build the envelope from either one envelope file or an input file plus a config file.
pub(crate) fn load_task(input: &str, config: Option<&Path>) -> Result<TaskEnvelope> {
    let raw = read_source(input)?;
    match config {
        None => serde_json::from_str(&raw)
            .with_context(|| format!("parse task envelope {}", input)),
        Some(path) => {
            let input: TaskInput =
                serde_json::from_str(&raw).with_context(|| format!("parse task input {}", input))?;
            let cfg_raw = std::fs::read_to_string(path)
                .with_context(|| format!("read {}", path.display()))?;
            let config: TaskConfig = serde_json::from_str(&cfg_raw)
                .with_context(|| format!("parse task config {}", path.display()))?;
            Ok(TaskEnvelope { input, config })
        }
    }
}

pub fn run_process(cfg: &SidecarConfig, input: &str, config: Option<&Path>) -> Result<()> {
    let task = load_task(input, config)?;
    let workspace = Workspace::from_config(cfg)?;
    let keys = run_task(workspace, &task)?;
    println!("{}", serde_json::to_string_pretty(&keys)?);
    Ok(())
}
