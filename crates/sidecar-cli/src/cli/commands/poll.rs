//! `sidecar poll` – run the local activity loop over a queue directory.

use anyhow::Result;
use sidecar_core::activity::{ActivityLoop, DirQueue};
use sidecar_core::config::SidecarConfig;
use sidecar_core::granule::TaskEnvelope;
use sidecar_core::process::{run_task, Workspace};
use std::path::Path;

pub fn run_poll(cfg: &SidecarConfig, queue: &Path, max_tasks: Option<usize>) -> Result<()> {
    let mut workspace = Workspace::from_config(cfg)?;
    let handler = |task: &TaskEnvelope| run_task(&mut workspace, task);
    let mut activity = ActivityLoop::new(DirQueue::new(queue), cfg.poll_interval(), handler);
    if let Some(max) = max_tasks {
        activity = activity.with_max_tasks(max);
    }
    let handled = activity.run()?;
    println!("handled {} task(s)", handled);
    Ok(())
}
