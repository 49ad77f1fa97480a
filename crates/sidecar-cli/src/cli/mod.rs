//! CLI for the sidecar granule checksum activity.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use sidecar_core::config::{self, SidecarConfig};
use std::path::PathBuf;

use commands::{run_checksum, run_key, run_poll, run_process};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sidecar")]
#[command(
    about = "sidecar: checksum granule data files and stage .md5 sidecars",
    long_about = None
)]
pub struct Cli {
    /// Settings file (default: ~/.config/sidecar/config.toml, created if missing).
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Log file (default: ~/.local/state/sidecar/sidecar.log).
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Digest algorithm for the `checksum` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    Md5,
    Sha256,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the checksum activity on one task and print the output list as JSON.
    Process {
        /// Task JSON: a full envelope `{"input", "config"}`, or just the input when --config is given. `-` reads stdin.
        input: String,

        /// Task config JSON (collection, buckets, stack).
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Poll a queue directory for task files and process them.
    Poll {
        /// Queue directory holding `<name>.json` task envelopes.
        #[arg(long, value_name = "DIR")]
        queue: PathBuf,

        /// Exit after handling this many tasks.
        #[arg(long, value_name = "N")]
        max_tasks: Option<usize>,
    },

    /// Compute the digest of a file.
    Checksum {
        /// Path to the file.
        path: PathBuf,

        #[arg(long, value_enum, default_value_t = Algorithm::Md5)]
        algorithm: Algorithm,
    },

    /// Print the staging key a data file's sidecar would be uploaded to.
    Key {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        stack: String,
        #[arg(long)]
        collection_name: String,
        #[arg(long)]
        collection_version: String,
        /// Local data file (e.g. modis.hdf).
        file: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    fn load_settings(&self) -> Result<SidecarConfig> {
        let cfg = match &self.settings {
            Some(path) => config::load_from(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded settings: {:?}", cfg);
        Ok(cfg)
    }

    pub fn run(self) -> Result<()> {
        match &self.command {
            CliCommand::Process { input, config } => {
                let cfg = self.load_settings()?;
                run_process(&cfg, input, config.as_deref())?;
            }
            CliCommand::Poll { queue, max_tasks } => {
                let cfg = self.load_settings()?;
                run_poll(&cfg, queue, *max_tasks)?;
            }
            CliCommand::Checksum { path, algorithm } => run_checksum(path, *algorithm)?,
            CliCommand::Key {
                bucket,
                stack,
                collection_name,
                collection_version,
                file,
            } => run_key(bucket, stack, collection_name, collection_version, file),
        }

        Ok(())
    }
}
