//! The checksum activity.
//!
//! For every `"data"` file of every granule, fetch it, write `<file>.md5`
//! into the sidecar directory, upload it under the collection's staging
//! prefix, and return the sidecar keys followed by all original filenames.
//! All I/O goes through [`Capabilities`] so the pipeline can run against
//! fakes in tests.

use crate::checksum;
use crate::config::SidecarConfig;
use crate::fetch::{Fetcher, InputKeys, HDF_KEY};
use crate::granule::{TaskConfig, TaskEnvelope, TaskInput};
use crate::locator::staging_key;
use crate::store::{self, ObjectStore};
use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// I/O the activity depends on.
pub trait Capabilities {
    /// Resolve the files matching input key `key` to local paths, in order.
    fn fetch(&mut self, key: &str, files: &[String]) -> Result<Vec<PathBuf>>;

    /// Directory the sidecar of the fetched file `local` is written to.
    fn sidecar_dir(&mut self, local: &Path) -> Result<PathBuf>;

    /// Upload a local artifact to a full `s3://bucket/key` remote key.
    fn upload(&mut self, local: &Path, remote_key: &str) -> Result<()>;

    /// Remove intermediate outputs once the run has finished, successfully or not.
    fn cleanup(&mut self, outputs: &[PathBuf]);
}

impl<C: Capabilities + ?Sized> Capabilities for &mut C {
    fn fetch(&mut self, key: &str, files: &[String]) -> Result<Vec<PathBuf>> {
        (**self).fetch(key, files)
    }

    fn sidecar_dir(&mut self, local: &Path) -> Result<PathBuf> {
        (**self).sidecar_dir(local)
    }

    fn upload(&mut self, local: &Path, remote_key: &str) -> Result<()> {
        (**self).upload(local, remote_key)
    }

    fn cleanup(&mut self, outputs: &[PathBuf]) {
        (**self).cleanup(outputs)
    }
}

pub struct ChecksumProcess<C> {
    caps: C,
}

impl<C: Capabilities> ChecksumProcess<C> {
    pub fn new(caps: C) -> Self {
        Self { caps }
    }

    pub fn capabilities(&self) -> &C {
        &self.caps
    }

    pub fn into_capabilities(self) -> C {
        self.caps
    }

    /// Run the activity on `input`. Any failure aborts the whole batch; the
    /// sidecars written so far are still handed to cleanup.
    pub fn process(&mut self, input: &TaskInput, config: &TaskConfig) -> Result<Vec<String>> {
        // Work on a copy; the caller's payload is never modified.
        let granules = input.clone();
        let original_file_names = granules.original_filenames();

        let mut sidecars = Vec::new();
        let result = self.add_ancillary_files(&granules, config, &mut sidecars);
        if let Err(e) = &result {
            tracing::warn!(written = sidecars.len(), "batch failed: {:#}", e);
        }
        self.caps.cleanup(&sidecars);

        let mut keys = result?;
        keys.extend(original_file_names);
        Ok(keys)
    }

    fn add_ancillary_files(
        &mut self,
        granules: &TaskInput,
        config: &TaskConfig,
        sidecars: &mut Vec<PathBuf>,
    ) -> Result<Vec<String>> {
        let data_files = granules.data_filenames();
        let local_files = self.caps.fetch(HDF_KEY, &data_files)?;
        tracing::info!(
            granules = granules.granules.len(),
            data_files = data_files.len(),
            fetched = local_files.len(),
            collection = %config.collection.id(),
            "processing granules"
        );

        let mut keys = Vec::with_capacity(local_files.len());
        for local in &local_files {
            keys.push(self.add_ancillary_file(local, config, sidecars)?);
        }
        Ok(keys)
    }

    /// Checksum `local_file`, write its sidecar, upload it; returns the remote key.
    fn add_ancillary_file(
        &mut self,
        local_file: &Path,
        config: &TaskConfig,
        sidecars: &mut Vec<PathBuf>,
    ) -> Result<String> {
        let dir = self.caps.sidecar_dir(local_file)?;
        let target = checksum::sidecar_path_in(&dir, local_file)?;
        if sidecars.contains(&target) {
            bail!(
                "{} shares its file name with an earlier input; sidecar {} would be overwritten",
                local_file.display(),
                target.display()
            );
        }
        let digest = checksum::md5_path(local_file)?;
        let sidecar = checksum::write_sidecar(&dir, local_file, &digest)?;
        sidecars.push(sidecar.clone());

        let key = staging_key(
            &config.buckets.internal.name,
            &config.stack,
            &config.collection,
            &sidecar,
        );
        self.caps.upload(&sidecar, &key)?;
        tracing::debug!(
            file = %local_file.display(),
            md5 = %digest,
            key = %key,
            "sidecar uploaded"
        );
        Ok(key)
    }
}

/// Production capabilities: a [`Fetcher`] for inputs and an [`ObjectStore`] for uploads.
pub struct Workspace<S> {
    fetcher: Fetcher,
    store: S,
    keep_downloads: bool,
}

impl<S: ObjectStore> Workspace<S> {
    pub fn new(fetcher: Fetcher, store: S, keep_downloads: bool) -> Self {
        Self {
            fetcher,
            store,
            keep_downloads,
        }
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl Workspace<Box<dyn ObjectStore>> {
    /// Workspace with the work dir, input keys, and store described by `cfg`.
    pub fn from_config(cfg: &SidecarConfig) -> Result<Self> {
        let keys = InputKeys::with_overrides(&cfg.input_keys)?;
        let fetcher = Fetcher::new(cfg.resolved_work_dir()?, cfg.http.clone(), keys);
        let store = store::open_store(cfg)?;
        Ok(Self::new(fetcher, store, cfg.keep_downloads))
    }
}

impl<S: ObjectStore> Capabilities for Workspace<S> {
    fn fetch(&mut self, key: &str, files: &[String]) -> Result<Vec<PathBuf>> {
        self.fetcher.fetch(&self.store, key, files)
    }

    /// The work directory; a caller's input directories are never written to.
    fn sidecar_dir(&mut self, _local: &Path) -> Result<PathBuf> {
        Ok(self.fetcher.work_dir().to_path_buf())
    }

    fn upload(&mut self, local: &Path, remote_key: &str) -> Result<()> {
        store::upload(&self.store, local, remote_key)
    }

    fn cleanup(&mut self, outputs: &[PathBuf]) {
        let downloads: &[PathBuf] = if self.keep_downloads {
            &[]
        } else {
            self.fetcher.downloaded()
        };
        for path in outputs.iter().chain(downloads) {
            match fs::remove_file(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed"),
                Err(e) => tracing::warn!(path = %path.display(), "cleanup failed: {}", e),
            }
        }
        if !self.keep_downloads {
            self.fetcher.clear_downloaded();
        }
    }
}

/// Run one task envelope against `caps`.
pub fn run_task<C: Capabilities>(caps: C, task: &TaskEnvelope) -> Result<Vec<String>> {
    ChecksumProcess::new(caps).process(&task.input, &task.config)
}
