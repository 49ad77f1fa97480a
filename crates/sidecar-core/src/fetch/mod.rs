//! Resolving granule locators to local files.
//!
//! Local paths are used in place. `http(s)://` locators are downloaded with
//! libcurl and `s3://` locators through the object store, both into the work
//! directory. The fetcher remembers what it downloaded so cleanup can remove
//! exactly those files and never a caller-owned input.

mod http;
mod keys;

pub use http::download;
pub use keys::{InputKeys, DEFAULT_INPUT_KEYS, HDF_KEY};

use crate::config::HttpConfig;
use crate::locator::Locator;
use crate::store::ObjectStore;
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Fetcher {
    work_dir: PathBuf,
    http: HttpConfig,
    keys: InputKeys,
    downloaded: Vec<PathBuf>,
}

impl Fetcher {
    pub fn new(work_dir: impl Into<PathBuf>, http: HttpConfig, keys: InputKeys) -> Self {
        Self {
            work_dir: work_dir.into(),
            http,
            keys,
            downloaded: Vec::new(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn keys(&self) -> &InputKeys {
        &self.keys
    }

    /// Paths this fetcher created in the work directory, in download order.
    pub fn downloaded(&self) -> &[PathBuf] {
        &self.downloaded
    }

    /// Forget downloaded paths (after they have been cleaned up).
    pub fn clear_downloaded(&mut self) {
        self.downloaded.clear();
    }

    /// Select `files` by input key and resolve each match to a local path, preserving order.
    pub fn fetch<S: ObjectStore + ?Sized>(
        &mut self,
        store: &S,
        key: &str,
        files: &[String],
    ) -> Result<Vec<PathBuf>> {
        let selected = self.keys.select(key, files)?;
        tracing::debug!(
            key,
            selected = selected.len(),
            total = files.len(),
            "fetching inputs"
        );
        let mut dests = HashSet::new();
        let mut local = Vec::with_capacity(selected.len());
        for raw in selected {
            let locator = Locator::parse(raw)?;
            if locator.is_remote() {
                let dest = self.work_dir.join(locator.file_name());
                if !dests.insert(dest.clone()) {
                    bail!(
                        "{} downloads to {}, already used by an earlier input",
                        raw,
                        dest.display()
                    );
                }
            }
            local.push(self.resolve_parsed(store, raw, &locator)?);
        }
        Ok(local)
    }

    /// Resolve one locator to a readable local path, downloading it if remote.
    pub fn resolve<S: ObjectStore + ?Sized>(&mut self, store: &S, raw: &str) -> Result<PathBuf> {
        let locator = Locator::parse(raw)?;
        self.resolve_parsed(store, raw, &locator)
    }

    fn resolve_parsed<S: ObjectStore + ?Sized>(
        &mut self,
        store: &S,
        raw: &str,
        locator: &Locator,
    ) -> Result<PathBuf> {
        let (dest, bytes) = match locator {
            Locator::Local(path) => return Ok(path.clone()),
            Locator::Http(url) => {
                let dest = self.download_dest(locator)?;
                let n = download(url, &dest, &self.http)?;
                (dest, n)
            }
            Locator::S3 { bucket, key } => {
                let dest = self.download_dest(locator)?;
                let n = store
                    .get_to_file(bucket, key, &dest)
                    .with_context(|| format!("fetch {}", locator))?;
                (dest, n)
            }
        };
        tracing::info!(src = raw, dest = %dest.display(), bytes, "fetched input");
        self.downloaded.push(dest.clone());
        Ok(dest)
    }

    fn download_dest(&self, locator: &Locator) -> Result<PathBuf> {
        fs::create_dir_all(&self.work_dir)
            .with_context(|| format!("create work dir {}", self.work_dir.display()))?;
        Ok(self.work_dir.join(locator.file_name()))
    }
}
