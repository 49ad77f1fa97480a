//! Local-directory object store: `s3://bucket/key` <-> `<root>/bucket/key`.

use super::ObjectStore;
use crate::temp_file::PartFile;
use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct MirrorStore {
    root: PathBuf,
}

impl MirrorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for `bucket/key`. Keys that would escape the bucket directory are rejected.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let rel = Path::new(bucket).join(key);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!("refusing object path outside mirror root: {}/{}", bucket, key);
        }
        Ok(self.root.join(rel))
    }
}

impl ObjectStore for MirrorStore {
    fn get_to_file(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64> {
        let src = self.object_path(bucket, key)?;
        let mut input =
            File::open(&src).with_context(|| format!("no object s3://{}/{}", bucket, key))?;
        let mut part = PartFile::create(dest)?;
        let n = io::copy(&mut input, &mut part)
            .with_context(|| format!("copy {} to {}", src.display(), dest.display()))?;
        part.finalize(dest)?;
        Ok(n)
    }

    fn put_from_file(&self, src: &Path, bucket: &str, key: &str) -> Result<()> {
        let dest = self.object_path(bucket, key)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::copy(src, &dest)
            .with_context(|| format!("copy {} to {}", src.display(), dest.display()))?;
        Ok(())
    }
}
