//! Object storage behind `s3://bucket/key` locators.
//!
//! The activity only needs two operations: pull an object into a local file
//! and push a local file to a key. `S3Store` talks to S3 (or any compatible
//! endpoint); `MirrorStore` lays buckets out under a local directory.

mod mirror;
mod s3;

pub use mirror::MirrorStore;
pub use s3::S3Store;

use crate::config::{SidecarConfig, StorageBackend};
use crate::locator::Locator;
use anyhow::{Context, Result};
use std::path::Path;

pub trait ObjectStore {
    /// Download `bucket/key` to `dest`; returns the number of bytes written.
    fn get_to_file(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64>;

    /// Upload the file at `src` to `bucket/key`, replacing any existing object.
    fn put_from_file(&self, src: &Path, bucket: &str, key: &str) -> Result<()>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for Box<T> {
    fn get_to_file(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64> {
        (**self).get_to_file(bucket, key, dest)
    }

    fn put_from_file(&self, src: &Path, bucket: &str, key: &str) -> Result<()> {
        (**self).put_from_file(src, bucket, key)
    }
}

/// Upload `src` to a full `s3://bucket/key` remote key.
pub fn upload<S: ObjectStore + ?Sized>(store: &S, src: &Path, remote_key: &str) -> Result<()> {
    let (bucket, key) = Locator::parse_s3(remote_key)?;
    store
        .put_from_file(src, &bucket, &key)
        .with_context(|| format!("upload {} to {}", src.display(), remote_key))?;
    tracing::debug!(src = %src.display(), key = remote_key, "uploaded");
    Ok(())
}

/// Build the store selected by `cfg.backend`.
pub fn open_store(cfg: &SidecarConfig) -> Result<Box<dyn ObjectStore>> {
    match cfg.backend {
        StorageBackend::S3 => Ok(Box::new(S3Store::connect(&cfg.s3)?)),
        StorageBackend::Mirror => Ok(Box::new(MirrorStore::new(cfg.resolved_mirror_root()?))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_rejects_non_s3_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = MirrorStore::new(dir.path());
        let src = dir.path().join("a.hdf.md5");
        std::fs::write(&src, "abc").unwrap();
        assert!(upload(&store, &src, "https://example.com/a.hdf.md5").is_err());
    }

    #[test]
    fn upload_through_boxed_store() {
        let dir = tempfile::tempdir().unwrap();
        let store: Box<dyn ObjectStore> = Box::new(MirrorStore::new(dir.path().join("root")));
        let src = dir.path().join("a.hdf.md5");
        std::fs::write(&src, "abc").unwrap();
        upload(&store, &src, "s3://bucket/staging/a.hdf.md5").unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("root/bucket/staging/a.hdf.md5")).unwrap(),
            "abc"
        );
    }

    #[test]
    fn open_store_mirror_requires_root() {
        let mut cfg = SidecarConfig::default();
        cfg.backend = StorageBackend::Mirror;
        assert!(open_store(&cfg).is_err());
        cfg.mirror_root = Some(std::env::temp_dir());
        assert!(open_store(&cfg).is_ok());
    }
}
