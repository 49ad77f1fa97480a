//! File checksums and `.md5` sidecar files.
//!
//! Files are hashed in fixed-size chunks so large granules never have to be
//! held in memory.

use anyhow::{Context, Result};
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

const BUF_SIZE: usize = 64 * 1024;

/// Extension appended to a data file's path to name its checksum sidecar.
pub const SIDECAR_EXTENSION: &str = "md5";

fn digest_path<D: Digest>(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = D::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compute MD5 of a file and return the digest as lowercase hex.
pub fn md5_path(path: &Path) -> Result<String> {
    digest_path::<Md5>(path)
}

/// MD5 of an in-memory buffer, lowercase hex.
pub fn md5_bytes(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Compute SHA-256 of a file and return the digest as lowercase hex.
pub fn sha256_path(path: &Path) -> Result<String> {
    digest_path::<Sha256>(path)
}

/// `<path>.md5` (e.g. `modis.hdf` -> `modis.hdf.md5`).
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut o = path.as_os_str().to_owned();
    o.push(".");
    o.push(SIDECAR_EXTENSION);
    PathBuf::from(o)
}

/// Sidecar of `data_path` placed in `dir` (e.g. `/data/modis.hdf` -> `<dir>/modis.hdf.md5`).
pub fn sidecar_path_in(dir: &Path, data_path: &Path) -> Result<PathBuf> {
    let name = data_path
        .file_name()
        .with_context(|| format!("no file name in {}", data_path.display()))?;
    Ok(sidecar_path(&dir.join(name)))
}

/// Write `digest` (and nothing else) to `<dir>/<name>.md5`; returns the sidecar path.
pub fn write_sidecar(dir: &Path, data_path: &Path, digest: &str) -> Result<PathBuf> {
    let sidecar = sidecar_path_in(dir, data_path)?;
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    fs::write(&sidecar, digest.as_bytes())
        .with_context(|| format!("write {}", sidecar.display()))?;
    Ok(sidecar)
}
