//! Checksum command: compute MD5 or SHA-256 of a file.

use anyhow::Result;
use sidecar_core::checksum;
use std::path::Path;

use crate::cli::Algorithm;

/// Compute and print the digest of the given file.
pub fn run_checksum(path: &Path, algorithm: Algorithm) -> Result<()> {
    let digest = match algorithm {
        Algorithm::Md5 => checksum::md5_path(path)?,
        Algorithm::Sha256 => checksum::sha256_path(path)?,
    };
    println!("{}  {}", digest, path.display());
    Ok(())
}
