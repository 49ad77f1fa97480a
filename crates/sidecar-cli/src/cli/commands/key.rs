//! `sidecar key` – print the staging key for a data file's sidecar.

use sidecar_core::checksum::sidecar_path;
use sidecar_core::granule::Collection;
use sidecar_core::locator::staging_key;
use std::path::Path;

pub fn run_key(bucket: &str, stack: &str, name: &str, version: &str, file: &Path) {
    let collection = Collection {
        name: name.to_string(),
        version: version.to_string(),
    };
    println!("{}", staging_key(bucket, stack, &collection, &sidecar_path(file)));
}
