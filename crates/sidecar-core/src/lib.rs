pub mod config;
pub mod logging;

pub mod activity;
pub mod checksum;
pub mod fetch;
pub mod granule;
pub mod locator;
pub mod process;
pub mod store;
pub mod temp_file;
