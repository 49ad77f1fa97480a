//! CLI command handlers, one file per command.

mod checksum;
mod key;
mod poll;
mod process;

pub use checksum::run_checksum;
pub use key::run_key;
pub use poll::run_poll;
pub use process::run_process;
