//! Command-line interface module.
//!
//! This module handles:
//! - Argument parsing via clap
//! - Writing decoded records (JSON Lines or text)
//! - Closing the capture on SIGINT/SIGTERM

mod args;
mod output;
mod signal;

pub use args::Args;
pub use output::{OutputFormat, RecordWriter};
pub use signal::close_on_signal;
