//! netcopy client library: CLI parsing, the transfer engine, and progress
//! reporting.

pub mod cli;
pub mod progress;
pub mod transfer;

pub use cli::{Cli, Destination};
pub use transfer::{TransferEngine, TransferOptions, TransferStats};
