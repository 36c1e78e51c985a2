//! netcopy server library: listener, per-connection sessions, daemon glue.

pub mod cli;
pub mod daemon;
pub mod listener;
pub mod session;

pub use cli::Cli;
pub use listener::Server;
