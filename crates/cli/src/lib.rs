//! `gputop-wrapper`: stream GPU performance counters from a gputop server.
//!
//! The binary is a thin shell over [`app::run_wrapper`]; everything else is
//! exposed so sessions can be driven from tests with in-memory writers.

pub mod app;
pub mod child;
pub mod cli;
pub mod columns;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod report;
pub mod session;
pub mod sink;
