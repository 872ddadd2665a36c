//! End-to-end test harness for the native media worker: launch it with a
//! derived command line, wait for readiness over HTTP, pull runtime
//! statistics, and tear it down safely even under failure.

pub mod config;
pub mod diagnostics;
pub mod display;
pub mod resolver;
pub mod stats;
pub mod supervisor;
