//! Command handlers: bridge CLI args -> core operations -> output formatting.
//!
//! `config` runs without a Dashboard connection; every other handler builds
//! its own `DashboardController` from the resolved profile.

pub mod config_cmd;
pub mod prep;
pub mod report;
pub mod sites;
pub mod sync;
pub mod util;
