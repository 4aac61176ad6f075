// sitesync-api: Async Rust client for the Meraki Dashboard API

mod auth;
pub mod dashboard;
pub mod error;
pub mod transport;

pub use dashboard::DashboardClient;
pub use dashboard::models;
pub use error::Error;
pub use transport::{RetryPolicy, TlsMode, TransportConfig};
