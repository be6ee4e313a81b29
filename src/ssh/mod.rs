//! Pure Rust SSH transport for batch runs.
//!
//! ## Modules
//!
//! - [`client`] - Connection setup and password authentication
//! - [`config`] - Host key policy and connection settings
//! - [`session`] - One command per session channel

mod client;
pub mod config;
mod session;

pub use client::SshConnector;
pub use config::{HostKeyPolicy, SshConfig};
