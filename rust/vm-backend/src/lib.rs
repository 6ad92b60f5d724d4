//! VM Backend - a fake cloud for exercising VM orchestration clients
//!
//! Simulates the lifecycle of virtual machines behind a small HTTP API,
//! with no hypervisor involved. VMs move through a fixed cycle of states,
//! `Stopped -> Starting -> Running -> Stopping -> Stopped`; the intermediate
//! states advance on their own after a configurable delay.
//!
//! # Architecture
//!
//! - [`vm`]: VM entity, state machine and id-indexed registry
//! - [`manager`]: [`Cloud`], the lock-protected registry owner and delayed
//!   transition scheduler
//! - [`api`]: endpoint table and request dispatcher
//! - [`store`]: JSON file persistence of the VM list
//! - [`config`]: configuration loading and validation
//! - [`server`]: router assembly and middleware
//!
//! # Example
//!
//! ```rust,ignore
//! use vm_backend::{config::AppConfig, server::create_app, Cloud};
//!
//! let app = create_app(&AppConfig::default(), Cloud::seeded());
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod server;
pub mod store;
pub mod vm;

pub use error::{CloudError, CloudResult};
pub use manager::{Cloud, Completion, Delays};
pub use vm::{Vm, VmId, VmState, Vms};

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The single registry every request operates on.
    pub cloud: Cloud,
}
