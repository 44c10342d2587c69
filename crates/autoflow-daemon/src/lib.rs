//! Autoflow daemon library
//!
//! This module provides the core components for the autoflow daemon:
//! - REST API handlers
//! - Configuration loading
//! - Retention sweeping
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod error;
pub mod retention;
pub mod server;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError, DaemonResult};
pub use retention::RetentionSweeper;
pub use server::Server;
