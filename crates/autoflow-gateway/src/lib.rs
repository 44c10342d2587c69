//! Autoflow Gateway - HTTP access to the workflow engine
//!
//! Executions are started by POSTing to the webhook proxy
//! (`{webhook_server}/api/webhooks/{kind}`); lookups, listings and
//! cancellation go to the engine REST API under `/api/v1`.

#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod wire;

pub use client::{WebhookGateway, PAYLOAD_SOURCE};
pub use config::GatewayConfig;
