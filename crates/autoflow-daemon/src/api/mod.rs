//! API layer for autoflow-daemon

pub mod rest;

pub use rest::create_router;
