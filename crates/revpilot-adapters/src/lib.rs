//! Platform adapters for RevenuePilot: configuration and the authenticated
//! HTTP transport the polling engine talks through.

pub mod config;
pub mod http;
