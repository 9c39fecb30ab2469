//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod executor;
pub mod http;
pub mod telemetry;
