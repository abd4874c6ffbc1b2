//! Application Layer
//!
//! Ports to the outside world, the services that orchestrate broker calls,
//! and the use cases behind each signal entry point.

pub mod context;
pub mod dto;
pub mod ports;
pub mod services;
pub mod use_cases;

pub use context::{EngineContext, ExecutionPolicy, ProductBrokers};
