//! Application layer - Use cases and ports
//!
//! Services in this layer orchestrate the domain model through outbound
//! ports. Nothing here touches a concrete store; adapters live in the
//! infrastructure layer.

pub mod ports;
pub mod services;
