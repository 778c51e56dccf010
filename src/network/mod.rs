//! Network layer - HTTP request execution
//!
//! [`HttpEngine`] performs single executions. [`NetworkActor`] runs many of
//! them concurrently for a front-end and lets it cancel by id.

pub mod actor;
pub mod client;

pub use actor::NetworkActor;
pub use client::{create_client, HttpEngine};
