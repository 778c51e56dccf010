//! # Freeman Core
//!
//! Headless request-execution core of the Freeman API testing tool. The
//! terminal UI and CLI sit on top of this crate and hand it fully formed
//! values.
//!
//! ## Features
//! - HTTP methods: GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS
//! - Headers and query parameters with per-row enable toggles
//! - Raw (JSON/XML/text/HTML) and form-urlencoded bodies
//! - Auth support (Bearer, Basic)
//! - `{{variable}}` interpolation from environments
//! - Collections with nested folders
//! - YAML file storage for collections and environments
//! - Request history
//! - cURL import/export
//!
//! ## Architecture
//! - Models - plain data with serde support
//! - Interpolate - placeholder substitution, borrow-first
//! - Network - [`HttpEngine`] over one shared `reqwest::Client`, plus an
//!   actor for concurrent, cancellable executions
//! - Storage - one file per collection, one for environments

pub mod config;
pub mod constants;
pub mod curl;
pub mod error;
pub mod interpolate;
pub mod logging;
pub mod messages;
pub mod models;
pub mod network;
pub mod storage;

// Re-export commonly used types
pub use config::{CoreConfig, EngineConfig};
pub use curl::{parse_curl, to_curl};
pub use error::{ClientInitError, CollectionError, ExecutionError, StoreError, TransportKind};
pub use interpolate::{interpolate, resolve};
pub use messages::{NetworkCommand, NetworkResponse};
pub use models::{
    AuthType, Body, Collection, CollectionItem, Environment, Folder, Header, History, HttpMethod,
    KeyValue, QueryParam, RawContentType, RequestDefinition, Response, Variable, VariableMap,
};
pub use network::{HttpEngine, NetworkActor};
pub use storage::{LoadFailure, LoadOutcome, Storage};
