//! Domain model - requests, responses, environments and collections

pub mod collection;
pub mod environment;
pub mod history;
pub mod request;
pub mod response;

pub use collection::{Collection, CollectionItem, Folder};
pub use environment::{Environment, Variable, VariableMap};
pub use history::{History, HistoryEntry};
pub use request::{
    AuthType, Body, Header, HttpMethod, KeyValue, QueryParam, RawContentType, RequestDefinition,
};
pub use response::Response;

/// Opaque request identifier
pub type RequestId = String;

/// Opaque folder identifier
pub type FolderId = String;

/// Opaque collection identifier, also the persisted file stem
pub type CollectionId = String;

/// Generate a fresh opaque identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
