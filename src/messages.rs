//! Network messages - communication between a front-end and the network actor

use crate::error::ExecutionError;
use crate::models::{RequestDefinition, Response, VariableMap};

/// Commands sent to the network actor
#[derive(Debug, Clone)]
pub enum NetworkCommand {
    /// Resolve `request` against `variables` and execute it
    Execute {
        id: u64,
        request: RequestDefinition,
        variables: VariableMap,
    },
    /// Cancel a pending request
    Cancel(u64),
    /// Cancel everything and stop the actor
    Shutdown,
}

/// Responses sent back by the network actor
#[derive(Debug, Clone)]
pub enum NetworkResponse {
    /// Execution finished, successfully or not
    Completed {
        id: u64,
        result: Result<Response, ExecutionError>,
    },
    /// Request was cancelled before it finished
    Cancelled { id: u64 },
}

impl NetworkResponse {
    /// Get the request ID from the response
    pub fn id(&self) -> u64 {
        match self {
            NetworkResponse::Completed { id, .. } => *id,
            NetworkResponse::Cancelled { id } => *id,
        }
    }
}
