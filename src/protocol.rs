//! Wire contracts for the two background executors.
//!
//! Requests carry a correlation token: the request version formatted as an
//! opaque string. The executors echo nothing back themselves; the executor
//! loop pairs each response with the token of the request it answered, and
//! the coordinator discards responses whose token is no longer current.

use serde::{Deserialize, Serialize};

use crate::document::ResultDocument;
use crate::snapshot::{GenerationOptions, Injection};

/// Request to the primary generation executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrimaryRequest {
    /// Run the configuration and produce a result document.
    #[serde(rename_all = "camelCase")]
    Generate {
        /// Possibly-stripped configuration text.
        snapshot: String,
        /// Ordered `[kind, name, code]` triples.
        injections: Vec<Injection>,
        options: GenerationOptions,
        correlation_token: String,
    },
}

/// Response from the primary generation executor. Exactly one per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrimaryResponse {
    /// Generation succeeded, possibly with warnings to surface.
    #[serde(rename_all = "camelCase")]
    Success {
        result_document: ResultDocument,
        #[serde(default)]
        warnings: Vec<String>,
    },
    /// The computation rejected the snapshot.
    Error { message: String },
}

/// Request to the secondary mesh-conversion executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecondaryRequest {
    /// Convert every pending solid-geometry script in the document.
    #[serde(rename_all = "camelCase")]
    ConvertBatch {
        result_document_snapshot: ResultDocument,
        correlation_token: String,
    },
}

/// Response from the secondary mesh-conversion executor.
///
/// Per-entry failures are reported inside the document (`MeshState::Failed`);
/// a partial success is still a top-level `Success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecondaryResponse {
    #[serde(rename_all = "camelCase")]
    Success { result_document: ResultDocument },
    Error { message: String },
}
