//! Generation pipeline orchestrator for keyboard artifact previews.
//!
//! Turns raw configuration edits into a versioned, eventually-consistent set
//! of generated artifacts by coordinating two independent background
//! computations: a primary generation step that executes the configuration,
//! and a secondary step that converts solid-geometry scripts into meshes.
//!
//! # Architecture
//!
//! - **Coordinator**: single actor owning the request version and the store;
//!   debounces edit-driven requests and drives the two-stage sequence
//! - **Executors**: trait seams behind message channels, one logical request
//!   in flight each; results are version-gated, never ordered
//! - **Store**: latest accepted result document plus busy/error/warning
//!   state and a change-notification counter
//! - **Protocol**: the JSON message contracts both executors speak
//!
//! Rapid edits coalesce into one dispatch; a stale response (one whose
//! version is no longer current when it arrives) is discarded without
//! touching state, so slow conversions can never clobber newer results.

pub mod coordinator;
pub mod document;
pub mod error;
pub mod executor;
pub mod injections;
pub mod protocol;
pub mod snapshot;
pub mod store;

pub use coordinator::{
    DEBOUNCE_QUIET_PERIOD, Pipeline, PipelineConfig, PipelineHandle, RequestArgs,
};
pub use document::{CasePayload, MeshData, MeshState, ResultDocument};
pub use error::{PipelineError, Result};
pub use executor::{PrimaryExecutor, SecondaryExecutor};
pub use injections::{InjectionStore, MemoryInjectionStore};
pub use protocol::{PrimaryRequest, PrimaryResponse, SecondaryRequest, SecondaryResponse};
pub use snapshot::{ConfigSnapshot, GenerationOptions, Injection};
pub use store::{PipelineEvent, ResultStore};
