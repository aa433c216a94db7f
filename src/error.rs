//! Error types.
//!
//! Reading a topology either succeeds or fails with a [ConfigReadError]. Reconciliation never
//! stops at the first problem: each failure becomes a [ReconcileError], and a run that collected
//! any of them ends with an [AggregateError] carrying all of them.

use crate::core::ResourceKind;
use crate::reconcile::{Mode, Summary};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The topology could not be read. Nothing has been sent to the broker.
#[derive(Debug, Error)]
pub enum ConfigReadError {
    #[error("failed reading configuration from {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed parsing configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid destination_type {value:?} in bindings for {key}, must be one of: {expected}")]
    InvalidDestinationType {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("invalid binding in bindings for {key}: {reason}")]
    InvalidBinding { key: String, reason: String },
}

/// Talking to the broker failed, or the broker was asked to do something it cannot.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid broker URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed building HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("{method} {path} failed: {source}")]
    Transport {
        method: String,
        path: String,
        source: reqwest::Error,
    },

    #[error("{method} {path} returned HTTP status {status}, expected {expected}")]
    Status {
        method: String,
        path: String,
        status: u16,
        expected: &'static str,
    },

    #[error("failed decoding {what} response: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("{kind} {name} missing required field: {field}")]
    MissingField {
        kind: ResourceKind,
        name: String,
        field: &'static str,
    },
}

/// Whether a failed gateway call was reading state or changing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    Create,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Fetch => f.write_str("fetch"),
            Operation::Create => f.write_str("create"),
        }
    }
}

/// A problem with one resource, or with fetching one kind of resource.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A scoped key is not of the form `name@vhost`. The resource was skipped.
    #[error("invalid {kind} key {key:?}, should be {}", .kind.key_form())]
    KeyGrammar { kind: ResourceKind, key: String },

    /// The resource exists, but not the way the topology describes it. Nothing was changed.
    #[error("{kind} '{name}' exists but with wrong configuration: {existing}, expected: {desired}")]
    Mismatch {
        kind: ResourceKind,
        name: String,
        existing: String,
        desired: String,
    },

    /// Fetching or creating one resource failed.
    #[error("failed to {operation} {kind} '{name}': {source}")]
    Gateway {
        operation: Operation,
        kind: ResourceKind,
        name: String,
        source: GatewayError,
    },

    /// Listing the existing resources of a whole kind failed, so none of that kind were
    /// processed.
    #[error("failed to fetch existing {kind} resources: {source}")]
    Snapshot {
        kind: ResourceKind,
        source: GatewayError,
    },
}

/// Every [ReconcileError] found during one run, along with what the run did get done.
#[derive(Debug, Error)]
#[error("encountered {} errors while {mode}", .errors.len())]
pub struct AggregateError {
    pub mode: Mode,
    pub errors: Vec<ReconcileError>,
    pub summary: Summary,
}
