//! Decides what happens to each desired resource, given what already exists on the broker.
//!
//! [ResourceAction] has one method per resource kind. Both implementations compare the same
//! way and only differ in what they do about a missing resource:
//!
//! - [EnsurePresent] creates it.
//! - [VerifyPresent] reports it and leaves the broker alone.
//!
//! A resource that exists with a different configuration is always an error. Existing resources
//! are never changed.

pub mod ensure;
pub mod verify;

use crate::auth::Credentials;
use crate::core::{Binding, Exchange, Permissions, Queue, ResourceKind, ScopedName, User, VHost};
use crate::error::ReconcileError;
use indexmap::IndexMap;
use std::fmt::{Debug, Display};

#[doc(inline)]
pub use ensure::EnsurePresent;
#[doc(inline)]
pub use verify::VerifyPresent;

/// What a [ResourceAction] did about one resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Change {
    /// The resource already exists as desired.
    Unchanged,

    /// The resource was missing and has been created.
    Created,

    /// The resource is missing and would be created by applying the topology.
    Pending,
}

/// Handles one desired resource at a time.
///
/// Each method receives the resource's identity, its desired configuration, and the part of
/// the broker's existing state that it should be compared with. Methods for exchanges, queues,
/// and bindings also receive the credentials to act with.
pub trait ResourceAction {
    fn vhost(
        &mut self,
        name: &str,
        desired: &VHost,
        existing: &IndexMap<String, VHost>,
    ) -> Result<Change, ReconcileError>;

    fn user(
        &mut self,
        name: &str,
        desired: &User,
        existing: &IndexMap<String, User>,
    ) -> Result<Change, ReconcileError>;

    fn permissions(
        &mut self,
        name: &ScopedName,
        desired: &Permissions,
        existing: &IndexMap<ScopedName, Permissions>,
    ) -> Result<Change, ReconcileError>;

    fn exchange(
        &mut self,
        name: &ScopedName,
        desired: &Exchange,
        existing: Option<&Exchange>,
        auth: &Credentials,
    ) -> Result<Change, ReconcileError>;

    fn queue(
        &mut self,
        name: &ScopedName,
        desired: &Queue,
        existing: Option<&Queue>,
        auth: &Credentials,
    ) -> Result<Change, ReconcileError>;

    /// `existing` holds every binding on the source exchange's vhost, keyed by source exchange
    /// name.
    fn binding(
        &mut self,
        source: &ScopedName,
        desired: &Binding,
        existing: &IndexMap<String, Vec<Binding>>,
        auth: &Credentials,
    ) -> Result<Change, ReconcileError>;
}

/// The outcome of comparing a desired resource with what exists, when they do not conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Presence {
    Missing,
    Matching,
}

/// Compares a desired resource with its existing counterpart, if any.
///
/// Fails with [ReconcileError::Mismatch] if both exist and differ in any way.
pub(crate) fn compare<T: PartialEq + Debug>(
    kind: ResourceKind,
    name: impl Display,
    desired: &T,
    existing: Option<&T>,
) -> Result<Presence, ReconcileError> {
    match existing {
        None => Ok(Presence::Missing),
        Some(existing) if existing == desired => Ok(Presence::Matching),
        Some(existing) => Err(ReconcileError::Mismatch {
            kind,
            name: name.to_string(),
            existing: format!("{existing:?}"),
            desired: format!("{desired:?}"),
        }),
    }
}

/// Compares users. The broker never reveals passwords, so only the admin flag counts.
pub(crate) fn compare_user(
    name: &str,
    desired: &User,
    existing: Option<&User>,
) -> Result<Presence, ReconcileError> {
    let existing = existing.map(|existing| User {
        password: desired.password.clone(),
        admin: existing.admin,
    });
    compare(ResourceKind::User, name, desired, existing.as_ref())
}

/// A binding is present if an equal binding exists anywhere on its source exchange.
pub(crate) fn find_binding(
    source: &ScopedName,
    desired: &Binding,
    existing: &IndexMap<String, Vec<Binding>>,
) -> Presence {
    let found = existing
        .get(&source.name)
        .is_some_and(|bindings| bindings.contains(desired));
    if found {
        Presence::Matching
    } else {
        Presence::Missing
    }
}

/// Names a binding for logs and reports, e.g. `ex@input -> q`.
pub fn binding_name(source: &ScopedName, binding: &Binding) -> String {
    match (&binding.destination, binding.destination_type) {
        (Some(destination), Some(destination_type)) => {
            format!("{source} -> {destination_type} {destination}")
        }
        (Some(destination), None) => format!("{source} -> {destination}"),
        (None, _) => format!("{source} -> ?"),
    }
}
