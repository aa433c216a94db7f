//! Creates whatever is missing.

use super::{
    binding_name, compare, compare_user, find_binding, Change, Presence, ResourceAction,
};
use crate::auth::Credentials;
use crate::core::{Binding, Exchange, Permissions, Queue, ResourceKind, ScopedName, User, VHost};
use crate::error::{GatewayError, Operation, ReconcileError};
use crate::gateway::Broker;
use indexmap::IndexMap;
use std::fmt::Display;
use tracing::info;

/// The [ResourceAction] behind applying a topology: missing resources are created through the
/// broker.
#[derive(Debug)]
pub struct EnsurePresent<'b, B: Broker + ?Sized> {
    broker: &'b B,
}

impl<'b, B: Broker + ?Sized> EnsurePresent<'b, B> {
    pub fn new(broker: &'b B) -> Self {
        EnsurePresent { broker }
    }
}

/// Runs `create` if the resource is missing.
fn ensure_present(
    presence: Presence,
    kind: ResourceKind,
    name: impl Display,
    create: impl FnOnce() -> Result<(), GatewayError>,
) -> Result<Change, ReconcileError> {
    match presence {
        Presence::Matching => {
            info!("{kind} {name} is up to date");
            Ok(Change::Unchanged)
        }
        Presence::Missing => {
            info!("Creating {kind} {name}");
            create().map_err(|source| ReconcileError::Gateway {
                operation: Operation::Create,
                kind,
                name: name.to_string(),
                source,
            })?;
            Ok(Change::Created)
        }
    }
}

impl<'b, B: Broker + ?Sized> ResourceAction for EnsurePresent<'b, B> {
    fn vhost(
        &mut self,
        name: &str,
        desired: &VHost,
        existing: &IndexMap<String, VHost>,
    ) -> Result<Change, ReconcileError> {
        let presence = compare(ResourceKind::VHost, name, desired, existing.get(name))?;
        let broker = self.broker;
        ensure_present(presence, ResourceKind::VHost, name, || {
            broker.create_vhost(name, desired)
        })
    }

    fn user(
        &mut self,
        name: &str,
        desired: &User,
        existing: &IndexMap<String, User>,
    ) -> Result<Change, ReconcileError> {
        let presence = compare_user(name, desired, existing.get(name))?;
        let broker = self.broker;
        ensure_present(presence, ResourceKind::User, name, || {
            broker.create_user(name, desired)
        })
    }

    fn permissions(
        &mut self,
        name: &ScopedName,
        desired: &Permissions,
        existing: &IndexMap<ScopedName, Permissions>,
    ) -> Result<Change, ReconcileError> {
        let presence = compare(ResourceKind::Permissions, name, desired, existing.get(name))?;
        let broker = self.broker;
        ensure_present(presence, ResourceKind::Permissions, name, || {
            broker.create_permissions(name, desired)
        })
    }

    fn exchange(
        &mut self,
        name: &ScopedName,
        desired: &Exchange,
        existing: Option<&Exchange>,
        auth: &Credentials,
    ) -> Result<Change, ReconcileError> {
        let presence = compare(ResourceKind::Exchange, name, desired, existing)?;
        let broker = self.broker;
        ensure_present(presence, ResourceKind::Exchange, name, || {
            broker.create_exchange(name, desired, auth)
        })
    }

    fn queue(
        &mut self,
        name: &ScopedName,
        desired: &Queue,
        existing: Option<&Queue>,
        auth: &Credentials,
    ) -> Result<Change, ReconcileError> {
        let presence = compare(ResourceKind::Queue, name, desired, existing)?;
        let broker = self.broker;
        ensure_present(presence, ResourceKind::Queue, name, || {
            broker.create_queue(name, desired, auth)
        })
    }

    fn binding(
        &mut self,
        source: &ScopedName,
        desired: &Binding,
        existing: &IndexMap<String, Vec<Binding>>,
        auth: &Credentials,
    ) -> Result<Change, ReconcileError> {
        let presence = find_binding(source, desired, existing);
        let broker = self.broker;
        ensure_present(
            presence,
            ResourceKind::Binding,
            binding_name(source, desired),
            || broker.create_binding(source, desired, auth),
        )
    }
}
