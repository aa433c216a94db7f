//! Reports what is missing without touching the broker.

use super::{
    binding_name, compare, compare_user, find_binding, Change, Presence, ResourceAction,
};
use crate::auth::Credentials;
use crate::core::{Binding, Exchange, Permissions, Queue, ResourceKind, ScopedName, User, VHost};
use crate::error::ReconcileError;
use indexmap::IndexMap;
use std::fmt::Display;
use tracing::{info, warn};

/// The [ResourceAction] behind verifying a topology. Never calls the broker.
#[derive(Clone, Copy, Debug, Default)]
pub struct VerifyPresent;

fn verify_present(presence: Presence, kind: ResourceKind, name: impl Display) -> Change {
    match presence {
        Presence::Matching => {
            info!("{kind} {name} is present and up to date");
            Change::Unchanged
        }
        Presence::Missing => {
            warn!("{kind} {name} is missing, will be created on apply");
            Change::Pending
        }
    }
}

impl ResourceAction for VerifyPresent {
    fn vhost(
        &mut self,
        name: &str,
        desired: &VHost,
        existing: &IndexMap<String, VHost>,
    ) -> Result<Change, ReconcileError> {
        let presence = compare(ResourceKind::VHost, name, desired, existing.get(name))?;
        Ok(verify_present(presence, ResourceKind::VHost, name))
    }

    fn user(
        &mut self,
        name: &str,
        desired: &User,
        existing: &IndexMap<String, User>,
    ) -> Result<Change, ReconcileError> {
        let presence = compare_user(name, desired, existing.get(name))?;
        Ok(verify_present(presence, ResourceKind::User, name))
    }

    fn permissions(
        &mut self,
        name: &ScopedName,
        desired: &Permissions,
        existing: &IndexMap<ScopedName, Permissions>,
    ) -> Result<Change, ReconcileError> {
        let presence = compare(ResourceKind::Permissions, name, desired, existing.get(name))?;
        Ok(verify_present(presence, ResourceKind::Permissions, name))
    }

    fn exchange(
        &mut self,
        name: &ScopedName,
        desired: &Exchange,
        existing: Option<&Exchange>,
        _auth: &Credentials,
    ) -> Result<Change, ReconcileError> {
        let presence = compare(ResourceKind::Exchange, name, desired, existing)?;
        Ok(verify_present(presence, ResourceKind::Exchange, name))
    }

    fn queue(
        &mut self,
        name: &ScopedName,
        desired: &Queue,
        existing: Option<&Queue>,
        _auth: &Credentials,
    ) -> Result<Change, ReconcileError> {
        let presence = compare(ResourceKind::Queue, name, desired, existing)?;
        Ok(verify_present(presence, ResourceKind::Queue, name))
    }

    fn binding(
        &mut self,
        source: &ScopedName,
        desired: &Binding,
        existing: &IndexMap<String, Vec<Binding>>,
        _auth: &Credentials,
    ) -> Result<Change, ReconcileError> {
        let presence = find_binding(source, desired, existing);
        Ok(verify_present(
            presence,
            ResourceKind::Binding,
            binding_name(source, desired),
        ))
    }
}
