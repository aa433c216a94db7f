//! The interface reconciliation uses to read and change broker state.
//!
//! [Broker] is the seam between the reconciliation logic and the broker itself.
//! [ManagementClient] implements it over the broker's HTTP management API; tests use an
//! in-memory implementation.
//!
//! # Shapes of existing state
//!
//! Vhosts, users, and permissions are cheap to list in full, so they are fetched once per run as
//! maps. Exchanges and queues are fetched one at a time, because listing them requires
//! permissions on every vhost and may be large; absence is [None]. Bindings are listed per vhost
//! and grouped by source exchange.

pub mod http;
mod wire;

#[cfg(test)]
pub mod fake;

use crate::auth::Credentials;
use crate::core::{Binding, Exchange, Permissions, Queue, ResourceKind, ScopedName, User, VHost};
use crate::error::GatewayError;
use indexmap::IndexMap;

#[doc(inline)]
pub use http::ManagementClient;

/// Reads and creates broker resources.
///
/// Methods that take [Credentials] perform the call as that user; all others use
/// [Broker::operator].
pub trait Broker {
    /// The credentials of whoever is running hutch. Used when no more specific user applies.
    fn operator(&self) -> &Credentials;

    /// Returns whether the broker is up and accepting management requests.
    fn ping(&self) -> bool;

    fn list_vhosts(&self) -> Result<IndexMap<String, VHost>, GatewayError>;

    /// Lists users. The broker does not return passwords, so [User::password] is always [None].
    fn list_users(&self) -> Result<IndexMap<String, User>, GatewayError>;

    /// Lists permissions keyed by user and vhost.
    fn list_permissions(&self) -> Result<IndexMap<ScopedName, Permissions>, GatewayError>;

    fn get_exchange(
        &self,
        vhost: &str,
        name: &str,
        auth: &Credentials,
    ) -> Result<Option<Exchange>, GatewayError>;

    fn get_queue(
        &self,
        vhost: &str,
        name: &str,
        auth: &Credentials,
    ) -> Result<Option<Queue>, GatewayError>;

    /// Lists the bindings on `vhost`, grouped by source exchange. A vhost that does not exist
    /// has no bindings.
    fn list_bindings(
        &self,
        vhost: &str,
        auth: &Credentials,
    ) -> Result<IndexMap<String, Vec<Binding>>, GatewayError>;

    fn create_vhost(&self, name: &str, vhost: &VHost) -> Result<(), GatewayError>;

    /// Fails with [GatewayError::MissingField] if `user` has no password.
    fn create_user(&self, name: &str, user: &User) -> Result<(), GatewayError>;

    fn create_permissions(
        &self,
        name: &ScopedName,
        permissions: &Permissions,
    ) -> Result<(), GatewayError>;

    /// Fails with [GatewayError::MissingField] if `exchange` has no type.
    fn create_exchange(
        &self,
        name: &ScopedName,
        exchange: &Exchange,
        auth: &Credentials,
    ) -> Result<(), GatewayError>;

    fn create_queue(
        &self,
        name: &ScopedName,
        queue: &Queue,
        auth: &Credentials,
    ) -> Result<(), GatewayError>;

    /// Binds source exchange `exchange` to the binding's destination.
    ///
    /// Fails with [GatewayError::MissingField] if the binding has no destination or no
    /// destination type.
    fn create_binding(
        &self,
        exchange: &ScopedName,
        binding: &Binding,
        auth: &Credentials,
    ) -> Result<(), GatewayError>;
}

impl<B: Broker + ?Sized> Broker for &B {
    fn operator(&self) -> &Credentials {
        (**self).operator()
    }

    fn ping(&self) -> bool {
        (**self).ping()
    }

    fn list_vhosts(&self) -> Result<IndexMap<String, VHost>, GatewayError> {
        (**self).list_vhosts()
    }

    fn list_users(&self) -> Result<IndexMap<String, User>, GatewayError> {
        (**self).list_users()
    }

    fn list_permissions(&self) -> Result<IndexMap<ScopedName, Permissions>, GatewayError> {
        (**self).list_permissions()
    }

    fn get_exchange(
        &self,
        vhost: &str,
        name: &str,
        auth: &Credentials,
    ) -> Result<Option<Exchange>, GatewayError> {
        (**self).get_exchange(vhost, name, auth)
    }

    fn get_queue(
        &self,
        vhost: &str,
        name: &str,
        auth: &Credentials,
    ) -> Result<Option<Queue>, GatewayError> {
        (**self).get_queue(vhost, name, auth)
    }

    fn list_bindings(
        &self,
        vhost: &str,
        auth: &Credentials,
    ) -> Result<IndexMap<String, Vec<Binding>>, GatewayError> {
        (**self).list_bindings(vhost, auth)
    }

    fn create_vhost(&self, name: &str, vhost: &VHost) -> Result<(), GatewayError> {
        (**self).create_vhost(name, vhost)
    }

    fn create_user(&self, name: &str, user: &User) -> Result<(), GatewayError> {
        (**self).create_user(name, user)
    }

    fn create_permissions(
        &self,
        name: &ScopedName,
        permissions: &Permissions,
    ) -> Result<(), GatewayError> {
        (**self).create_permissions(name, permissions)
    }

    fn create_exchange(
        &self,
        name: &ScopedName,
        exchange: &Exchange,
        auth: &Credentials,
    ) -> Result<(), GatewayError> {
        (**self).create_exchange(name, exchange, auth)
    }

    fn create_queue(
        &self,
        name: &ScopedName,
        queue: &Queue,
        auth: &Credentials,
    ) -> Result<(), GatewayError> {
        (**self).create_queue(name, queue, auth)
    }

    fn create_binding(
        &self,
        exchange: &ScopedName,
        binding: &Binding,
        auth: &Credentials,
    ) -> Result<(), GatewayError> {
        (**self).create_binding(exchange, binding, auth)
    }
}

/// Unwraps a field that creation cannot do without.
pub(crate) fn require<'a, T: ?Sized>(
    value: Option<&'a T>,
    kind: ResourceKind,
    name: impl ToString,
    field: &'static str,
) -> Result<&'a T, GatewayError> {
    value.ok_or_else(|| GatewayError::MissingField {
        kind,
        name: name.to_string(),
        field,
    })
}
