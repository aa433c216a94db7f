//! Types for representing a whole desired topology.

use crate::core::name::ScopedName;
use crate::core::resource::{Binding, Exchange, Permissions, Queue, User, VHost};
use indexmap::IndexMap;

/// Everything that should exist on the broker; typically read from a topology file.
///
/// Keys are kept exactly as written in the file. Scoped kinds use `name@vhost` keys, which are
/// only checked once reconciliation starts so that one bad key does not hide problems elsewhere
/// in the file. Bindings are keyed by their source exchange.
///
/// Order is preserved from the source file. Resources of each kind are reconciled in order, and
/// order decides which user is picked to configure a resource (see [crate::auth]).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Topology {
    pub vhosts: IndexMap<String, VHost>,
    pub users: IndexMap<String, User>,
    pub permissions: IndexMap<String, Permissions>,
    pub exchanges: IndexMap<String, Exchange>,
    pub queues: IndexMap<String, Queue>,
    pub bindings: IndexMap<String, Vec<Binding>>,
}

impl Topology {
    /// Creates an empty [Topology].
    pub fn new() -> Self {
        Topology::default()
    }

    /// Returns whether there is nothing to reconcile.
    pub fn is_empty(&self) -> bool {
        self.vhosts.is_empty()
            && self.users.is_empty()
            && self.permissions.is_empty()
            && self.exchanges.is_empty()
            && self.queues.is_empty()
            && self.bindings.values().all(Vec::is_empty)
    }

    pub fn with_vhost(mut self, name: impl Into<String>, vhost: VHost) -> Self {
        self.vhosts.insert(name.into(), vhost);
        self
    }

    pub fn with_user(mut self, name: impl Into<String>, user: User) -> Self {
        self.users.insert(name.into(), user);
        self
    }

    pub fn with_permissions(
        mut self,
        user: impl Into<String>,
        vhost: impl Into<String>,
        permissions: Permissions,
    ) -> Self {
        let key = ScopedName::new(user, vhost).to_string();
        self.permissions.insert(key, permissions);
        self
    }

    pub fn with_exchange(
        mut self,
        name: impl Into<String>,
        vhost: impl Into<String>,
        exchange: Exchange,
    ) -> Self {
        let key = ScopedName::new(name, vhost).to_string();
        self.exchanges.insert(key, exchange);
        self
    }

    pub fn with_queue(
        mut self,
        name: impl Into<String>,
        vhost: impl Into<String>,
        queue: Queue,
    ) -> Self {
        let key = ScopedName::new(name, vhost).to_string();
        self.queues.insert(key, queue);
        self
    }

    /// Appends a binding to the list for source exchange `exchange` on `vhost`.
    pub fn with_binding(
        mut self,
        exchange: impl Into<String>,
        vhost: impl Into<String>,
        binding: Binding,
    ) -> Self {
        let key = ScopedName::new(exchange, vhost).to_string();
        self.bindings.entry(key).or_default().push(binding);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DestinationType;

    #[test]
    fn builders_encode_scoped_keys() {
        let topology = Topology::new()
            .with_permissions("dan", "input", Permissions::default())
            .with_exchange("ex", "input", Exchange::default())
            .with_queue("q", "input", Queue::default());

        assert!(topology.permissions.contains_key("dan@input"));
        assert!(topology.exchanges.contains_key("ex@input"));
        assert!(topology.queues.contains_key("q@input"));
    }

    #[test]
    fn with_binding_appends() {
        let first = Binding::new("a", DestinationType::Queue, "#");
        let second = Binding::new("b", DestinationType::Exchange, "");
        let topology = Topology::new()
            .with_binding("ex", "input", first.clone())
            .with_binding("ex", "input", second.clone());

        assert_eq!(1, topology.bindings.len());
        assert_eq!(vec![first, second], topology.bindings["ex@input"]);
    }

    #[test]
    fn is_empty_works() {
        assert!(Topology::new().is_empty());
        assert!(!Topology::new()
            .with_vhost("input", VHost::default())
            .is_empty());
    }
}
