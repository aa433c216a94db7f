//! An in-memory [Broker] that records every call, for testing reconciliation.

use super::{require, Broker};
use crate::auth::Credentials;
use crate::core::{
    Binding, Exchange, Permissions, Queue, ResourceKind, ScopedName, Topology, User, VHost,
};
use crate::error::GatewayError;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};

/// A call made to a [FakeBroker]. Calls made as a specific user record that user's name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    ListVHosts,
    ListUsers,
    ListPermissions,
    GetExchange(ScopedName, String),
    GetQueue(ScopedName, String),
    ListBindings(String, String),
    CreateVHost(String),
    CreateUser(String),
    CreatePermissions(ScopedName),
    CreateExchange(ScopedName, String),
    CreateQueue(ScopedName, String),
    CreateBinding(ScopedName, String, String),
}

impl Call {
    /// Returns whether this call changes broker state.
    pub fn is_create(&self) -> bool {
        use Call::*;
        matches!(
            self,
            CreateVHost(_)
                | CreateUser(_)
                | CreatePermissions(_)
                | CreateExchange(..)
                | CreateQueue(..)
                | CreateBinding(..)
        )
    }
}

#[derive(Debug)]
pub struct FakeBroker {
    operator: Credentials,
    pub vhosts: RefCell<IndexMap<String, VHost>>,
    pub users: RefCell<IndexMap<String, User>>,
    pub permissions: RefCell<IndexMap<ScopedName, Permissions>>,
    pub exchanges: RefCell<IndexMap<ScopedName, Exchange>>,
    pub queues: RefCell<IndexMap<ScopedName, Queue>>,
    /// Keyed by source exchange.
    pub bindings: RefCell<IndexMap<ScopedName, Vec<Binding>>>,
    pub calls: RefCell<Vec<Call>>,
    /// How many more times [Broker::ping] answers `false`.
    pub ping_failures: Cell<usize>,
    pub pings: Cell<usize>,
    failing: RefCell<Vec<&'static str>>,
}

impl Default for FakeBroker {
    fn default() -> Self {
        FakeBroker {
            operator: Credentials::new("user", "pass"),
            vhosts: Default::default(),
            users: Default::default(),
            permissions: Default::default(),
            exchanges: Default::default(),
            queues: Default::default(),
            bindings: Default::default(),
            calls: Default::default(),
            ping_failures: Default::default(),
            pings: Default::default(),
            failing: Default::default(),
        }
    }
}

impl FakeBroker {
    pub fn new() -> Self {
        FakeBroker::default()
    }

    /// Creates a broker that already holds everything in `topology`. Malformed keys are
    /// skipped.
    pub fn holding(topology: &Topology) -> Self {
        let broker = FakeBroker::new();
        broker.vhosts.replace(topology.vhosts.clone());
        broker.users.replace(topology.users.clone());
        for (key, permissions) in &topology.permissions {
            if let Some(name) = ScopedName::parse(key) {
                broker
                    .permissions
                    .borrow_mut()
                    .insert(name, permissions.clone());
            }
        }
        for (key, exchange) in &topology.exchanges {
            if let Some(name) = ScopedName::parse(key) {
                broker.exchanges.borrow_mut().insert(name, exchange.clone());
            }
        }
        for (key, queue) in &topology.queues {
            if let Some(name) = ScopedName::parse(key) {
                broker.queues.borrow_mut().insert(name, queue.clone());
            }
        }
        for (key, bindings) in &topology.bindings {
            if let Some(name) = ScopedName::parse(key) {
                broker.bindings.borrow_mut().insert(name, bindings.clone());
            }
        }
        broker
    }

    /// Makes every call to the named method fail with HTTP status 500.
    pub fn fail(self, method: &'static str) -> Self {
        self.failing.borrow_mut().push(method);
        self
    }

    /// Returns and forgets the calls made so far.
    pub fn take_calls(&self) -> Vec<Call> {
        self.calls.take()
    }

    pub fn creates(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.is_create())
            .cloned()
            .collect()
    }

    fn record(&self, method: &'static str, call: Call) -> Result<(), GatewayError> {
        self.calls.borrow_mut().push(call);
        if self.failing.borrow().contains(&method) {
            return Err(GatewayError::Status {
                method: "FAKE".to_owned(),
                path: method.to_owned(),
                status: 500,
                expected: "2xx",
            });
        }
        Ok(())
    }
}

impl Broker for FakeBroker {
    fn operator(&self) -> &Credentials {
        &self.operator
    }

    fn ping(&self) -> bool {
        self.pings.set(self.pings.get() + 1);
        match self.ping_failures.get() {
            0 => true,
            n => {
                self.ping_failures.set(n - 1);
                false
            }
        }
    }

    fn list_vhosts(&self) -> Result<IndexMap<String, VHost>, GatewayError> {
        self.record("list_vhosts", Call::ListVHosts)?;
        Ok(self.vhosts.borrow().clone())
    }

    fn list_users(&self) -> Result<IndexMap<String, User>, GatewayError> {
        self.record("list_users", Call::ListUsers)?;
        Ok(self
            .users
            .borrow()
            .iter()
            .map(|(name, user)| {
                let user = User {
                    password: None,
                    admin: user.admin,
                };
                (name.clone(), user)
            })
            .collect())
    }

    fn list_permissions(&self) -> Result<IndexMap<ScopedName, Permissions>, GatewayError> {
        self.record("list_permissions", Call::ListPermissions)?;
        Ok(self.permissions.borrow().clone())
    }

    fn get_exchange(
        &self,
        vhost: &str,
        name: &str,
        auth: &Credentials,
    ) -> Result<Option<Exchange>, GatewayError> {
        let name = ScopedName::new(name, vhost);
        self.record(
            "get_exchange",
            Call::GetExchange(name.clone(), auth.username.clone()),
        )?;
        Ok(self.exchanges.borrow().get(&name).cloned())
    }

    fn get_queue(
        &self,
        vhost: &str,
        name: &str,
        auth: &Credentials,
    ) -> Result<Option<Queue>, GatewayError> {
        let name = ScopedName::new(name, vhost);
        self.record(
            "get_queue",
            Call::GetQueue(name.clone(), auth.username.clone()),
        )?;
        Ok(self.queues.borrow().get(&name).cloned())
    }

    fn list_bindings(
        &self,
        vhost: &str,
        auth: &Credentials,
    ) -> Result<IndexMap<String, Vec<Binding>>, GatewayError> {
        self.record(
            "list_bindings",
            Call::ListBindings(vhost.to_owned(), auth.username.clone()),
        )?;
        Ok(self
            .bindings
            .borrow()
            .iter()
            .filter(|(source, _)| source.vhost == vhost)
            .map(|(source, bindings)| (source.name.clone(), bindings.clone()))
            .collect())
    }

    fn create_vhost(&self, name: &str, vhost: &VHost) -> Result<(), GatewayError> {
        self.record("create_vhost", Call::CreateVHost(name.to_owned()))?;
        self.vhosts
            .borrow_mut()
            .insert(name.to_owned(), vhost.clone());
        Ok(())
    }

    fn create_user(&self, name: &str, user: &User) -> Result<(), GatewayError> {
        require(user.password.as_deref(), ResourceKind::User, name, "password")?;
        self.record("create_user", Call::CreateUser(name.to_owned()))?;
        self.users.borrow_mut().insert(name.to_owned(), user.clone());
        Ok(())
    }

    fn create_permissions(
        &self,
        name: &ScopedName,
        permissions: &Permissions,
    ) -> Result<(), GatewayError> {
        self.record("create_permissions", Call::CreatePermissions(name.clone()))?;
        self.permissions
            .borrow_mut()
            .insert(name.clone(), permissions.clone());
        Ok(())
    }

    fn create_exchange(
        &self,
        name: &ScopedName,
        exchange: &Exchange,
        auth: &Credentials,
    ) -> Result<(), GatewayError> {
        require(exchange.kind.as_ref(), ResourceKind::Exchange, name, "type")?;
        self.record(
            "create_exchange",
            Call::CreateExchange(name.clone(), auth.username.clone()),
        )?;
        self.exchanges
            .borrow_mut()
            .insert(name.clone(), exchange.clone());
        Ok(())
    }

    fn create_queue(
        &self,
        name: &ScopedName,
        queue: &Queue,
        auth: &Credentials,
    ) -> Result<(), GatewayError> {
        self.record(
            "create_queue",
            Call::CreateQueue(name.clone(), auth.username.clone()),
        )?;
        self.queues.borrow_mut().insert(name.clone(), queue.clone());
        Ok(())
    }

    fn create_binding(
        &self,
        exchange: &ScopedName,
        binding: &Binding,
        auth: &Credentials,
    ) -> Result<(), GatewayError> {
        let destination = require(
            binding.destination.as_deref(),
            ResourceKind::Binding,
            exchange,
            "destination",
        )?;
        require(
            binding.destination_type.as_ref(),
            ResourceKind::Binding,
            exchange,
            "destination_type",
        )?;
        self.record(
            "create_binding",
            Call::CreateBinding(
                exchange.clone(),
                destination.to_owned(),
                auth.username.clone(),
            ),
        )?;
        self.bindings
            .borrow_mut()
            .entry(exchange.clone())
            .or_default()
            .push(binding.clone());
        Ok(())
    }
}
