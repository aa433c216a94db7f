//! Walks a [Topology] and brings the broker in line with it.
//!
//! Resource kinds are handled in dependency order: vhosts, users, permissions, exchanges,
//! queues, bindings. A problem with one resource never stops the run; every error is collected
//! and returned together once everything else has been attempted.

use crate::action::{binding_name, Change, EnsurePresent, ResourceAction, VerifyPresent};
use crate::auth::{self, Credentials};
use crate::core::{ResourceKind, ScopedName, Topology};
use crate::error::{AggregateError, GatewayError, Operation, ReconcileError};
use crate::gateway::Broker;
use std::fmt::{self, Display};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// How often [Reconciler::wait_for_broker] pings the broker.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Whether a run changes the broker or only inspects it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Apply,
    Verify,
}

impl Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Apply => f.write_str("applying configuration"),
            Mode::Verify => f.write_str("verifying configuration"),
        }
    }
}

/// Identifies one resource in a [Summary].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        ResourceRef {
            kind,
            name: name.into(),
        }
    }
}

impl Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// What a run got done, in the order it happened.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Resources that were missing and have been created.
    pub created: Vec<ResourceRef>,

    /// Resources that are missing and would be created by applying.
    pub pending: Vec<ResourceRef>,
}

impl Summary {
    /// Returns whether the broker already matched the topology.
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.pending.is_empty()
    }
}

/// Reconciles topologies against one broker.
#[derive(Debug)]
pub struct Reconciler<B> {
    broker: B,
}

impl<B: Broker> Reconciler<B> {
    pub fn new(broker: B) -> Self {
        Reconciler { broker }
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// Pings the broker once a second until it answers or `timeout` runs out.
    ///
    /// Returns whether the broker became ready. Callers usually carry on either way and let
    /// the run report whatever fails.
    pub fn wait_for_broker(&self, timeout: Duration) -> bool {
        self.wait_with_interval(timeout, POLL_INTERVAL)
    }

    fn wait_with_interval(&self, timeout: Duration, interval: Duration) -> bool {
        // A timeout too large to add to the clock never runs out.
        let deadline = Instant::now().checked_add(timeout);
        info!("Waiting up to {timeout:?} for the broker");
        loop {
            if self.broker.ping() {
                info!("Broker is ready");
                return true;
            }
            let now = Instant::now();
            let pause = match deadline {
                Some(deadline) if now >= deadline => {
                    warn!("Broker not ready after {timeout:?}, continuing anyway");
                    return false;
                }
                Some(deadline) => interval.min(deadline - now),
                None => interval,
            };
            thread::sleep(pause);
        }
    }

    /// Creates everything in `topology` that the broker lacks.
    pub fn apply(&self, topology: &Topology) -> Result<Summary, AggregateError> {
        self.reconcile(Mode::Apply, topology)
    }

    /// Checks the broker against `topology` without changing anything.
    pub fn verify(&self, topology: &Topology) -> Result<Summary, AggregateError> {
        self.reconcile(Mode::Verify, topology)
    }

    pub fn reconcile(&self, mode: Mode, topology: &Topology) -> Result<Summary, AggregateError> {
        match mode {
            Mode::Apply => self.run(mode, &mut EnsurePresent::new(&self.broker), topology),
            Mode::Verify => self.run(mode, &mut VerifyPresent, topology),
        }
    }

    /// Walks `topology` with any [ResourceAction].
    ///
    /// Returns the [Summary] if nothing went wrong, or every error encountered along with the
    /// partial [Summary].
    pub fn run<A: ResourceAction + ?Sized>(
        &self,
        mode: Mode,
        action: &mut A,
        topology: &Topology,
    ) -> Result<Summary, AggregateError> {
        info!("Started {mode}");
        let mut run = Run {
            broker: &self.broker,
            action,
            topology,
            summary: Summary::default(),
            errors: vec![],
        };
        for kind in ResourceKind::ALL {
            run.kind(kind);
        }

        let Run {
            summary, errors, ..
        } = run;
        if errors.is_empty() {
            info!("Finished {mode}");
            Ok(summary)
        } else {
            error!("Encountered {} errors while {mode}", errors.len());
            Err(AggregateError {
                mode,
                errors,
                summary,
            })
        }
    }
}

/// The state of one pass over a [Topology].
struct Run<'r, B: ?Sized, A: ?Sized> {
    broker: &'r B,
    action: &'r mut A,
    topology: &'r Topology,
    summary: Summary,
    errors: Vec<ReconcileError>,
}

impl<'r, B: Broker + ?Sized, A: ResourceAction + ?Sized> Run<'r, B, A> {
    fn kind(&mut self, kind: ResourceKind) {
        match kind {
            ResourceKind::VHost => self.vhosts(),
            ResourceKind::User => self.users(),
            ResourceKind::Permissions => self.permissions(),
            ResourceKind::Exchange => self.exchanges(),
            ResourceKind::Queue => self.queues(),
            ResourceKind::Binding => self.bindings(),
        }
    }

    fn fail(&mut self, err: ReconcileError) {
        error!("{err}");
        self.errors.push(err);
    }

    fn record(&mut self, kind: ResourceKind, name: String, outcome: Result<Change, ReconcileError>) {
        match outcome {
            Ok(Change::Unchanged) => {}
            Ok(Change::Created) => self.summary.created.push(ResourceRef::new(kind, name)),
            Ok(Change::Pending) => self.summary.pending.push(ResourceRef::new(kind, name)),
            Err(err) => self.fail(err),
        }
    }

    /// Unwraps a listing of existing resources, recording the failure if there is none.
    fn snapshot<T>(&mut self, kind: ResourceKind, fetched: Result<T, GatewayError>) -> Option<T> {
        match fetched {
            Ok(existing) => Some(existing),
            Err(source) => {
                self.fail(ReconcileError::Snapshot { kind, source });
                None
            }
        }
    }

    /// Unwraps an existing resource fetched for `name`, recording the failure if there is none.
    fn fetched<T>(
        &mut self,
        kind: ResourceKind,
        name: &ScopedName,
        fetched: Result<T, GatewayError>,
    ) -> Option<T> {
        match fetched {
            Ok(existing) => Some(existing),
            Err(source) => {
                self.fail(ReconcileError::Gateway {
                    operation: Operation::Fetch,
                    kind,
                    name: name.to_string(),
                    source,
                });
                None
            }
        }
    }

    fn parse(&mut self, kind: ResourceKind, key: &str) -> Option<ScopedName> {
        let name = ScopedName::parse(key);
        if name.is_none() {
            self.fail(ReconcileError::KeyGrammar {
                kind,
                key: key.to_owned(),
            });
        }
        name
    }

    fn credentials(&self, name: &ScopedName) -> Credentials {
        auth::resolve(
            &self.topology.users,
            &self.topology.permissions,
            &name.vhost,
            &name.name,
            self.broker.operator(),
        )
    }

    fn vhosts(&mut self) {
        let topology = self.topology;
        let desired = &topology.vhosts;
        if desired.is_empty() {
            return;
        }
        let fetched = self.broker.list_vhosts();
        let Some(existing) = self.snapshot(ResourceKind::VHost, fetched) else {
            return;
        };
        for (name, vhost) in desired {
            let outcome = self.action.vhost(name, vhost, &existing);
            self.record(ResourceKind::VHost, name.clone(), outcome);
        }
    }

    fn users(&mut self) {
        let topology = self.topology;
        let desired = &topology.users;
        if desired.is_empty() {
            return;
        }
        let fetched = self.broker.list_users();
        let Some(existing) = self.snapshot(ResourceKind::User, fetched) else {
            return;
        };
        for (name, user) in desired {
            let outcome = self.action.user(name, user, &existing);
            self.record(ResourceKind::User, name.clone(), outcome);
        }
    }

    fn permissions(&mut self) {
        let topology = self.topology;
        let desired = &topology.permissions;
        if desired.is_empty() {
            return;
        }
        let fetched = self.broker.list_permissions();
        let Some(existing) = self.snapshot(ResourceKind::Permissions, fetched) else {
            return;
        };
        for (key, permissions) in desired {
            let Some(name) = self.parse(ResourceKind::Permissions, key) else {
                continue;
            };
            let outcome = self.action.permissions(&name, permissions, &existing);
            self.record(ResourceKind::Permissions, name.to_string(), outcome);
        }
    }

    fn exchanges(&mut self) {
        let topology = self.topology;
        for (key, exchange) in &topology.exchanges {
            let Some(name) = self.parse(ResourceKind::Exchange, key) else {
                continue;
            };
            let auth = self.credentials(&name);
            let fetched = self.broker.get_exchange(&name.vhost, &name.name, &auth);
            let Some(existing) = self.fetched(ResourceKind::Exchange, &name, fetched) else {
                continue;
            };
            let outcome = self
                .action
                .exchange(&name, exchange, existing.as_ref(), &auth);
            self.record(ResourceKind::Exchange, name.to_string(), outcome);
        }
    }

    fn queues(&mut self) {
        let topology = self.topology;
        for (key, queue) in &topology.queues {
            let Some(name) = self.parse(ResourceKind::Queue, key) else {
                continue;
            };
            let auth = self.credentials(&name);
            let fetched = self.broker.get_queue(&name.vhost, &name.name, &auth);
            let Some(existing) = self.fetched(ResourceKind::Queue, &name, fetched) else {
                continue;
            };
            let outcome = self.action.queue(&name, queue, existing.as_ref(), &auth);
            self.record(ResourceKind::Queue, name.to_string(), outcome);
        }
    }

    fn bindings(&mut self) {
        let topology = self.topology;
        for (key, bindings) in &topology.bindings {
            let Some(source) = self.parse(ResourceKind::Binding, key) else {
                continue;
            };
            if bindings.is_empty() {
                continue;
            }
            let auth = self.credentials(&source);
            let fetched = self.broker.list_bindings(&source.vhost, &auth);
            let Some(existing) = self.fetched(ResourceKind::Binding, &source, fetched) else {
                continue;
            };
            for binding in bindings {
                let outcome = self.action.binding(&source, binding, &existing, &auth);
                self.record(ResourceKind::Binding, binding_name(&source, binding), outcome);
            }
        }
    }
}
