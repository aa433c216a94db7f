//! Declarative RabbitMQ topology management.
//!
//! Describe the vhosts, users, permissions, exchanges, queues, and bindings a broker should have
//! in a YAML topology file, and hutch makes it so. It only ever creates what is missing: existing
//! resources are never changed or deleted, and one that exists with a different configuration
//! is reported as an error.
//!
//! # Program flow
//!
//! 1. [reader] turns a topology file into a [core::Topology].
//!
//! 2. A [Reconciler] walks the topology one resource kind at a time, in dependency order. For
//!    each resource it fetches what the broker already has through a [gateway::Broker] and hands
//!    both to a [action::ResourceAction], which either creates what is missing (apply) or only
//!    reports it (verify).
//!
//! 3. Exchanges, queues, and bindings are configured as a user from the topology whose
//!    permissions allow it, falling back to the operator; see [auth].
//!
//! 4. Errors along the way are collected rather than stopping the run, and [report] prints the
//!    result.

pub mod action;
pub mod auth;
pub mod config;
pub mod core;
pub mod error;
pub mod gateway;
pub mod reader;
pub mod reconcile;
pub mod report;

#[doc(inline)]
pub use reconcile::Reconciler;
