//! Provides types that represent the desired broker topology, e.g. exchanges, queues, and the
//! users allowed to configure them.

pub mod name;
pub mod resource;
pub mod topology;

#[doc(inline)]
pub use name::ScopedName;

#[doc(inline)]
pub use resource::{
    normalize_arguments, Arguments, Binding, DestinationType, Exchange, ExchangeType,
    Permissions, Queue, ResourceKind, User, VHost, MESSAGE_TTL,
};

#[doc(inline)]
pub use topology::Topology;
