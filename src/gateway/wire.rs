//! JSON shapes exchanged with the management API.
//!
//! Responses carry many more fields than hutch compares; unknown fields are ignored and missing
//! ones take the broker's defaults.

use crate::core::{
    normalize_arguments, Arguments, Binding, DestinationType, Exchange, Permissions, Queue,
    ScopedName, User, VHost,
};
use crate::error::GatewayError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The tag that makes a user an administrator.
pub const ADMINISTRATOR: &str = "administrator";

#[derive(Debug, Deserialize)]
pub struct VHostEntry {
    pub name: String,
    #[serde(default)]
    pub tracing: bool,
}

/// User tags. Older brokers send a comma-separated string, newer ones a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Tags {
    Joined(String),
    List(Vec<String>),
}

impl Tags {
    fn contains(&self, tag: &str) -> bool {
        match self {
            Tags::Joined(joined) => joined.split(',').any(|t| t.trim() == tag),
            Tags::List(list) => list.iter().any(|t| t == tag),
        }
    }
}

impl Default for Tags {
    fn default() -> Self {
        Tags::List(vec![])
    }
}

#[derive(Debug, Deserialize)]
pub struct UserEntry {
    pub name: String,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Deserialize)]
pub struct PermissionsEntry {
    pub user: String,
    pub vhost: String,
    pub configure: String,
    pub write: String,
    pub read: String,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub durable: bool,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub arguments: Option<Arguments>,
}

#[derive(Debug, Deserialize)]
pub struct QueueEntry {
    #[serde(default)]
    pub durable: bool,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default)]
    pub arguments: Option<Arguments>,
}

#[derive(Debug, Deserialize)]
pub struct BindingEntry {
    pub source: String,
    pub destination: String,
    pub destination_type: String,
    #[serde(default)]
    pub routing_key: String,
    #[serde(default)]
    pub arguments: Option<Arguments>,
}

pub fn vhosts(entries: Vec<VHostEntry>) -> IndexMap<String, VHost> {
    entries
        .into_iter()
        .map(|entry| (entry.name, VHost { tracing: entry.tracing }))
        .collect()
}

pub fn users(entries: Vec<UserEntry>) -> IndexMap<String, User> {
    entries
        .into_iter()
        .map(|entry| {
            let user = User {
                password: None,
                admin: entry.tags.contains(ADMINISTRATOR),
            };
            (entry.name, user)
        })
        .collect()
}

pub fn permissions(entries: Vec<PermissionsEntry>) -> IndexMap<ScopedName, Permissions> {
    entries
        .into_iter()
        .map(|entry| {
            let permissions = Permissions {
                configure: entry.configure,
                write: entry.write,
                read: entry.read,
            };
            (ScopedName::new(entry.user, entry.vhost), permissions)
        })
        .collect()
}

fn arguments(arguments: Option<Arguments>) -> Arguments {
    let mut arguments = arguments.unwrap_or_default();
    normalize_arguments(&mut arguments);
    arguments
}

pub fn exchange(entry: ExchangeEntry) -> Result<Exchange, GatewayError> {
    let kind = entry.kind.parse().map_err(|reason| GatewayError::Decode {
        what: "exchange",
        reason,
    })?;
    Ok(Exchange {
        kind: Some(kind),
        durable: entry.durable,
        auto_delete: entry.auto_delete,
        internal: entry.internal,
        arguments: arguments(entry.arguments),
    })
}

pub fn queue(entry: QueueEntry) -> Queue {
    Queue {
        durable: entry.durable,
        auto_delete: entry.auto_delete,
        arguments: arguments(entry.arguments),
    }
}

/// Groups bindings by source exchange, keeping the broker's order within each group.
pub fn bindings(entries: Vec<BindingEntry>) -> Result<IndexMap<String, Vec<Binding>>, GatewayError> {
    let mut grouped: IndexMap<String, Vec<Binding>> = IndexMap::new();
    for entry in entries {
        let destination_type: DestinationType =
            entry
                .destination_type
                .parse()
                .map_err(|reason| GatewayError::Decode {
                    what: "binding",
                    reason,
                })?;
        grouped.entry(entry.source).or_default().push(Binding {
            destination: Some(entry.destination),
            destination_type: Some(destination_type),
            routing_key: entry.routing_key,
            arguments: arguments(entry.arguments),
        });
    }
    Ok(grouped)
}

#[derive(Debug, Serialize)]
pub struct VHostBody {
    pub tracing: bool,
}

#[derive(Serialize)]
pub struct UserBody<'a> {
    pub password: &'a str,
    pub tags: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ExchangeBody<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub durable: bool,
    pub auto_delete: bool,
    pub internal: bool,
    pub arguments: &'a Arguments,
}

#[derive(Debug, Serialize)]
pub struct QueueBody<'a> {
    pub durable: bool,
    pub auto_delete: bool,
    pub arguments: &'a Arguments,
}

#[derive(Debug, Serialize)]
pub struct BindingBody<'a> {
    pub routing_key: &'a str,
    pub arguments: &'a Arguments,
}
