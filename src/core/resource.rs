//! Types for representing individual broker resources.
//!
//! Every type here does double duty: it is the desired configuration read from a topology file,
//! and it is the existing configuration fetched from the broker. Comparing the two with `==` is
//! how reconciliation decides whether anything needs to happen.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt::{self, Debug, Display};
use std::str::FromStr;

/// Free-form `x-` arguments on exchanges, queues, and bindings.
///
/// Comparison ignores insertion order.
pub type Arguments = IndexMap<String, Value>;

/// The argument that holds a message TTL in milliseconds.
pub const MESSAGE_TTL: &str = "x-message-ttl";

/// Rewrites a whole-number floating-point [MESSAGE_TTL] as an integer.
///
/// The management API may hand back `123.0` for a TTL that was declared as `123`. Without this,
/// such a queue would never compare equal to its own configuration.
pub fn normalize_arguments(arguments: &mut Arguments) {
    if let Some(value) = arguments.get_mut(MESSAGE_TTL) {
        if !value.is_f64() {
            return;
        }
        if let Some(float) = value.as_f64() {
            if float.fract() == 0.0 && float >= i64::MIN as f64 && float <= i64::MAX as f64 {
                *value = Value::from(float as i64);
            }
        }
    }
}

/// Deserializes an explicit YAML/JSON `null` as the type's default.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The kinds of resources, listed in the order in which they are reconciled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    VHost,
    User,
    Permissions,
    Exchange,
    Queue,
    Binding,
}

impl ResourceKind {
    /// Every kind, in dependency order.
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::VHost,
        ResourceKind::User,
        ResourceKind::Permissions,
        ResourceKind::Exchange,
        ResourceKind::Queue,
        ResourceKind::Binding,
    ];

    pub fn as_str(&self) -> &'static str {
        use ResourceKind::*;
        match self {
            VHost => "vhost",
            User => "user",
            Permissions => "permissions",
            Exchange => "exchange",
            Queue => "queue",
            Binding => "binding",
        }
    }

    /// How a key of this kind is spelled in a topology file, for error messages.
    pub fn key_form(&self) -> &'static str {
        use ResourceKind::*;
        match self {
            VHost => "vhost",
            User => "user",
            Permissions => "user@vhost",
            Exchange | Binding => "exchange@vhost",
            Queue => "queue@vhost",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct VHost {
    pub tracing: bool,
}

/// A broker user.
///
/// The broker only ever hands back a password hash, so users fetched from the broker have no
/// [Self::password]. [Debug] output never shows the password.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct User {
    pub password: Option<String>,
    pub admin: bool,
}

impl Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("admin", &self.admin)
            .finish()
    }
}

/// A user's rights on one vhost. Each field is a regular expression over resource names.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Permissions {
    pub configure: String,
    pub write: String,
    pub read: String,
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions {
            configure: ".*".to_owned(),
            write: ".*".to_owned(),
            read: ".*".to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeType {
    Direct,
    Topic,
    Fanout,
    Headers,
}

impl ExchangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeType::Direct => "direct",
            ExchangeType::Topic => "topic",
            ExchangeType::Fanout => "fanout",
            ExchangeType::Headers => "headers",
        }
    }
}

impl FromStr for ExchangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(ExchangeType::Direct),
            "topic" => Ok(ExchangeType::Topic),
            "fanout" => Ok(ExchangeType::Fanout),
            "headers" => Ok(ExchangeType::Headers),
            other => Err(format!(
                "unknown exchange type {other:?}, must be one of: direct, topic, fanout, headers"
            )),
        }
    }
}

impl Display for ExchangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Exchange {
    /// Required to create the exchange, but may be left out of a topology file.
    #[serde(rename = "type")]
    pub kind: Option<ExchangeType>,
    pub durable: bool,
    pub auto_delete: bool,
    pub internal: bool,
    #[serde(deserialize_with = "nullable")]
    pub arguments: Arguments,
}

impl Exchange {
    /// A durable, non-internal exchange of the given type with no arguments.
    pub fn of_type(kind: ExchangeType) -> Self {
        Exchange {
            kind: Some(kind),
            ..Exchange::default()
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Exchange {
            kind: None,
            durable: true,
            auto_delete: false,
            internal: false,
            arguments: Arguments::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Queue {
    pub durable: bool,
    pub auto_delete: bool,
    #[serde(deserialize_with = "nullable")]
    pub arguments: Arguments,
}

impl Queue {
    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }
}

impl Default for Queue {
    fn default() -> Self {
        Queue {
            durable: true,
            auto_delete: false,
            arguments: Arguments::new(),
        }
    }
}

/// What a binding routes messages to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationType {
    Queue,
    Exchange,
}

impl DestinationType {
    /// The accepted spellings, for error messages.
    pub const NAMES: &'static str = "queue, exchange";

    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationType::Queue => "queue",
            DestinationType::Exchange => "exchange",
        }
    }

    /// The one-letter path segment the management API uses for this destination type.
    pub fn path_segment(&self) -> &'static str {
        match self {
            DestinationType::Queue => "q",
            DestinationType::Exchange => "e",
        }
    }
}

impl FromStr for DestinationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queue" => Ok(DestinationType::Queue),
            "exchange" => Ok(DestinationType::Exchange),
            other => Err(format!(
                "invalid destination_type {other:?}, must be one of: {}",
                Self::NAMES
            )),
        }
    }
}

impl Display for DestinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outgoing binding from a source exchange.
///
/// The source exchange is not part of this type; topology files and the broker both group
/// bindings by their source.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Binding {
    /// Required to create the binding.
    pub destination: Option<String>,

    /// Required to create the binding.
    pub destination_type: Option<DestinationType>,

    pub routing_key: String,

    pub arguments: Arguments,
}

impl Binding {
    pub fn new(
        destination: impl Into<String>,
        destination_type: DestinationType,
        routing_key: impl Into<String>,
    ) -> Self {
        Binding {
            destination: Some(destination.into()),
            destination_type: Some(destination_type),
            routing_key: routing_key.into(),
            arguments: Arguments::new(),
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }
}
