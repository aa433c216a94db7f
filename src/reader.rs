//! Reads topology files.
//!
//! A topology file is a YAML document with up to six top-level mappings: `vhosts`, `users`,
//! `permissions`, `exchanges`, `queues`, and `bindings`. Any of them may be left out. A resource
//! with an empty body, such as `test:` under `vhosts`, takes every default.
//!
//! Keys are not checked here; see [Topology].

use crate::core::resource::nullable;
use crate::core::{
    normalize_arguments, Arguments, Binding, DestinationType, Exchange, Permissions, Queue,
    Topology, User, VHost,
};
use crate::error::ConfigReadError;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Document {
    #[serde(deserialize_with = "nullable")]
    vhosts: IndexMap<String, Option<VHost>>,
    #[serde(deserialize_with = "nullable")]
    users: IndexMap<String, Option<User>>,
    #[serde(deserialize_with = "nullable")]
    permissions: IndexMap<String, Option<Permissions>>,
    #[serde(deserialize_with = "nullable")]
    exchanges: IndexMap<String, Option<Exchange>>,
    #[serde(deserialize_with = "nullable")]
    queues: IndexMap<String, Option<Queue>>,
    #[serde(deserialize_with = "nullable")]
    bindings: IndexMap<String, Option<Vec<Value>>>,
}

/// Reads a [Topology] from the YAML file at `path`.
pub fn read_file(path: impl AsRef<Path>) -> Result<Topology, ConfigReadError> {
    let path = path.as_ref();
    let yaml = fs::read_to_string(path).map_err(|source| ConfigReadError::Io {
        path: path.to_owned(),
        source,
    })?;
    read_str(&yaml)
}

/// Reads a [Topology] from YAML text. An empty document is an empty [Topology].
pub fn read_str(yaml: &str) -> Result<Topology, ConfigReadError> {
    let document = match serde_yaml::from_str::<Value>(yaml)? {
        Value::Null => Document::default(),
        Value::Mapping(sections) => serde_yaml::from_value(Value::Mapping(
            sections
                .into_iter()
                .map(|(section, resources)| (section, stringify_keys(resources)))
                .collect(),
        ))?,
        value => serde_yaml::from_value(value)?,
    };

    let mut bindings = IndexMap::with_capacity(document.bindings.len());
    for (key, entries) in document.bindings {
        let entries = entries
            .unwrap_or_default()
            .into_iter()
            .map(|entry| binding(&key, entry))
            .collect::<Result<Vec<_>, _>>()?;
        bindings.insert(key, entries);
    }

    Ok(Topology {
        vhosts: with_defaults(document.vhosts),
        users: with_defaults(document.users),
        permissions: with_defaults(document.permissions),
        exchanges: with_defaults(document.exchanges)
            .into_iter()
            .map(|(key, mut exchange)| {
                normalize_arguments(&mut exchange.arguments);
                (key, exchange)
            })
            .collect(),
        queues: with_defaults(document.queues)
            .into_iter()
            .map(|(key, mut queue)| {
                normalize_arguments(&mut queue.arguments);
                (key, queue)
            })
            .collect(),
        bindings,
    })
}

fn with_defaults<T: Default>(map: IndexMap<String, Option<T>>) -> IndexMap<String, T> {
    map.into_iter()
        .map(|(key, value)| (key, value.unwrap_or_default()))
        .collect()
}

/// Turns unquoted numeric and boolean resource names, such as `1234:` under `users`, into
/// strings. Other keys are left for deserialization to reject.
fn stringify_keys(resources: Value) -> Value {
    let Value::Mapping(resources) = resources else {
        return resources;
    };
    Value::Mapping(
        resources
            .into_iter()
            .map(|(key, body)| {
                let key = match key {
                    Value::Number(n) => Value::String(n.to_string()),
                    Value::Bool(b) => Value::String(b.to_string()),
                    key => key,
                };
                (key, body)
            })
            .collect(),
    )
}

/// Builds a [Binding] from one entry in the list for source exchange `key`.
fn binding(key: &str, entry: Value) -> Result<Binding, ConfigReadError> {
    let invalid = |reason: String| ConfigReadError::InvalidBinding {
        key: key.to_owned(),
        reason,
    };

    let fields = match entry {
        Value::Mapping(fields) => fields,
        other => return Err(invalid(format!("expected a mapping, found {}", describe(&other)))),
    };

    let mut binding = Binding::default();
    for (field, value) in fields {
        let field = match field {
            Value::String(field) => field,
            other => return Err(invalid(format!("unexpected field {}", describe(&other)))),
        };
        match field.as_str() {
            "destination" => binding.destination = scalar(key, &field, value)?,
            "destination_type" => {
                binding.destination_type = match scalar(key, &field, value)? {
                    Some(value) => Some(value.parse::<DestinationType>().map_err(|_| {
                        ConfigReadError::InvalidDestinationType {
                            key: key.to_owned(),
                            value,
                            expected: DestinationType::NAMES,
                        }
                    })?),
                    None => None,
                }
            }
            "routing_key" => binding.routing_key = scalar(key, &field, value)?.unwrap_or_default(),
            "arguments" => {
                binding.arguments = match value {
                    Value::Null => Arguments::new(),
                    value @ Value::Mapping(_) => serde_yaml::from_value(value)?,
                    other => {
                        return Err(invalid(format!(
                            "arguments must be a mapping, found {}",
                            describe(&other),
                        )))
                    }
                };
                normalize_arguments(&mut binding.arguments);
            }
            other => {
                return Err(invalid(format!(
                    "unknown field {other:?}, expected one of: destination, destination_type, \
                    routing_key, arguments"
                )))
            }
        }
    }
    Ok(binding)
}

/// Coerces a scalar field to a string. `null` means the field was left empty.
fn scalar(key: &str, field: &str, value: Value) -> Result<Option<String>, ConfigReadError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(ConfigReadError::InvalidBinding {
            key: key.to_owned(),
            reason: format!("{field} must be a scalar, found {}", describe(&other)),
        }),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
