//! A [Broker] backed by the RabbitMQ HTTP management API.

use super::{require, wire, Broker};
use crate::auth::Credentials;
use crate::core::{Binding, Exchange, Permissions, Queue, ResourceKind, ScopedName, User, VHost};
use crate::error::GatewayError;
use indexmap::IndexMap;
use reqwest::blocking::Client;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// How long a single request may take before it is abandoned.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Talks to the management API at a base URL such as `http://localhost:15672`.
///
/// Every request authenticates with HTTP basic auth, either as the operator or as the user
/// passed to the call.
#[derive(Clone, Debug)]
pub struct ManagementClient {
    base: Url,
    operator: Credentials,
    http: Client,
}

impl ManagementClient {
    pub fn new(broker: &str, operator: Credentials) -> Result<Self, GatewayError> {
        Self::with_timeout(broker, operator, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        broker: &str,
        operator: Credentials,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let invalid = |reason: String| GatewayError::InvalidUrl {
            url: broker.to_owned(),
            reason,
        };
        let base = Url::parse(broker).map_err(|err| invalid(err.to_string()))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("expected an http or https URL".to_owned()));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::Client)?;
        Ok(ManagementClient {
            base,
            operator,
            http,
        })
    }

    /// Appends `segments` to the base URL, percent-encoding each one. A vhost named `/` becomes
    /// `%2F`.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // The constructor rejects URLs that cannot be a base, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// GETs and decodes a resource, or returns [None] if the broker answers 404.
    fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        auth: &Credentials,
        what: &'static str,
    ) -> Result<Option<T>, GatewayError> {
        let url = self.url(segments);
        debug!("GET {} as {}", url.path(), auth.username);
        let path = url.path().to_owned();
        let response = self
            .http
            .get(url)
            .basic_auth(&auth.username, Some(&auth.password))
            .send()
            .map_err(|source| GatewayError::Transport {
                method: Method::GET.to_string(),
                path: path.clone(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(GatewayError::Status {
                method: Method::GET.to_string(),
                path,
                status: status.as_u16(),
                expected: "2xx",
            });
        }
        response
            .json()
            .map(Some)
            .map_err(|err| GatewayError::Decode {
                what,
                reason: err.to_string(),
            })
    }

    /// GETs a listing as the operator. Listings always exist, so 404 is an error.
    fn list<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        what: &'static str,
    ) -> Result<T, GatewayError> {
        self.get(segments, &self.operator, what)?
            .ok_or_else(|| GatewayError::Status {
                method: Method::GET.to_string(),
                path: self.url(segments).path().to_owned(),
                status: StatusCode::NOT_FOUND.as_u16(),
                expected: "2xx",
            })
    }

    /// Sends `body` as JSON and checks for a 2xx answer.
    fn send(
        &self,
        method: Method,
        segments: &[&str],
        auth: &Credentials,
        body: &impl Serialize,
    ) -> Result<(), GatewayError> {
        let url = self.url(segments);
        debug!("{method} {} as {}", url.path(), auth.username);
        let path = url.path().to_owned();
        let response = self
            .http
            .request(method.clone(), url)
            .basic_auth(&auth.username, Some(&auth.password))
            .json(body)
            .send()
            .map_err(|source| GatewayError::Transport {
                method: method.to_string(),
                path: path.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                method: method.to_string(),
                path,
                status: status.as_u16(),
                expected: "2xx",
            });
        }
        Ok(())
    }
}

impl Broker for ManagementClient {
    fn operator(&self) -> &Credentials {
        &self.operator
    }

    fn ping(&self) -> bool {
        match self.get::<serde_json::Value>(&["api", "overview"], &self.operator, "overview") {
            Ok(Some(_)) => true,
            Ok(None) => {
                debug!("Broker answered ping with 404");
                false
            }
            Err(err) => {
                debug!("Broker not ready: {err}");
                false
            }
        }
    }

    fn list_vhosts(&self) -> Result<IndexMap<String, VHost>, GatewayError> {
        self.list(&["api", "vhosts"], "vhosts").map(wire::vhosts)
    }

    fn list_users(&self) -> Result<IndexMap<String, User>, GatewayError> {
        self.list(&["api", "users"], "users").map(wire::users)
    }

    fn list_permissions(&self) -> Result<IndexMap<ScopedName, Permissions>, GatewayError> {
        self.list(&["api", "permissions"], "permissions")
            .map(wire::permissions)
    }

    fn get_exchange(
        &self,
        vhost: &str,
        name: &str,
        auth: &Credentials,
    ) -> Result<Option<Exchange>, GatewayError> {
        self.get(&["api", "exchanges", vhost, name], auth, "exchange")?
            .map(wire::exchange)
            .transpose()
    }

    fn get_queue(
        &self,
        vhost: &str,
        name: &str,
        auth: &Credentials,
    ) -> Result<Option<Queue>, GatewayError> {
        Ok(self
            .get(&["api", "queues", vhost, name], auth, "queue")?
            .map(wire::queue))
    }

    fn list_bindings(
        &self,
        vhost: &str,
        auth: &Credentials,
    ) -> Result<IndexMap<String, Vec<Binding>>, GatewayError> {
        match self.get(&["api", "bindings", vhost], auth, "bindings")? {
            Some(entries) => wire::bindings(entries),
            None => Ok(IndexMap::new()),
        }
    }

    fn create_vhost(&self, name: &str, vhost: &VHost) -> Result<(), GatewayError> {
        let body = wire::VHostBody {
            tracing: vhost.tracing,
        };
        self.send(Method::PUT, &["api", "vhosts", name], &self.operator, &body)
    }

    fn create_user(&self, name: &str, user: &User) -> Result<(), GatewayError> {
        let password = require(user.password.as_deref(), ResourceKind::User, name, "password")?;
        let body = wire::UserBody {
            password,
            tags: if user.admin { wire::ADMINISTRATOR } else { "" },
        };
        self.send(Method::PUT, &["api", "users", name], &self.operator, &body)
    }

    fn create_permissions(
        &self,
        name: &ScopedName,
        permissions: &Permissions,
    ) -> Result<(), GatewayError> {
        self.send(
            Method::PUT,
            &["api", "permissions", name.vhost.as_str(), name.name.as_str()],
            &self.operator,
            permissions,
        )
    }

    fn create_exchange(
        &self,
        name: &ScopedName,
        exchange: &Exchange,
        auth: &Credentials,
    ) -> Result<(), GatewayError> {
        let kind = require(exchange.kind.as_ref(), ResourceKind::Exchange, name, "type")?;
        let body = wire::ExchangeBody {
            kind: kind.as_str(),
            durable: exchange.durable,
            auto_delete: exchange.auto_delete,
            internal: exchange.internal,
            arguments: &exchange.arguments,
        };
        self.send(
            Method::PUT,
            &["api", "exchanges", name.vhost.as_str(), name.name.as_str()],
            auth,
            &body,
        )
    }

    fn create_queue(
        &self,
        name: &ScopedName,
        queue: &Queue,
        auth: &Credentials,
    ) -> Result<(), GatewayError> {
        let body = wire::QueueBody {
            durable: queue.durable,
            auto_delete: queue.auto_delete,
            arguments: &queue.arguments,
        };
        self.send(
            Method::PUT,
            &["api", "queues", name.vhost.as_str(), name.name.as_str()],
            auth,
            &body,
        )
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
        let destination_type = require(
            binding.destination_type.as_ref(),
            ResourceKind::Binding,
            exchange,
            "destination_type",
        )?;
        let body = wire::BindingBody {
            routing_key: &binding.routing_key,
            arguments: &binding.arguments,
        };
        self.send(
            Method::POST,
            &[
                "api",
                "bindings",
                exchange.vhost.as_str(),
                "e",
                exchange.name.as_str(),
                destination_type.path_segment(),
                destination,
            ],
            auth,
            &body,
        )
    }
}
