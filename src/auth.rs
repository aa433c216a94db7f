//! Picks the identity that configures each exchange, queue, and binding.
//!
//! A broker user may only declare exchanges and queues whose names match its `configure`
//! permission on the vhost. Rather than doing everything as the operator, hutch configures each
//! resource as a user from the topology that is allowed to, so that the resource is created the
//! same way the application owning it would create it.

use crate::core::{Permissions, ScopedName, User};
use indexmap::IndexMap;
use regex::Regex;
use std::fmt::{self, Debug};
use tracing::debug;

/// A username and password for HTTP basic authentication against the broker.
///
/// [Debug] output never shows the password.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Finds credentials allowed to configure `resource` on `vhost`.
///
/// Walks `permissions` in order and returns the first entry that:
///
/// 1. has a `user@vhost` key whose vhost is `vhost`,
/// 2. has a `configure` pattern that matches all of `resource` (not just a substring), and
/// 3. names a user that is declared in `users`.
///
/// The password is the one declared in `users`, or empty if none is declared. The first match
/// wins even if a later entry has a more specific pattern.
///
/// Permissions for users that are not declared in `users` are passed over, because there is no
/// password to log in with. They are still applied as permissions.
///
/// Returns `default` if no entry qualifies.
pub fn resolve(
    users: &IndexMap<String, User>,
    permissions: &IndexMap<String, Permissions>,
    vhost: &str,
    resource: &str,
    default: &Credentials,
) -> Credentials {
    for (key, granted) in permissions {
        let Some(ScopedName { name: user, vhost: granted_vhost }) = ScopedName::parse(key) else {
            continue;
        };
        if granted_vhost != vhost {
            continue;
        }

        // Anchor the pattern so that it has to match the whole name, as the broker does.
        let pattern = match Regex::new(&format!("^(?:{})$", granted.configure)) {
            Ok(pattern) => pattern,
            Err(err) => {
                debug!("Ignoring permissions {key} for authentication: {err}");
                continue;
            }
        };
        if !pattern.is_match(resource) {
            continue;
        }

        if let Some(declared) = users.get(&user) {
            debug!("Configuring {resource}@{vhost} as user {user}");
            return Credentials::new(user, declared.password.clone().unwrap_or_default());
        }
    }
    default.clone()
}
