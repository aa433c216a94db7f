//! Names of resources that live inside a virtual host.

use std::fmt::{self, Display};

/// The name of a resource scoped to a virtual host, e.g. an exchange, a queue, or a user's
/// permissions on a vhost.
///
/// Topology files encode these as `name@vhost`. That encoding is only a file format detail; the
/// rest of the crate works with the two parts directly.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopedName {
    /// The resource's own name. For permissions, this is the user name.
    pub name: String,

    /// The virtual host that contains the resource.
    pub vhost: String,
}

impl ScopedName {
    pub fn new(name: impl Into<String>, vhost: impl Into<String>) -> Self {
        ScopedName {
            name: name.into(),
            vhost: vhost.into(),
        }
    }

    /// Splits a `name@vhost` key into its parts.
    ///
    /// Both parts must be non-empty, and the key must contain exactly one `@`. Returns [None]
    /// for any other input.
    ///
    /// ```
    /// # use hutch::core::ScopedName;
    /// assert_eq!(
    ///     Some(ScopedName::new("orders", "shop")),
    ///     ScopedName::parse("orders@shop"),
    /// );
    /// assert_eq!(None, ScopedName::parse("orders"));
    /// assert_eq!(None, ScopedName::parse("orders@shop@eu"));
    /// ```
    pub fn parse(key: &str) -> Option<Self> {
        let (name, vhost) = key.split_once('@')?;
        if name.is_empty() || vhost.is_empty() || vhost.contains('@') {
            return None;
        }
        Some(ScopedName::new(name, vhost))
    }
}

impl Display for ScopedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.vhost)
    }
}
