//! Settings for one run, taken from the command line or the environment.

use crate::auth::Credentials;
use crate::error::GatewayError;
use crate::gateway::http::DEFAULT_TIMEOUT;
use crate::gateway::ManagementClient;
use clap::Args;
use std::fmt::{self, Debug};
use std::path::PathBuf;
use std::time::Duration;

/// Where the broker is, who to log in as, and which topology to reconcile.
///
/// Every option can also be set through the environment variable named in its help text.
#[derive(Clone, Args)]
pub struct Settings {
    /// Base URL of the broker's management API, e.g. http://localhost:15672
    #[arg(short, long, env = "HUTCH_BROKER")]
    pub broker: String,

    /// User to connect as when no user from the topology applies
    #[arg(short, long, env = "HUTCH_USER")]
    pub user: String,

    /// Password for --user
    #[arg(short, long, env = "HUTCH_PASS", hide_env_values = true)]
    pub pass: String,

    /// Topology file to reconcile
    #[arg(short, long, env = "HUTCH_CONFIG")]
    pub config: PathBuf,

    /// Seconds to wait for the broker to come up before starting; 0 does not wait
    #[arg(short, long, env = "HUTCH_WAIT", default_value_t = 0)]
    pub wait: u64,

    /// Seconds before a single request to the broker is abandoned
    #[arg(long, env = "HUTCH_TIMEOUT", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,
}

impl Settings {
    /// The operator's credentials.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.user, &self.pass)
    }

    /// How long to wait for the broker, or [None] to start right away.
    pub fn wait(&self) -> Option<Duration> {
        match self.wait {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Builds a client for the configured broker. Fails if the broker URL is unusable.
    pub fn client(&self) -> Result<ManagementClient, GatewayError> {
        ManagementClient::with_timeout(&self.broker, self.credentials(), self.timeout())
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("broker", &self.broker)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("config", &self.config)
            .field("wait", &self.wait)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        settings: Settings,
    }

    fn parse(args: &[&str]) -> Result<Settings, clap::Error> {
        Cli::try_parse_from(std::iter::once("hutch").chain(args.iter().copied()))
            .map(|cli| cli.settings)
    }

    #[test]
    fn works() {
        let settings = parse(&[
            "-b",
            "http://localhost:15672",
            "-u",
            "guest",
            "-p",
            "secret",
            "-c",
            "topology.yaml",
            "-w",
            "10",
        ])
        .unwrap();

        assert_eq!("http://localhost:15672", settings.broker);
        assert_eq!(Credentials::new("guest", "secret"), settings.credentials());
        assert_eq!(PathBuf::from("topology.yaml"), settings.config);
        assert_eq!(Some(Duration::from_secs(10)), settings.wait());
        assert_eq!(DEFAULT_TIMEOUT, settings.timeout());
    }

    #[test]
    fn long_flags_work() {
        let settings = parse(&[
            "--broker=http://rabbit:15672",
            "--user=admin",
            "--pass=pw",
            "--config=t.yaml",
            "--timeout=5",
        ])
        .unwrap();

        assert_eq!(None, settings.wait());
        assert_eq!(Duration::from_secs(5), settings.timeout());
    }

    #[test]
    fn debug_redacts_password() {
        let settings = parse(&["-b", "http://x", "-u", "u", "-p", "hunter2", "-c", "t.yaml"])
            .unwrap();
        let debug = format!("{settings:?}");
        assert!(!debug.contains("hunter2"), "{debug}");
    }

    #[test]
    fn client_rejects_bad_broker_url() {
        let settings = parse(&["-b", "localhost", "-u", "u", "-p", "p", "-c", "t.yaml"]).unwrap();
        assert!(matches!(
            settings.client(),
            Err(GatewayError::InvalidUrl { .. }),
        ));
    }
}
