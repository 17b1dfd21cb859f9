//! Server settings loaded via OrthoConfig from `LIFELINE_*` variables,
//! configuration files and command-line flags.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_MAIL_FROM: &str = "noreply@lifeline.local";
const DEFAULT_EXPIRY_SWEEP_SECS: u64 = 300;

#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(prefix = "LIFELINE")]
pub struct ServerSettings {
    /// Listen address, e.g. `127.0.0.1:8080`.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; without it the server keeps data in memory.
    pub database_url: Option<String>,
    /// Externally reachable origin used in verification links.
    pub public_base_url: Option<String>,
    /// Sender address for verification email.
    pub mail_from: Option<String>,
    /// Seconds between sweeps that expire overdue requests.
    #[ortho_config(default = 300)]
    pub expiry_sweep_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: None,
            database_url: None,
            public_base_url: None,
            mail_from: None,
            expiry_sweep_secs: DEFAULT_EXPIRY_SWEEP_SECS,
        }
    }
}

impl ServerSettings {
    /// Parsed listen address.
    pub fn bind_addr(&self) -> std::io::Result<SocketAddr> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|err| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid LIFELINE_BIND_ADDR '{raw}': {err}"),
            )
        })
    }

    /// Configured database URL, treating blank values as unset.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn public_base_url(&self) -> &str {
        self.public_base_url
            .as_deref()
            .unwrap_or(DEFAULT_PUBLIC_BASE_URL)
    }

    pub fn mail_from(&self) -> &str {
        self.mail_from.as_deref().unwrap_or(DEFAULT_MAIL_FROM)
    }

    /// Sweep period, never shorter than one second.
    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_sweep_secs.max(1))
    }
}
