//! Runtime configuration from environment variables.

use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use tracing::warn;
use url::Url;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub addr: SocketAddr,
    /// Address participants open; invite links are built on top of it.
    pub public_url: String,
    /// Where notes are saved. `None` keeps them in memory only.
    pub persist_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Reads `PORT`, `PUBLIC_URL` and `PERSIST_PATH`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let public_url = match lookup("PUBLIC_URL") {
            Some(raw) if Url::parse(&raw).is_ok() => raw,
            Some(raw) => {
                warn!(%raw, "PUBLIC_URL is not a valid url, using default");
                DEFAULT_PUBLIC_URL.to_string()
            }
            None => DEFAULT_PUBLIC_URL.to_string(),
        };

        let persist_path = lookup("PERSIST_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            public_url,
            persist_path,
        }
    }
}
