use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub debug_routes: bool,
}

impl Config {
    /// Read `MURMUR_*` variables, falling back to development defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("MURMUR_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("MURMUR_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("MURMUR_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let db_path = PathBuf::from(lookup("MURMUR_DB_PATH").unwrap_or_else(|| "murmur.db".into()));

        let jwt_secret = lookup("MURMUR_JWT_SECRET").unwrap_or_else(|| {
            warn!("MURMUR_JWT_SECRET not set, using the development secret");
            DEFAULT_JWT_SECRET.into()
        });

        let debug_routes = match lookup("MURMUR_DEBUG_ROUTES").as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => anyhow::bail!("MURMUR_DEBUG_ROUTES must be true or false, got '{}'", other),
        };

        Ok(Self {
            addr,
            db_path,
            jwt_secret,
            debug_routes,
        })
    }
}
