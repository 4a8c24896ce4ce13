//! Environment variable overrides.
//!
//! Deployments configure the service through the environment as well as the
//! config file. Overrides are applied after loading and before validation:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `PORT` | HTTP listen port |
//! | `TEAMSPEAK_HOST` | SSH or ServerQuery host, or WebQuery base URL |
//! | `TEAMSPEAK_USERNAME` | SSH or ServerQuery login name |
//! | `TEAMSPEAK_PASSWORD` | SSH or ServerQuery password |
//! | `TEAMSPEAK_API_KEY` | WebQuery API key |
//! | `TEAMSPEAK_CACHE_TTL_MS` | Cache TTL in milliseconds |
//! | `TEAMSPEAK_CACHE_TTL` | Same, used when `TEAMSPEAK_CACHE_TTL_MS` is unset |

use super::source::SourceConfig;
use super::types::{Config, ConfigError};

impl Config {
    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides using `lookup` to read variables.
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(port) = lookup("PORT") {
            let port = parse("PORT", port)?;
            self.http.address.set_port(port);
        }

        let ttl = lookup("TEAMSPEAK_CACHE_TTL_MS")
            .map(|value| ("TEAMSPEAK_CACHE_TTL_MS", value))
            .or_else(|| lookup("TEAMSPEAK_CACHE_TTL").map(|value| ("TEAMSPEAK_CACHE_TTL", value)));
        if let Some((name, value)) = ttl {
            self.cache.ttl_ms = parse(name, value)?;
        }

        match &mut self.source {
            SourceConfig::Ssh(ssh) => {
                if let Some(host) = lookup("TEAMSPEAK_HOST") {
                    ssh.host = host;
                }
                if let Some(username) = lookup("TEAMSPEAK_USERNAME") {
                    ssh.username = username;
                }
                if let Some(password) = lookup("TEAMSPEAK_PASSWORD") {
                    ssh.password = password;
                }
            }
            SourceConfig::ServerQuery(sq) => {
                if let Some(host) = lookup("TEAMSPEAK_HOST") {
                    sq.host = host;
                }
                if let Some(username) = lookup("TEAMSPEAK_USERNAME") {
                    sq.username = username;
                }
                if let Some(password) = lookup("TEAMSPEAK_PASSWORD") {
                    sq.password = password;
                }
            }
            SourceConfig::WebQuery(wq) => {
                if let Some(host) = lookup("TEAMSPEAK_HOST") {
                    wq.base_url = host;
                }
                if let Some(api_key) = lookup("TEAMSPEAK_API_KEY") {
                    wq.api_key = api_key;
                }
            }
            SourceConfig::File(_) => {}
        }

        Ok(())
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}
