use std::path::PathBuf;

use clap::{ArgAction, Parser};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::storage::RemoteBlobStore;

/// Command-line flags. Only flags that were actually given are serialized,
/// so they override the TOML file and environment without clobbering them
/// with defaults.
#[derive(Parser, Serialize, Deserialize, Clone, Debug, Default)]
#[command(name = "riley-server", version, about = "Riley upload server")]
pub struct Cli {
    /// Port to listen on
    #[arg(long, env = "RILEY_PORT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Bind address
    #[arg(long, env = "RILEY_BIND_ADDRESS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Data directory for the SQLite database and generated token secret
    #[arg(long, env = "RILEY_DATA_DIR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Enable structured JSON logging
    #[arg(long, action = ArgAction::SetTrue)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub json_logs: bool,

    /// Path to TOML config file
    #[arg(long, default_value = "./riley.toml")]
    #[serde(skip)]
    pub config: String,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    #[serde(skip)]
    pub generate_config: bool,
}

/// Immutable server configuration, loaded once at startup and shared
/// behind an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub data_dir: String,
    pub json_logs: bool,

    /// HMAC secret for bearer tokens. Empty means "load or generate one
    /// under data_dir".
    #[serde(default)]
    pub token_secret: String,

    /// Lifetime of issued tokens in hours (default: 24)
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,

    /// Maximum accepted upload payload in megabytes (default: 100)
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,

    /// Storage backend (loaded from [storage] section in TOML)
    #[serde(default)]
    pub storage: StorageConfig,

    /// Request rate limits (loaded from [rate_limit] section in TOML)
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Expired object purge (loaded from [retention] section in TOML)
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Storage backend selection. Exactly one variant is active; an unknown
/// `type` fails at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    Local {
        root: PathBuf,
    },
    RemoteBlob {
        account: String,
        container: String,
        access_key: String,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Local {
            root: PathBuf::from("./data/objects"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sustained requests per minute per subject on protected routes
    pub requests_per_minute: u32,
    pub burst: u32,
    /// Requests per minute per IP on signup/login
    pub auth_requests_per_minute: u32,
    pub auth_burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 120,
            burst: 30,
            auth_requests_per_minute: 5,
            auth_burst: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Interval in seconds between expired-object purges (default: 3600)
    pub cleanup_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: 3600,
        }
    }
}

fn default_token_ttl_hours() -> u64 {
    24
}

fn default_max_upload_size() -> u64 {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "0.0.0.0".to_string(),
            data_dir: "./data".to_string(),
            json_logs: false,
            token_secret: String::new(),
            token_ttl_hours: default_token_ttl_hours(),
            max_upload_size_mb: default_max_upload_size(),
            storage: StorageConfig::default(),
            rate_limit: RateLimitConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (RILEY_*) < CLI args
    pub fn load(cli: &Cli) -> Result<Self, figment::Error> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&cli.config))
            .merge(Env::prefixed("RILEY_").split("__"))
            .merge(Serialized::defaults(cli))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), figment::Error> {
        if let StorageConfig::RemoteBlob {
            account,
            container,
            access_key,
        } = &self.storage
        {
            if !RemoteBlobStore::new(account, container, access_key).has_credentials() {
                return Err(figment::Error::from(
                    "remote_blob storage requires account, container and access_key".to_string(),
                ));
            }
        }
        if self.max_upload_size_mb == 0 {
            return Err(figment::Error::from(
                "max_upload_size_mb must be greater than zero".to_string(),
            ));
        }
        if self.rate_limit.requests_per_minute == 0 || self.rate_limit.auth_requests_per_minute == 0 {
            return Err(figment::Error::from(
                "rate limits must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_size_mb as usize) * 1024 * 1024
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours as i64)
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Riley Server Configuration
# Place this file at ./riley.toml or specify with --config <path>
# All settings can be overridden via environment variables (RILEY_PORT,
# RILEY_STORAGE__TYPE, ...) or CLI flags (--port, ...)

# Server port (default: 8080)
# port = 8080

# Bind address (default: 0.0.0.0)
# bind_address = "0.0.0.0"

# Enable structured JSON logging
# json_logs = false

# Data directory for the SQLite database and generated token secret
# data_dir = "./data"

# HMAC secret for bearer tokens. Leave empty to generate one in data_dir.
# token_secret = ""

# Token lifetime in hours (default: 24)
# token_ttl_hours = 24

# Maximum upload size in megabytes (default: 100)
# max_upload_size_mb = 100

# ---- Storage backend ----
[storage]
type = "local"
root = "./data/objects"

# Remote blob store (client not bundled; operations report "not implemented")
# type = "remote_blob"
# account = ""
# container = ""
# access_key = ""

# ---- Rate limiting ----
# [rate_limit]
# requests_per_minute = 120     # per subject on protected routes
# burst = 30
# auth_requests_per_minute = 5  # per IP on /signup and /login
# auth_burst = 5

# ---- Retention ----
# [retention]
# cleanup_interval_secs = 3600
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|_jail| {
            let cli = Cli {
                config: "missing.toml".to_string(),
                ..Default::default()
            };
            let config = Config::load(&cli)?;
            assert_eq!(config.port, 8080);
            assert_eq!(config.token_ttl_hours, 24);
            assert_eq!(config.max_upload_bytes(), 100 * 1024 * 1024);
            assert!(matches!(config.storage, StorageConfig::Local { .. }));
            Ok(())
        });
    }

    #[test]
    fn test_toml_env_and_cli_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "riley.toml",
                r#"
                port = 9000
                data_dir = "/var/lib/riley"

                [storage]
                type = "remote_blob"
                account = "acct"
                container = "uploads"
                access_key = "k"
                "#,
            )?;
            jail.set_env("RILEY_DATA_DIR", "/srv/riley");
            jail.set_env("RILEY_RATE_LIMIT__BURST", "7");

            let cli = Cli {
                config: "riley.toml".to_string(),
                port: Some(9100),
                ..Default::default()
            };
            let config = Config::load(&cli)?;
            assert_eq!(config.port, 9100);
            assert_eq!(config.data_dir, "/srv/riley");
            assert_eq!(config.rate_limit.burst, 7);
            assert_eq!(
                config.storage,
                StorageConfig::RemoteBlob {
                    account: "acct".into(),
                    container: "uploads".into(),
                    access_key: "k".into(),
                }
            );
            Ok(())
        });
    }

    #[test]
    fn test_unknown_storage_type_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "riley.toml",
                r#"
                [storage]
                type = "tape"
                "#,
            )?;
            let cli = Cli {
                config: "riley.toml".to_string(),
                ..Default::default()
            };
            assert!(Config::load(&cli).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_remote_blob_requires_credentials() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "riley.toml",
                r#"
                [storage]
                type = "remote_blob"
                account = "acct"
                container = ""
                access_key = "k"
                "#,
            )?;
            let cli = Cli {
                config: "riley.toml".to_string(),
                ..Default::default()
            };
            assert!(Config::load(&cli).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_template_parses() {
        let parsed: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(&generate_config_template()))
            .extract()
            .unwrap();
        assert!(matches!(parsed.storage, StorageConfig::Local { .. }));
    }
}
