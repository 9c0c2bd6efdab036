use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Where session records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SessionBackend {
    /// `sessions` table, shared across restarts and instances
    Postgres,
    /// Process memory; sessions are lost on restart
    Memory,
}

/// Command-line flags, each with an environment fallback.
#[derive(Debug, Clone, Parser)]
#[command(name = "snipbox", version, about = "Share short text snippets")]
pub struct Config {
    /// HTTP network address
    #[arg(long, env = "SNIPBOX_ADDR", default_value = "0.0.0.0:4000")]
    pub addr: String,

    /// Path to static assets
    #[arg(long, env = "SNIPBOX_STATIC_DIR", default_value = "./ui/static")]
    pub static_dir: PathBuf,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Include error details in 500 responses
    #[arg(long, env = "SNIPBOX_DEBUG")]
    pub debug: bool,

    #[arg(long, env = "SNIPBOX_SESSION_LIFETIME_HOURS", default_value_t = 12)]
    pub session_lifetime_hours: u32,

    /// Session storage backend
    #[arg(
        long,
        env = "SNIPBOX_SESSION_STORE",
        value_enum,
        default_value_t = SessionBackend::Postgres
    )]
    pub session_store: SessionBackend,

    /// Mark the session cookie `Secure` (serve behind TLS)
    #[arg(long, env = "SNIPBOX_SECURE_COOKIES")]
    pub secure_cookies: bool,

    #[arg(long, env = "SNIPBOX_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["snipbox", "--database-url", "postgres://x"]).unwrap();
        assert_eq!(config.addr, "0.0.0.0:4000");
        assert_eq!(config.static_dir, PathBuf::from("./ui/static"));
        assert_eq!(config.session_lifetime_hours, 12);
        assert_eq!(config.request_timeout_secs, 10);
        assert!(!config.debug);
        assert!(!config.secure_cookies);
        assert_eq!(config.session_store, SessionBackend::Postgres);
    }

    #[test]
    fn test_session_store_choice() {
        let config = Config::try_parse_from([
            "snipbox",
            "--database-url",
            "postgres://x",
            "--session-store",
            "memory",
        ])
        .unwrap();
        assert_eq!(config.session_store, SessionBackend::Memory);

        let err = Config::try_parse_from([
            "snipbox",
            "--database-url",
            "postgres://x",
            "--session-store",
            "redis",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::try_parse_from([
            "snipbox",
            "--database-url",
            "postgres://x",
            "--addr",
            "127.0.0.1:8080",
            "--debug",
            "--session-lifetime-hours",
            "1",
        ])
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:8080");
        assert!(config.debug);
        assert_eq!(config.session_lifetime_hours, 1);
    }
}
