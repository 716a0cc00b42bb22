use std::env;

use tracing::info;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5800";
const DEFAULT_DATABASE_URL: &str = "sqlite://blog.db?mode=rwc";
// Development fallback only; set SESSION_SECRET (64+ bytes) in production.
const DEV_SESSION_SECRET: &str =
    "secretabsecretabsecretabsecretabsecretabsecretabsecretabsecretab";

/// Runtime configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub database_url: String,
    pub session_secret: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            listen_addr: var_or("LISTEN_ADDR", DEFAULT_LISTEN_ADDR),
            database_url: var_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            session_secret: var_or("SESSION_SECRET", DEV_SESSION_SECRET),
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default");
        default.to_owned()
    })
}
