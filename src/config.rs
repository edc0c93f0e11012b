use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;

const SECRET_KEY_FILE: &str = "secret_key.txt";

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
    pub session_secret: String,
    pub session_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// SQLite busy timeout, seconds.
    pub database_timeout_secs: u64,
    pub admin: AdminConfig,
}

impl AppConfig {
    /// Admin credentials are mandatory: the process refuses to start
    /// without externally supplied values.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:wedding_guests.db".into());
        let database_timeout_secs = std::env::var("DATABASE_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);
        let admin = AdminConfig {
            username: std::env::var("ADMIN_USERNAME")
                .map_err(|_| anyhow::anyhow!("ADMIN_USERNAME must be set"))?,
            password: std::env::var("ADMIN_PASSWORD")
                .map_err(|_| anyhow::anyhow!("ADMIN_PASSWORD must be set"))?,
            session_secret: match std::env::var("SESSION_SECRET") {
                Ok(s) => s,
                Err(_) => load_or_generate_secret()?,
            },
            session_ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 12),
        };
        Ok(Self {
            database_url,
            database_timeout_secs,
            admin,
        })
    }
}

/// Session signing secret persisted next to the database so restarts do not
/// invalidate admin sessions.
fn load_or_generate_secret() -> anyhow::Result<String> {
    match std::fs::read_to_string(SECRET_KEY_FILE) {
        Ok(key) => Ok(key.trim().to_string()),
        Err(_) => {
            let key: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(64)
                .map(char::from)
                .collect();
            std::fs::write(SECRET_KEY_FILE, &key)?;
            Ok(key)
        }
    }
}
