use crate::error::SyncError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_url: String,
    pub outbox_db_path: PathBuf,
    pub probe_interval: Duration,
    pub sync_interval: Duration,
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000/api".to_string(),
            outbox_db_path: PathBuf::from("offline-outbox.db"),
            probe_interval: Duration::from_secs(30),
            sync_interval: Duration::from_secs(60),
            http_timeout: Duration::from_secs(15),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, SyncError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            api_url: env::var("MESSENGER_API_URL").unwrap_or(defaults.api_url),
            outbox_db_path: env::var("OUTBOX_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.outbox_db_path),
            probe_interval: secs_or("CONNECTIVITY_PROBE_INTERVAL_SECS", defaults.probe_interval)?,
            sync_interval: secs_or("SYNC_INTERVAL_SECS", defaults.sync_interval)?,
            http_timeout: secs_or("HTTP_TIMEOUT_SECS", defaults.http_timeout)?,
        })
    }
}

fn secs_or(key: &str, default: Duration) -> Result<Duration, SyncError> {
    match env::var(key) {
        Ok(raw) => {
            let secs: u64 = raw
                .parse()
                .map_err(|_| SyncError::Config(format!("{key} must be a number of seconds")))?;
            if secs == 0 {
                return Err(SyncError::Config(format!("{key} must be greater than zero")));
            }
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(default),
    }
}
