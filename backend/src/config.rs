use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::warn;

const DEFAULT_DATABASE_URL: &str = "sqlite:pet_tracker.db";
const DEFAULT_USER_ID: &str = "local-user";

/// Environment-driven runtime configuration.
///
/// `PET_TRACKER_USER_ID` stands in for the signed-in user: unset means the
/// default single local user, an explicitly empty value means signed out
/// (every pet query then scopes to nothing).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub report_dir: Option<PathBuf>,
    pub user_id: Option<String>,
    pub exact_alarms_enabled: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let database_url = env::var("PET_TRACKER_DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let default_addr = SocketAddr::from(([127, 0, 0, 1], 3000));
        let listen_addr = match env::var("PET_TRACKER_LISTEN_ADDR") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Ignoring unparsable PET_TRACKER_LISTEN_ADDR: {}", raw);
                default_addr
            }),
            Err(_) => default_addr,
        };

        let report_dir = env::var("PET_TRACKER_REPORT_DIR").ok().map(PathBuf::from);

        let user_id = match env::var("PET_TRACKER_USER_ID") {
            Ok(raw) if raw.is_empty() => None,
            Ok(raw) => Some(raw),
            Err(_) => Some(DEFAULT_USER_ID.to_string()),
        };

        let exact_alarms_enabled = env::var("PET_TRACKER_EXACT_ALARMS")
            .map(|raw| raw != "0" && !raw.eq_ignore_ascii_case("false"))
            .unwrap_or(true);

        Self {
            database_url,
            listen_addr,
            report_dir,
            user_id,
            exact_alarms_enabled,
        }
    }

    /// Where rendered reports land: the configured directory, else the
    /// user's Documents folder, else home, else the working directory.
    pub fn report_output_dir(&self) -> PathBuf {
        self.report_dir
            .clone()
            .or_else(dirs::document_dir)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_report_dir_wins() {
        let config = Config {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            report_dir: Some(PathBuf::from("/tmp/reports")),
            user_id: None,
            exact_alarms_enabled: true,
        };
        assert_eq!(config.report_output_dir(), PathBuf::from("/tmp/reports"));
    }
}
