use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings, read once from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub chroma_host: String,
    pub chroma_port: u16,
    pub chroma_collection: String,
    pub chroma_tenant: String,
    pub chroma_database: String,
    pub chroma_timeout: Duration,
    /// Fallback season year, used only when the predictions file name carries none.
    /// When unset the calendar year is used instead.
    pub current_year: Option<i32>,
    pub cors_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            chroma_host: "localhost".to_string(),
            chroma_port: 8001,
            chroma_collection: "ncaa_teams".to_string(),
            chroma_tenant: "default_tenant".to_string(),
            chroma_database: "default_database".to_string(),
            chroma_timeout: Duration::from_secs(10),
            current_year: None,
            cors_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = env::var("CORS_ORIGINS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or(defaults.cors_origins);

        Self {
            data_dir: env::var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            chroma_host: env::var("CHROMA_HOST").unwrap_or(defaults.chroma_host),
            chroma_port: parse_var("CHROMA_PORT").unwrap_or(defaults.chroma_port),
            chroma_collection: env::var("CHROMA_COLLECTION").unwrap_or(defaults.chroma_collection),
            chroma_tenant: env::var("CHROMA_TENANT").unwrap_or(defaults.chroma_tenant),
            chroma_database: env::var("CHROMA_DATABASE").unwrap_or(defaults.chroma_database),
            chroma_timeout: parse_var::<u64>("CHROMA_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.chroma_timeout),
            current_year: parse_var("CURRENT_YEAR"),
            cors_origins,
        }
    }

    /// Directory holding the per-season prediction files.
    pub fn predictions_dir(&self) -> PathBuf {
        self.data_dir.join("predictions")
    }

    pub fn chroma_base_url(&self) -> String {
        format!("http://{}:{}", self.chroma_host, self.chroma_port)
    }
}

fn parse_var<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.predictions_dir(), PathBuf::from("data/predictions"));
        assert_eq!(settings.chroma_base_url(), "http://localhost:8001");
        assert_eq!(settings.chroma_collection, "ncaa_teams");
        assert!(settings.current_year.is_none());
    }
}
