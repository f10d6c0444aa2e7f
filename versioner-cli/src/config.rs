use std::path::PathBuf;

/// Process-wide defaults, read from the environment and an optional `.env`
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let data_dir = std::env::var("VERSIONER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        Self {
            db_path: data_dir.join("settings.db"),
            data_dir,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".into()),
        }
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".project-versioner"))
        .unwrap_or_else(|_| PathBuf::from(".project-versioner"))
}
