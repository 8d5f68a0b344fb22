use std::env;

pub const DEFAULT_CODE_LENGTH: usize = 8;

/// Runtime configuration, read once at startup.
///
/// Backend selection is driven entirely by which of these are set:
/// `DATABASE_URL` wins over `FILE_STORAGE_PATH`, and with neither set the
/// in-memory backend is used.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// sea-orm connection URL (`sqlite://...`, `postgres://...`, `mysql://...`)
    pub database_url: Option<String>,
    /// Path of the line-delimited JSON store
    pub file_storage_path: Option<String>,
    /// Length of generated short codes
    pub code_length: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let non_empty = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());

        AppConfig {
            database_url: non_empty("DATABASE_URL"),
            file_storage_path: non_empty("FILE_STORAGE_PATH"),
            code_length: non_empty("SHORT_CODE_LENGTH")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CODE_LENGTH),
        }
    }

    pub fn in_memory() -> Self {
        AppConfig {
            database_url: None,
            file_storage_path: None,
            code_length: DEFAULT_CODE_LENGTH,
        }
    }

    pub fn with_file_storage<T: Into<String>>(path: T) -> Self {
        AppConfig {
            file_storage_path: Some(path.into()),
            ..Self::in_memory()
        }
    }

    pub fn with_database<T: Into<String>>(url: T) -> Self {
        AppConfig {
            database_url: Some(url.into()),
            ..Self::in_memory()
        }
    }
}
