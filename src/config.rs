// ⚙️ Configuration - environment driven
//
// Every setting has a development default so `catalog-admin seed` works
// out of the box in a fresh checkout. A `.env` file in the working
// directory is read first; real environment variables win over it.

use crate::attributes::DefaultPolicy;
use crate::error::{CatalogError, CatalogResult};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file (env: CATALOG_DB_PATH)
    pub database_path: PathBuf,
    /// Where uploaded images are written (env: CATALOG_UPLOAD_DIR)
    pub upload_dir: PathBuf,
    /// Prefix of the URIs handed back for stored images (env: CATALOG_UPLOAD_BASE_URL)
    pub upload_base_url: String,
    /// What a save does with attributes the user never touched (env: CATALOG_DEFAULT_POLICY)
    pub default_policy: DefaultPolicy,
    /// Log filter used when RUST_LOG is unset (env: CATALOG_LOG)
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from("catalog.db"),
            upload_dir: PathBuf::from("uploads"),
            upload_base_url: "/uploads".to_string(),
            default_policy: DefaultPolicy::LeaveAbsent,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load `.env` (if present) into the process environment, then read it
    pub fn load() -> CatalogResult<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(CatalogError::Validation(format!("invalid .env file: {}", err)));
            }
        }
        Self::from_env()
    }

    pub fn from_env() -> CatalogResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source (tests pass a closure over a map)
    pub fn from_lookup<F>(lookup: F) -> CatalogResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(path) = non_empty(lookup("CATALOG_DB_PATH")) {
            config.database_path = PathBuf::from(path);
        }
        if let Some(dir) = non_empty(lookup("CATALOG_UPLOAD_DIR")) {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(url) = non_empty(lookup("CATALOG_UPLOAD_BASE_URL")) {
            config.upload_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(policy) = non_empty(lookup("CATALOG_DEFAULT_POLICY")) {
            config.default_policy = policy.parse().map_err(|_| {
                CatalogError::Validation(format!(
                    "CATALOG_DEFAULT_POLICY must be `leave-absent` or `first-value`, got `{}`",
                    policy
                ))
            })?;
        }
        if let Some(filter) = non_empty(lookup("CATALOG_LOG")) {
            config.log_filter = filter;
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
