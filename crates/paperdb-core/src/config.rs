//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`, `config.<env>.toml`,
//! the plain `DB_*`/`GCP_*` variables and `APP_*` variables (`__` nests keys).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    value::{Uncased, UncasedStr},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::Error;

/// Plain variable names used by existing deployments, mapped onto settings keys.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("DATABASE_URL", "database.url"),
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_NAME", "database.name"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("GCP_PROJECT_ID", "embedding.project"),
    ("GCP_REGION", "embedding.region"),
    ("GCP_ACCESS_TOKEN", "embedding.access_token"),
];

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub embedding: EmbeddingSettings,
    pub ingest: IngestSettings,
    pub search: SearchSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Full connection string; takes precedence over the discrete fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: Option<String>,
    pub schema: String,
    pub table: String,
    /// Create the vector extension and the paper table when missing.
    pub prepare_table: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            name: "postgres".to_string(),
            user: "postgres".to_string(),
            password: None,
            schema: "public".to_string(),
            table: "paper".to_string(),
            prepare_table: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub project: Option<String>,
    pub region: String,
    pub model: String,
    /// Overrides the `:predict` URL derived from project/region/model.
    pub endpoint: Option<String>,
    pub access_token: Option<String>,
    /// Requested output dimensionality; the model default applies when unset.
    pub dimensions: Option<usize>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            project: None,
            region: "us-central1".to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            endpoint: None,
            access_token: None,
            dimensions: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub dataset: String,
    /// Zero-based row to resume from.
    pub start_offset: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self { dataset: "papers_demo.csv".to_string(), start_offset: 0 }
    }
}

impl IngestSettings {
    pub fn dataset_path(&self) -> PathBuf {
        expand_path(&self.dataset)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { limit: 5 }
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Loads `.env`, then layers files and environment for the `RUST_ENV` environment.
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env is normal outside development.
        let _ = dotenvy::dotenv();
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> anyhow::Result<Self> {
        let mut figment =
            Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment
            .merge(Env::raw().filter_map(legacy_key))
            .merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Extracts and validates the typed settings tree.
    pub fn settings(&self) -> Result<Settings, Error> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if settings.database.table.trim().is_empty() {
            return Err(Error::InvalidConfig("database.table must not be empty".into()));
        }
        if settings.search.limit == 0 {
            return Err(Error::InvalidConfig("search.limit must be positive".into()));
        }
        if settings.embedding.dimensions == Some(0) {
            return Err(Error::InvalidConfig("embedding.dimensions must be positive".into()));
        }
        Ok(settings)
    }
}

fn legacy_key(key: &UncasedStr) -> Option<Uncased<'_>> {
    LEGACY_ENV_KEYS
        .iter()
        .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
        .map(|(_, path)| Uncased::from(*path))
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_path_resolves_env_vars() {
        std::env::set_var("PAPERDB_TEST_DATA_DIR", "/srv/data");
        let p = expand_path("$PAPERDB_TEST_DATA_DIR/papers.csv");
        assert_eq!(p, PathBuf::from("/srv/data/papers.csv"));
    }
}
