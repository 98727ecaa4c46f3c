//! Repository options
//!
//! Options describe how contexts are built: which store, whether query results
//! are cached, which interceptors run and how unsupported transactions are
//! treated. They come from `RepositoryOptionsBuilder` or the environment:
//!
//! | variable | meaning |
//! |---|---|
//! | `REPOKIT_STORE` | `memory` (default), `json`, `xml` or `csv` |
//! | `REPOKIT_STORE_PATH` | directory of a file store (required for files) |
//! | `REPOKIT_DATABASE_NAME` | in-memory database name (default `repokit`) |
//! | `REPOKIT_IGNORE_TRANSACTION_WARNING` | `true` to allow emulated transactions |
//! | `REPOKIT_CACHE_TTL_SECS` | enables a memory query cache with this TTL |

use repokit_cache::{CacheConfig, CacheProvider, MemoryCacheProvider};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ModelError, ModelResult};
use crate::interceptor::RepositoryInterceptor;
use crate::store::FileFormat;

pub const DEFAULT_DATABASE_NAME: &str = "repokit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOptions {
    InMemory { database_name: String },
    File { root: PathBuf, format: FileFormat },
}

impl StoreOptions {
    pub fn describe(&self) -> String {
        match self {
            StoreOptions::InMemory { database_name } => format!("memory:{}", database_name),
            StoreOptions::File { root, format } => format!("{}:{}", format, root.display()),
        }
    }
}

#[derive(Clone, Default)]
pub struct RepositoryOptions {
    pub store: Option<StoreOptions>,
    pub cache_provider: Option<Arc<dyn CacheProvider>>,
    pub cache_expiration: Option<Duration>,
    pub interceptors: Vec<Arc<dyn RepositoryInterceptor>>,
    pub ignore_transaction_warning: bool,
}

impl RepositoryOptions {
    pub fn builder() -> RepositoryOptionsBuilder {
        RepositoryOptionsBuilder::default()
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    pub fn validate(&self) -> ModelResult<()> {
        match &self.store {
            None => {
                return Err(ModelError::Configuration(
                    "no store configured; use an in-memory or file database".to_string(),
                ))
            }
            Some(StoreOptions::InMemory { database_name }) if database_name.trim().is_empty() => {
                return Err(ModelError::Configuration(
                    "in-memory database name must not be empty".to_string(),
                ))
            }
            Some(StoreOptions::File { root, .. }) if root.as_os_str().is_empty() => {
                return Err(ModelError::Configuration(
                    "file store path must not be empty".to_string(),
                ))
            }
            Some(_) => {}
        }

        if self.cache_expiration == Some(Duration::ZERO) {
            return Err(ModelError::Configuration(
                "cache expiration must be greater than zero".to_string(),
            ));
        }
        if self.cache_expiration.is_some() && self.cache_provider.is_none() {
            return Err(ModelError::Configuration(
                "cache expiration is set but no cache provider is configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Load options from `REPOKIT_*` environment variables
    pub fn from_env() -> ModelResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load options through `lookup`, which maps variable names to values
    pub fn from_lookup<F>(lookup: F) -> ModelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        let store = lookup("REPOKIT_STORE").unwrap_or_else(|| "memory".to_string());
        builder = match store.to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => {
                let name = lookup("REPOKIT_DATABASE_NAME")
                    .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string());
                builder.use_in_memory_database(&name)
            }
            other => {
                let format: FileFormat = other.parse().map_err(|_| {
                    ModelError::Configuration(format!(
                        "REPOKIT_STORE must be memory, json, xml or csv, got '{}'",
                        store
                    ))
                })?;
                let root = lookup("REPOKIT_STORE_PATH").ok_or_else(|| {
                    ModelError::Configuration(format!(
                        "REPOKIT_STORE_PATH is required for {} stores",
                        format
                    ))
                })?;
                builder.use_file_database(root, format)
            }
        };

        if let Some(flag) = lookup("REPOKIT_IGNORE_TRANSACTION_WARNING") {
            let ignore = parse_flag("REPOKIT_IGNORE_TRANSACTION_WARNING", &flag)?;
            builder = builder.ignore_transaction_warning(ignore);
        }

        if let Some(ttl) = lookup("REPOKIT_CACHE_TTL_SECS") {
            let secs: u64 = ttl.trim().parse().map_err(|_| {
                ModelError::Configuration(format!(
                    "REPOKIT_CACHE_TTL_SECS must be a number of seconds, got '{}'",
                    ttl
                ))
            })?;
            let ttl = Duration::from_secs(secs);
            let config = CacheConfig::builder().default_ttl_duration(ttl).build_config();
            let provider = MemoryCacheProvider::new(config);
            builder = builder
                .use_cache_provider(Arc::new(provider))
                .cache_expiration(ttl);
        }

        let options = builder.build();
        options.validate()?;
        Ok(options)
    }
}

fn parse_flag(name: &str, value: &str) -> ModelResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ModelError::Configuration(format!(
            "{} must be true or false, got '{}'",
            name, value
        ))),
    }
}

impl std::fmt::Debug for RepositoryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryOptions")
            .field("store", &self.store)
            .field("cache_provider", &self.cache_provider.is_some())
            .field("cache_expiration", &self.cache_expiration)
            .field("interceptors", &self.interceptors.len())
            .field("ignore_transaction_warning", &self.ignore_transaction_warning)
            .finish()
    }
}

/// Builder for `RepositoryOptions`
#[derive(Default)]
pub struct RepositoryOptionsBuilder {
    options: RepositoryOptions,
}

impl RepositoryOptionsBuilder {
    pub fn use_in_memory_database(mut self, database_name: &str) -> Self {
        self.options.store = Some(StoreOptions::InMemory {
            database_name: database_name.to_string(),
        });
        self
    }

    pub fn use_file_database(mut self, root: impl Into<PathBuf>, format: FileFormat) -> Self {
        self.options.store = Some(StoreOptions::File {
            root: root.into(),
            format,
        });
        self
    }

    pub fn use_json_database(self, root: impl Into<PathBuf>) -> Self {
        self.use_file_database(root, FileFormat::Json)
    }

    pub fn use_xml_database(self, root: impl Into<PathBuf>) -> Self {
        self.use_file_database(root, FileFormat::Xml)
    }

    pub fn use_csv_database(self, root: impl Into<PathBuf>) -> Self {
        self.use_file_database(root, FileFormat::Csv)
    }

    pub fn use_cache_provider(mut self, provider: Arc<dyn CacheProvider>) -> Self {
        self.options.cache_provider = Some(provider);
        self
    }

    /// TTL of cached query results
    pub fn cache_expiration(mut self, expiration: Duration) -> Self {
        self.options.cache_expiration = Some(expiration);
        self
    }

    pub fn use_interceptor(mut self, interceptor: Arc<dyn RepositoryInterceptor>) -> Self {
        self.options.interceptors.push(interceptor);
        self
    }

    pub fn ignore_transaction_warning(mut self, ignore: bool) -> Self {
        self.options.ignore_transaction_warning = ignore;
        self
    }

    pub fn build(self) -> RepositoryOptions {
        self.options
    }
}
