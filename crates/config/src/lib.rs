//! Configuration loading and validation.
//!
//! Settings are layered with figment: built-in defaults, then an optional
//! file (TOML, YAML or JSON, picked by extension), then `CASTDEX_*`
//! environment variables.
//!
//! ```toml
//! feeds = ["https://example.com/feed.xml"]
//! update_interval = 43200
//! browse_order = "asc"
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const ENV_PREFIX: &str = "CASTDEX_";
/// Refreshing more often than this is just rude to the feed hosts.
pub const MIN_UPDATE_INTERVAL: u64 = 3600;
pub const DATABASE_FILE: &str = "feeds.db";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "castdex")
}

/// Direction in which episodes are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Oldest first.
    #[display("asc")]
    Asc,
    /// Newest first.
    #[display("desc")]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed URLs to subscribe to, in addition to the ones found in OPML
    /// files in `import_dir`.
    pub feeds: Vec<String>,
    /// Directory scanned for `.opml` subscription lists.
    pub import_dir: Option<PathBuf>,
    /// Directory holding the index database.
    pub data_dir: Option<PathBuf>,
    /// Seconds between background refreshes.
    pub update_interval: u64,
    pub browse_order: Order,
    pub lookup_order: Order,
    /// Maximum number of search results, unlimited when unset.
    pub search_limit: Option<u64>,
    /// Maximum number of parsed feeds kept in memory.
    pub cache_size: usize,
    /// Seconds a parsed feed is kept in memory.
    pub cache_ttl: u64,
    /// Seconds a caller-triggered fetch may take, unlimited when unset.
    pub timeout: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        let dirs = project_dirs();
        Self {
            feeds: Vec::new(),
            import_dir: dirs.as_ref().map(|d| d.config_dir().to_path_buf()),
            data_dir: dirs.as_ref().map(|d| d.data_dir().to_path_buf()),
            update_interval: 86400,
            browse_order: Order::Desc,
            lookup_order: Order::Asc,
            search_limit: None,
            cache_size: 64,
            cache_ttl: 86400,
            timeout: Some(10),
        }
    }
}

impl Config {
    /// Location of the configuration file used when none is given explicitly.
    pub fn default_file() -> Option<PathBuf> {
        project_dirs().map(|d| d.config_dir().join("castdex.toml"))
    }

    /// The layered configuration sources, before extraction.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load and validate the configuration.
    ///
    /// An explicitly given file must exist.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        if let Some(path) = file
            && !path.is_file()
        {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let config: Config = Self::figment(file)?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(feeds = config.feeds.len(), interval = config.update_interval, "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(feed) = self.feeds.iter().find(|feed| Url::parse(feed).is_err()) {
            tracing::error!(feed = feed.as_str(), "feed is not an absolute URL");
            exn::bail!(ErrorKind::Invalid("feeds"));
        }
        if self.update_interval < MIN_UPDATE_INTERVAL {
            exn::bail!(ErrorKind::Invalid("update_interval"));
        }
        if self.cache_size < 1 {
            exn::bail!(ErrorKind::Invalid("cache_size"));
        }
        if self.cache_ttl < 1 {
            exn::bail!(ErrorKind::Invalid("cache_ttl"));
        }
        if self.search_limit == Some(0) {
            exn::bail!(ErrorKind::Invalid("search_limit"));
        }
        if self.timeout == Some(0) {
            exn::bail!(ErrorKind::Invalid("timeout"));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.update_interval)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    /// Path of the index database.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.join(DATABASE_FILE)),
            None => exn::bail!(ErrorKind::Invalid("data_dir")),
        }
    }
}
