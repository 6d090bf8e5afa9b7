use std::time::Duration;

use clap::Args;

use crate::cache::DEFAULT_EVICTION_THRESHOLD;
use crate::error::{CatalogError, Result};
use crate::professor::{MatchThresholds, DEFAULT_COURSE_MATCH_THRESHOLD, DEFAULT_NAME_MATCH_THRESHOLD};

/// Runtime tuning for the catalog. Every field can be set by flag or
/// environment variable.
#[derive(Debug, Clone, Args)]
pub struct CatalogConfig {
    #[arg(long, env = "CATALOG_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Upper bound on courses returned by a search.
    #[arg(long, env = "CATALOG_MAX_LIMIT", default_value_t = 100)]
    pub max_limit: usize,

    #[arg(long, env = "CATALOG_SEARCH_TTL_SECS", default_value_t = 300)]
    pub search_ttl_secs: u64,

    #[arg(long, env = "CATALOG_PROFESSOR_TTL_SECS", default_value_t = 600)]
    pub professor_ttl_secs: u64,

    #[arg(long, env = "CATALOG_SUBJECTS_TTL_SECS", default_value_t = 3600)]
    pub subjects_ttl_secs: u64,

    /// Entry count at which a write sweeps expired entries.
    #[arg(long, env = "CATALOG_CACHE_EVICTION_THRESHOLD", default_value_t = DEFAULT_EVICTION_THRESHOLD)]
    pub cache_eviction_threshold: usize,

    #[arg(long, env = "CATALOG_NAME_MATCH_THRESHOLD", default_value_t = DEFAULT_NAME_MATCH_THRESHOLD)]
    pub name_match_threshold: f64,

    #[arg(long, env = "CATALOG_COURSE_MATCH_THRESHOLD", default_value_t = DEFAULT_COURSE_MATCH_THRESHOLD)]
    pub course_match_threshold: f64,

    #[arg(long, env = "CATALOG_QUERY_TIMEOUT_SECS", default_value_t = 10)]
    pub query_timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            max_limit: 100,
            search_ttl_secs: 300,
            professor_ttl_secs: 600,
            subjects_ttl_secs: 3600,
            cache_eviction_threshold: DEFAULT_EVICTION_THRESHOLD,
            name_match_threshold: DEFAULT_NAME_MATCH_THRESHOLD,
            course_match_threshold: DEFAULT_COURSE_MATCH_THRESHOLD,
            query_timeout_secs: 10,
        }
    }
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_limit == 0 {
            return Err(CatalogError::InvalidInput("max_limit must be at least 1".to_string()));
        }
        if self.cache_eviction_threshold == 0 {
            return Err(CatalogError::InvalidInput(
                "cache_eviction_threshold must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("name_match_threshold", self.name_match_threshold),
            ("course_match_threshold", self.course_match_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CatalogError::InvalidInput(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }
        if self.query_timeout_secs == 0 {
            return Err(CatalogError::InvalidInput("query_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_secs)
    }

    pub fn professor_ttl(&self) -> Duration {
        Duration::from_secs(self.professor_ttl_secs)
    }

    pub fn subjects_ttl(&self) -> Duration {
        Duration::from_secs(self.subjects_ttl_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn thresholds(&self) -> MatchThresholds {
        MatchThresholds {
            by_name: self.name_match_threshold,
            by_course: self.course_match_threshold,
        }
    }
}
