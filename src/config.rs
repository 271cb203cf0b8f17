//! TOML configuration for coverage filters and module discovery
//!
//! ```toml
//! [filters]
//! default_filters = true
//! coverage = ["+[*]*", "-[*.Tests]*"]
//! exclude_by_attribute = ["*ExcludeFromCodeCoverage*"]
//! exclude_by_file = ["*.generated.*"]
//!
//! [discovery]
//! max_concurrency = 4
//! search_paths = ["/usr/lib"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoverageConfig {
    pub filters: FilterConfig,
    pub discovery: DiscoveryConfig,
}

/// Filter rules, applied by [`FilterBuilder::from_config`](crate::filter::FilterBuilder::from_config)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Exclude platform runtime modules (default: true)
    pub default_filters: bool,
    /// Wildcard coverage rules, `<+|->[assembly]class`
    pub coverage: Vec<String>,
    /// Coverage rules whose segments are regular expressions
    pub regex_coverage: Vec<String>,
    pub exclude_by_attribute: Vec<String>,
    pub regex_exclude_by_attribute: Vec<String>,
    pub exclude_by_file: Vec<String>,
    pub regex_exclude_by_file: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            default_filters: true,
            coverage: Vec::new(),
            regex_coverage: Vec::new(),
            exclude_by_attribute: Vec::new(),
            regex_exclude_by_attribute: Vec::new(),
            exclude_by_file: Vec::new(),
            regex_exclude_by_file: Vec::new(),
        }
    }
}

/// Module discovery settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Maximum concurrent module reads (None = available parallelism - 1)
    pub max_concurrency: Option<usize>,
    /// Extra directories searched for referenced modules
    pub search_paths: Vec<PathBuf>,
}

impl CoverageConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not valid configuration.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;

        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: CoverageConfig =
            toml::from_str(content).context("Failed to parse TOML configuration")?;

        if config.discovery.max_concurrency == Some(0) {
            anyhow::bail!("Invalid value for discovery.max_concurrency: 0 (must be >= 1)");
        }

        Ok(config)
    }
}
