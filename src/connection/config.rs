use serde::{Deserialize, Serialize};

use crate::core::{DbError, Result};
use crate::dialect::DialectKind;

/// Settings of a [`DbMap`](crate::DbMap).
///
/// Similar to a driver connection string, but only the parts the mapper
/// itself cares about: which SQL dialect to generate and how to log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// SQL dialect used to generate statements
    pub dialect: DialectKind,

    /// Log every statement sent to the driver
    pub trace_statements: bool,

    /// Prefix put in front of traced statements
    pub log_prefix: String,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            dialect: DialectKind::default(),
            trace_statements: false,
            log_prefix: "[sql]".to_string(),
        }
    }
}

impl MapperConfig {
    pub fn new(dialect: DialectKind) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Set the dialect
    pub fn dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    /// Enable statement tracing
    pub fn trace_statements(mut self, enabled: bool) -> Self {
        self.trace_statements = enabled;
        self
    }

    /// Set the prefix of traced statements
    pub fn log_prefix(mut self, prefix: &str) -> Self {
        self.log_prefix = prefix.to_string();
        self
    }

    /// Picks the dialect from a connection URL's scheme.
    ///
    /// # Examples
    ///
    /// ```
    /// use rustmapper::{DialectKind, MapperConfig};
    ///
    /// let config = MapperConfig::from_url("postgres://app@localhost/shop").unwrap();
    /// assert_eq!(config.dialect, DialectKind::Postgres);
    /// ```
    pub fn from_url(url: &str) -> Result<Self> {
        let (scheme, _) = url
            .split_once("://")
            .ok_or_else(|| DbError::Config(format!("URL '{}' has no scheme", url)))?;

        let dialect = scheme.parse::<DialectKind>().map_err(|_| {
            DbError::Config(format!("unsupported URL scheme '{}'", scheme))
        })?;

        Ok(Self::new(dialect))
    }
}
