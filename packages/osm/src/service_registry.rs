//! Compile-time registry of upstream OpenStreetMap service configurations.
//!
//! Each service is defined in a TOML file under `services/`. The registry
//! embeds these at compile time and exposes them via [`all_services`],
//! [`enabled_services`], and the typed accessors [`nominatim`] and
//! [`overpass`].

use std::time::Duration;

use serde::Deserialize;

/// An upstream service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct OsmService {
    /// Unique identifier (e.g., `"nominatim"`, `"overpass"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service may be used.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// `User-Agent` header sent with every request. The public
    /// OpenStreetMap instances reject anonymous clients.
    pub user_agent: String,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Nominatim free-text search.
    Nominatim {
        /// Search endpoint (e.g., `"https://nominatim.openstreetmap.org/search"`).
        base_url: String,
        /// Maximum candidates requested per search.
        #[serde(default = "default_limit")]
        limit: u32,
    },
    /// Overpass QL interpreter.
    Overpass {
        /// Interpreter endpoint (e.g., `"https://overpass-api.de/api/interpreter"`).
        base_url: String,
        /// Server-side `[timeout:N]` for each query.
        #[serde(default = "default_query_timeout_secs")]
        query_timeout_secs: u64,
    },
}

const fn default_true() -> bool {
    true
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_limit() -> u32 {
    5
}

const fn default_query_timeout_secs() -> u64 {
    25
}

impl OsmService {
    /// Returns the provider's base URL regardless of variant.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Nominatim { base_url, .. }
            | ProviderConfig::Overpass { base_url, .. } => base_url,
        }
    }

    /// Replaces the provider's base URL.
    pub fn set_base_url(&mut self, url: impl Into<String>) {
        match &mut self.provider {
            ProviderConfig::Nominatim { base_url, .. }
            | ProviderConfig::Overpass { base_url, .. } => *base_url = url.into(),
        }
    }

    /// HTTP request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("nominatim", include_str!("../services/nominatim.toml")),
    ("overpass", include_str!("../services/overpass.toml")),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 2;

/// Returns all service configurations (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<OsmService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse OSM service '{name}': {e}"))
        })
        .collect()
}

/// Returns only enabled services.
#[must_use]
pub fn enabled_services() -> Vec<OsmService> {
    all_services().into_iter().filter(|s| s.enabled).collect()
}

/// Returns the Nominatim service configuration.
#[must_use]
pub fn nominatim() -> Option<OsmService> {
    enabled_services()
        .into_iter()
        .find(|s| matches!(s.provider, ProviderConfig::Nominatim { .. }))
}

/// Returns the Overpass service configuration.
#[must_use]
pub fn overpass() -> Option<OsmService> {
    enabled_services()
        .into_iter()
        .find(|s| matches!(s.provider, ProviderConfig::Overpass { .. }))
}
