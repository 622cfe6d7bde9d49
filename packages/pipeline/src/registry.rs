//! Compile-time registry of remote service configurations.
//!
//! Each service is defined in a TOML file under `services/`. The registry
//! embeds these at compile time and exposes them via [`all_services`] and
//! [`enabled_services`].

use serde::Deserialize;

/// A remote service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDefinition {
    /// Unique identifier (e.g., `"arcgis_world"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service may be used.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Selection order, lower first.
    pub priority: u32,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// `ArcGIS` `findAddressCandidates` geocoder.
    ArcgisGeocoder {
        /// Full `findAddressCandidates` URL.
        url: String,
        /// Candidates requested per query.
        #[serde(default = "default_max_locations")]
        max_locations: u32,
    },
    /// `ArcGIS` `FeatureServer` cadastral layer.
    ArcgisParcels {
        /// Layer `/query` URL.
        url: String,
    },
}

const fn default_true() -> bool {
    true
}

const fn default_max_locations() -> u32 {
    parcel_geocoder::arcgis::DEFAULT_MAX_LOCATIONS
}

impl ServiceDefinition {
    /// Returns the provider's endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        match &self.provider {
            ProviderConfig::ArcgisGeocoder { url, .. } | ProviderConfig::ArcgisParcels { url } => {
                url
            }
        }
    }
}

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("arcgis_world", include_str!("../services/arcgis_world.toml")),
    (
        "brisbane_parcels",
        include_str!("../services/brisbane_parcels.toml"),
    ),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 2;

/// Returns all service configurations (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML config is malformed (the configs are embedded, so
/// this surfaces in tests).
#[must_use]
pub fn all_services() -> Vec<ServiceDefinition> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse service config '{name}': {e}"))
        })
        .collect()
}

/// Returns only enabled services, sorted by priority (ascending).
#[must_use]
pub fn enabled_services() -> Vec<ServiceDefinition> {
    let mut services: Vec<ServiceDefinition> =
        all_services().into_iter().filter(|s| s.enabled).collect();
    services.sort_by_key(|s| s.priority);
    services
}

/// Returns the highest-priority enabled geocoder.
#[must_use]
pub fn geocoder_service() -> Option<ServiceDefinition> {
    enabled_services()
        .into_iter()
        .find(|s| matches!(s.provider, ProviderConfig::ArcgisGeocoder { .. }))
}

/// Returns the highest-priority enabled parcel layer.
#[must_use]
pub fn parcel_service() -> Option<ServiceDefinition> {
    enabled_services()
        .into_iter()
        .find(|s| matches!(s.provider, ProviderConfig::ArcgisParcels { .. }))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn loads_all_services() {
        assert_eq!(all_services().len(), EXPECTED_SERVICE_COUNT);
    }

    #[test]
    fn service_ids_are_unique() {
        let mut seen = BTreeSet::new();
        for svc in &all_services() {
            assert!(seen.insert(svc.id.clone()), "Duplicate service ID: {}", svc.id);
        }
    }

    #[test]
    fn all_services_have_required_fields() {
        for svc in &all_services() {
            assert!(!svc.id.is_empty(), "Service has empty id");
            assert!(!svc.name.is_empty(), "Service {} has empty name", svc.id);
            assert!(
                svc.url().starts_with("https://"),
                "Service {} has no https url",
                svc.id
            );
        }
    }

    #[test]
    fn enabled_services_sorted_by_priority() {
        let services = enabled_services();
        for window in services.windows(2) {
            assert!(
                window[0].priority <= window[1].priority,
                "Services not sorted by priority: {} ({}) > {} ({})",
                window[0].id,
                window[0].priority,
                window[1].id,
                window[1].priority
            );
        }
    }

    #[test]
    fn finds_one_service_of_each_kind() {
        let geocoder = geocoder_service().unwrap();
        assert!(geocoder.url().ends_with("findAddressCandidates"));
        let parcels = parcel_service().unwrap();
        assert!(parcels.url().ends_with("/query"));
    }
}
