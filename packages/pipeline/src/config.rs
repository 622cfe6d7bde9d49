//! Runtime configuration for the search pipeline.
//!
//! Values come from an optional TOML file overlaid by environment
//! variables. The access token is resolved once, here, from (in order) a
//! runtime value, a session token file, and a value baked in at build
//! time.
//!
//! | Variable                      | Meaning                              |
//! |-------------------------------|--------------------------------------|
//! | `PARCEL_CONFIG`               | Path of the TOML file (`parcel.toml`) |
//! | `PARCEL_MODE`                 | `live` or `local`                    |
//! | `PARCEL_ARCGIS_TOKEN`         | Runtime access token                 |
//! | `PARCEL_SESSION_TOKEN_FILE`   | File holding a session token         |
//! | `PARCEL_SIMULATED_LATENCY_MS` | Synthetic source delay               |
//! | `PARCEL_HTTP_TIMEOUT_SECS`    | Per-request HTTP timeout             |

use std::path::{Path, PathBuf};
use std::time::Duration;

use parcel_boundary::fetchers::synthetic::DEFAULT_LATENCY;
use parcel_geocoder::http::redact_token;
use serde::Deserialize;
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "parcel.toml";

/// Default per-request HTTP timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Token compiled into the binary, if `PARCEL_ARCGIS_TOKEN` was set at
/// build time.
const BUILD_TIME_TOKEN: Option<&str> = option_env!("PARCEL_ARCGIS_TOKEN");

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading a config or token file failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`FileConfig`].
    #[error("Invalid config file {path}: {source}")]
    Toml {
        /// The offending file.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// An environment variable held an unusable value.
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Building the HTTP client failed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Where boundary data comes from.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Deployment {
    /// Live services, with synthetic data when they fail.
    #[default]
    Live,
    /// Synthetic data only. No network calls.
    Local,
}

/// Base-map tiles to draw under boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum TileSource {
    /// Esri World Imagery (needs a token).
    ArcGisImagery,
    /// `OpenStreetMap` standard tiles.
    OpenStreetMap,
}

impl TileSource {
    /// XYZ URL template for the tiles.
    #[must_use]
    pub const fn url_template(self) -> &'static str {
        match self {
            Self::ArcGisImagery => {
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
            }
            Self::OpenStreetMap => "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
        }
    }

    /// Attribution text the tiles must be shown with.
    #[must_use]
    pub const fn attribution(self) -> &'static str {
        match self {
            Self::ArcGisImagery => "Tiles &copy; Esri",
            Self::OpenStreetMap => "&copy; OpenStreetMap contributors",
        }
    }
}

/// Where the resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TokenOrigin {
    /// Command line, environment, or config file.
    Runtime,
    /// The session token file.
    SessionFile,
    /// Compiled into the binary.
    BuildTime,
}

/// Candidate token sources, highest priority first.
#[derive(Debug, Clone, Default)]
pub struct TokenSources {
    /// Value supplied at runtime.
    pub runtime: Option<String>,
    /// File holding a session token.
    pub session_file: Option<PathBuf>,
    /// Value compiled into the binary.
    pub build_time: Option<String>,
}

impl TokenSources {
    /// Picks the first non-blank token.
    ///
    /// A missing or unreadable session file is skipped with a warning.
    #[must_use]
    pub fn resolve(&self) -> Option<(String, TokenOrigin)> {
        fn usable(token: Option<&str>) -> Option<String> {
            token.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
        }

        if let Some(token) = usable(self.runtime.as_deref()) {
            return Some((token, TokenOrigin::Runtime));
        }

        if let Some(path) = &self.session_file {
            match std::fs::read_to_string(path) {
                Ok(contents) => {
                    if let Some(token) = usable(Some(&contents)) {
                        return Some((token, TokenOrigin::SessionFile));
                    }
                }
                Err(e) => log::warn!("Ignoring session token file {}: {e}", path.display()),
            }
        }

        usable(self.build_time.as_deref()).map(|t| (t, TokenOrigin::BuildTime))
    }
}

/// Settings accepted in the TOML config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// `live` or `local`.
    pub mode: Option<Deployment>,
    /// Access token.
    pub arcgis_token: Option<String>,
    /// File holding a session token.
    pub session_token_file: Option<PathBuf>,
    /// Synthetic source delay in milliseconds.
    pub simulated_latency_ms: Option<u64>,
    /// HTTP timeout in seconds.
    pub http_timeout_secs: Option<u64>,
    /// Override for the geocoder endpoint.
    pub geocode_url: Option<String>,
    /// Override for the parcel layer endpoint.
    pub parcel_url: Option<String>,
}

impl FileConfig {
    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::de::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fully resolved pipeline configuration.
#[derive(Clone)]
pub struct PipelineConfig {
    /// Live or local data.
    pub deployment: Deployment,
    /// Resolved access token.
    pub token: Option<String>,
    /// Where [`Self::token`] came from.
    pub token_origin: Option<TokenOrigin>,
    /// Delay applied by the synthetic source.
    pub simulated_latency: Duration,
    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
    /// Geocoder endpoint override.
    pub geocode_url: Option<String>,
    /// Parcel layer endpoint override.
    pub parcel_url: Option<String>,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("deployment", &self.deployment)
            .field("token", &self.token.as_deref().map(redact_token))
            .field("token_origin", &self.token_origin)
            .field("simulated_latency", &self.simulated_latency)
            .field("http_timeout", &self.http_timeout)
            .field("geocode_url", &self.geocode_url)
            .field("parcel_url", &self.parcel_url)
            .finish()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deployment: Deployment::Live,
            token: None,
            token_origin: None,
            simulated_latency: DEFAULT_LATENCY,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            geocode_url: None,
            parcel_url: None,
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue { name, value: v })
        })
        .transpose()
}

impl PipelineConfig {
    /// A synthetic-only configuration with no latency, for tests and demos.
    #[must_use]
    pub fn local() -> Self {
        Self {
            deployment: Deployment::Local,
            simulated_latency: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Loads configuration from the process environment and the config
    /// file it points at (`PARCEL_CONFIG`, else `parcel.toml` if present).
    ///
    /// `runtime_token` (e.g. a `--token` flag) wins over every other token
    /// source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file is unreadable or invalid,
    /// or an environment variable cannot be parsed.
    pub fn from_env(runtime_token: Option<String>) -> Result<Self, ConfigError> {
        let explicit = std::env::var("PARCEL_CONFIG").ok().map(PathBuf::from);
        let file = match explicit {
            Some(path) => Some(FileConfig::load(&path)?),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Some(FileConfig::load(default)?)
                } else {
                    None
                }
            }
        };

        Self::resolve(
            file.unwrap_or_default(),
            |name| std::env::var(name).ok(),
            runtime_token,
            BUILD_TIME_TOKEN.map(str::to_string),
        )
    }

    /// Builds a configuration from file settings and an environment
    /// lookup. Environment values override file values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable cannot be parsed.
    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
        runtime_token: Option<String>,
        build_time_token: Option<String>,
    ) -> Result<Self, ConfigError> {
        let deployment = parse_var::<Deployment>("PARCEL_MODE", env("PARCEL_MODE"))?
            .or(file.mode)
            .unwrap_or_default();
        let latency_ms = parse_var::<u64>(
            "PARCEL_SIMULATED_LATENCY_MS",
            env("PARCEL_SIMULATED_LATENCY_MS"),
        )?
        .or(file.simulated_latency_ms);
        let timeout_secs =
            parse_var::<u64>("PARCEL_HTTP_TIMEOUT_SECS", env("PARCEL_HTTP_TIMEOUT_SECS"))?
                .or(file.http_timeout_secs);

        let sources = TokenSources {
            runtime: runtime_token
                .or_else(|| env("PARCEL_ARCGIS_TOKEN"))
                .or(file.arcgis_token),
            session_file: env("PARCEL_SESSION_TOKEN_FILE")
                .map(PathBuf::from)
                .or(file.session_token_file),
            build_time: build_time_token,
        };
        let (token, token_origin) = sources.resolve().unzip();

        match (&token, token_origin) {
            (Some(token), Some(origin)) => {
                log::info!("Using ArcGIS token from {origin} ({})", redact_token(token));
            }
            _ => log::info!("No ArcGIS token configured, map tiles fall back to OpenStreetMap"),
        }

        Ok(Self {
            deployment,
            token,
            token_origin,
            simulated_latency: latency_ms.map_or(DEFAULT_LATENCY, Duration::from_millis),
            http_timeout: timeout_secs.map_or(DEFAULT_HTTP_TIMEOUT, Duration::from_secs),
            geocode_url: file.geocode_url,
            parcel_url: file.parcel_url,
        })
    }

    /// Tiles to use: imagery when a token is available.
    #[must_use]
    pub const fn tile_source(&self) -> TileSource {
        if self.token.is_some() {
            TileSource::ArcGisImagery
        } else {
            TileSource::OpenStreetMap
        }
    }

    /// Builds the shared HTTP client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Http`] if the TLS backend cannot be set up.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        Ok(reqwest::Client::builder()
            .timeout(self.http_timeout)
            .user_agent(concat!("parcel/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("parcel-config-{}-{name}", std::process::id()))
    }

    #[test]
    fn defaults_without_any_source() {
        let config = PipelineConfig::resolve(FileConfig::default(), env_from(&[]), None, None)
            .unwrap();
        assert_eq!(config.deployment, Deployment::Live);
        assert!(config.token.is_none());
        assert_eq!(config.simulated_latency, DEFAULT_LATENCY);
        assert_eq!(config.tile_source(), TileSource::OpenStreetMap);
    }

    #[test]
    fn env_overrides_file() {
        let file = FileConfig {
            mode: Some(Deployment::Live),
            simulated_latency_ms: Some(10),
            ..FileConfig::default()
        };
        let env = env_from(&[("PARCEL_MODE", "LOCAL"), ("PARCEL_SIMULATED_LATENCY_MS", "0")]);
        let config = PipelineConfig::resolve(file, env, None, None).unwrap();
        assert_eq!(config.deployment, Deployment::Local);
        assert_eq!(config.simulated_latency, Duration::ZERO);
    }

    #[test]
    fn rejects_bad_numbers() {
        let env = env_from(&[("PARCEL_HTTP_TIMEOUT_SECS", "soon")]);
        let err = PipelineConfig::resolve(FileConfig::default(), env, None, None).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "PARCEL_HTTP_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn runtime_token_beats_everything() {
        let env = env_from(&[("PARCEL_ARCGIS_TOKEN", "from-env")]);
        let config = PipelineConfig::resolve(
            FileConfig::default(),
            env,
            Some("from-flag".to_string()),
            Some("baked".to_string()),
        )
        .unwrap();
        assert_eq!(config.token.as_deref(), Some("from-flag"));
        assert_eq!(config.token_origin, Some(TokenOrigin::Runtime));
        assert_eq!(config.tile_source(), TileSource::ArcGisImagery);
    }

    #[test]
    fn session_file_beats_build_time() {
        let path = temp_path("session");
        std::fs::write(&path, "  session-token\n").unwrap();

        let sources = TokenSources {
            runtime: Some("   ".to_string()),
            session_file: Some(path.clone()),
            build_time: Some("baked".to_string()),
        };
        assert_eq!(
            sources.resolve(),
            Some(("session-token".to_string(), TokenOrigin::SessionFile))
        );

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_session_file_falls_through() {
        let sources = TokenSources {
            runtime: None,
            session_file: Some(temp_path("does-not-exist")),
            build_time: Some("baked".to_string()),
        };
        assert_eq!(
            sources.resolve(),
            Some(("baked".to_string(), TokenOrigin::BuildTime))
        );
    }

    #[test]
    fn debug_output_redacts_token() {
        let config = PipelineConfig {
            token: Some("super-secret".to_string()),
            ..PipelineConfig::default()
        };
        assert!(!format!("{config:?}").contains("super-secret"));
    }

    #[test]
    fn parses_config_file() {
        let path = temp_path("file.toml");
        std::fs::write(
            &path,
            "mode = \"local\"\nsimulated_latency_ms = 250\nparcel_url = \"https://example.test/query\"\n",
        )
        .unwrap();

        let file = FileConfig::load(&path).unwrap();
        assert_eq!(file.mode, Some(Deployment::Local));
        assert_eq!(file.simulated_latency_ms, Some(250));
        assert_eq!(file.parcel_url.as_deref(), Some("https://example.test/query"));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let path = temp_path("bad.toml");
        std::fs::write(&path, "colour = \"blue\"\n").unwrap();
        assert!(matches!(
            FileConfig::load(&path),
            Err(ConfigError::Toml { .. })
        ));
        std::fs::remove_file(path).ok();
    }
}
