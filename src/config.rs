//! Startup configuration.
//!
//! Two layers, both read once by the binary before any processing:
//! 1. Required database credentials from the environment (`DB_HOST`,
//!    `DB_USER`, `DB_PASSWORD`, `DB_NAME`, optional `DB_PORT`), with a local
//!    `.env` honoured via `dotenv`.
//! 2. An optional TOML settings file (`LANDSLIDE_CONFIG`, default
//!    `landslide.toml`) for model calibration, run options, logging and
//!    extra places. A missing file means defaults.

use serde::Deserialize;
use std::path::Path;

use crate::clock::{DEFAULT_EXPIRY_HOURS, MAX_EXPIRY_HOURS};
use crate::ingest::rainfall::STUB_RAINFALL_MM;
use crate::logging::LogLevel;
use crate::model::ConfigError;
use crate::places::{Place, PlaceRegistry};
use crate::risk::LogisticModel;

pub const DEFAULT_SETTINGS_PATH: &str = "landslide.toml";
pub const SETTINGS_PATH_VAR: &str = "LANDSLIDE_CONFIG";
pub const DEFAULT_DB_PORT: u16 = 5432;

// ---------------------------------------------------------------------------
// Database credentials
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u16,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("port", &self.port)
            .finish()
    }
}

impl DbConfig {
    /// Reads credentials from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads credentials through `lookup`. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };

        let port = match lookup("DB_PORT").filter(|v| !v.is_empty()) {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidVar { name: "DB_PORT", value })?,
            None => DEFAULT_DB_PORT,
        };

        Ok(Self {
            host: required("DB_HOST")?,
            user: required("DB_USER")?,
            password: required("DB_PASSWORD")?,
            database: required("DB_NAME")?,
            port,
        })
    }
}

// ---------------------------------------------------------------------------
// Settings file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RainfallSourceKind {
    Fixed,
    Iem,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub expiry_hours: i64,
    pub rainfall_source: String,
    pub fixed_rainfall_mm: f64,
    /// ASOS station used under `iem` for places without their own.
    pub default_asos_station: Option<String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            expiry_hours: DEFAULT_EXPIRY_HOURS,
            rainfall_source: "fixed".to_string(),
            fixed_rainfall_mm: STUB_RAINFALL_MM,
            default_asos_station: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Contents of the settings file.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: LogisticModel,
    pub run: RunSettings,
    pub logging: LoggingSettings,
    pub places: Vec<Place>,
}

impl Settings {
    /// Parses and validates a settings file body.
    pub fn from_toml(text: &str, path: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values that would break the model or the stored records:
    /// the probability must rise with rainfall, depths must be real
    /// non-negative numbers, and every record must expire after it is taken.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &'static str, reason: String| -> Result<(), ConfigError> {
            Err(ConfigError::InvalidSetting { key, reason })
        };

        if !self.model.intercept.is_finite() {
            return invalid("model.intercept", format!("{} is not a finite number", self.model.intercept));
        }
        if !(self.model.coefficient.is_finite() && self.model.coefficient > 0.0) {
            return invalid(
                "model.coefficient",
                format!("{} must be a positive finite number", self.model.coefficient),
            );
        }
        if !(1..=MAX_EXPIRY_HOURS).contains(&self.run.expiry_hours) {
            return invalid(
                "run.expiry_hours",
                format!("{} is outside 1..={}", self.run.expiry_hours, MAX_EXPIRY_HOURS),
            );
        }
        if !(self.run.fixed_rainfall_mm.is_finite() && self.run.fixed_rainfall_mm >= 0.0) {
            return invalid(
                "run.fixed_rainfall_mm",
                format!("{} is not a non-negative number", self.run.fixed_rainfall_mm),
            );
        }

        // Unregistered places fall back to the default station, so IEM runs
        // always need one.
        if self.rainfall_source()? == RainfallSourceKind::Iem
            && self.default_asos_station().is_none()
        {
            return invalid(
                "run.default_asos_station",
                "required when rainfall_source = \"iem\"".to_string(),
            );
        }

        Ok(())
    }

    /// Loads `path`, or defaults if there is no such file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text, &display),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read { path: display, source }),
        }
    }

    pub fn rainfall_source(&self) -> Result<RainfallSourceKind, ConfigError> {
        match self.run.rainfall_source.to_ascii_lowercase().as_str() {
            "fixed" | "stub" => Ok(RainfallSourceKind::Fixed),
            "iem" => Ok(RainfallSourceKind::Iem),
            other => Err(ConfigError::UnknownRainfallSource(other.to_string())),
        }
    }

    /// The configured fallback station, ignoring blank values.
    pub fn default_asos_station(&self) -> Option<&str> {
        self.run
            .default_asos_station
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.logging.level).unwrap_or(LogLevel::Info)
    }

    pub fn registry(&self) -> PlaceRegistry {
        PlaceRegistry::with_overrides(self.places.clone())
    }
}

// ---------------------------------------------------------------------------
// Full configuration
// ---------------------------------------------------------------------------

/// Everything the harness hands to the evaluator.
#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub settings: Settings,
}

impl Config {
    /// Loads `.env`, the settings file and the database credentials.
    /// Fails before any processing if a credential is missing.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let settings = Settings::load(&settings_path())?;
        let db = DbConfig::from_env()?;
        Ok(Self { db, settings })
    }
}

/// Settings file location, from `LANDSLIDE_CONFIG` or the default.
pub fn settings_path() -> std::path::PathBuf {
    std::env::var(SETTINGS_PATH_VAR)
        .unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string())
        .into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
