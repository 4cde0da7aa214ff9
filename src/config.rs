//! Application-level configuration loading: scoring, admin credential and data location.

use std::{collections::BTreeMap, env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::quiz::LifelineKind;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZZER_CONFIG_PATH";

const MAX_POINTS_ENV: &str = "MAX_POINTS_PER_QUESTION";
const ADMIN_SECRET_ENV: &str = "ADMIN_SECRET";
const DATA_DIR_ENV: &str = "QUIZ_DATA_DIR";

const DEFAULT_MAX_POINTS: u32 = 1000;
const DEFAULT_ADMIN_SECRET: &str = "changeme";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_SESSION: &str = "GLOBAL";

#[derive(Debug, Clone, PartialEq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Points awarded for an instant correct answer.
    pub max_points_per_question: u32,
    /// Shared secret expected in the `x-admin-token` header.
    pub admin_secret: String,
    /// Root of the on-disk persistence tree.
    pub data_dir: PathBuf,
    /// Session used when a request does not name one.
    pub default_session: String,
    /// Lifeline types known to this deployment.
    pub lifeline_types: Vec<LifelineKind>,
}

impl AppConfig {
    /// Quiz-wide lifeline switches for a new session: only configured types start enabled.
    pub fn default_lifelines_enabled(&self) -> BTreeMap<LifelineKind, bool> {
        LifelineKind::ALL
            .into_iter()
            .map(|kind| (kind, self.lifeline_types.contains(&kind)))
            .collect()
    }

    /// Load the configuration from disk then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::load_file();
        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    fn load_file() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        default_session = %app_config.default_session,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Apply environment overrides fetched through `lookup`. Blank or unparsable values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(raw) = lookup(MAX_POINTS_ENV) {
            match raw.trim().parse::<u32>() {
                Ok(points) => self.max_points_per_question = points,
                Err(err) => warn!(value = %raw, error = %err, "ignoring invalid {MAX_POINTS_ENV}"),
            }
        }
        if let Some(secret) = lookup(ADMIN_SECRET_ENV) {
            self.admin_secret = secret;
        }
        if let Some(dir) = lookup(DATA_DIR_ENV) {
            self.data_dir = PathBuf::from(dir);
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_points_per_question: DEFAULT_MAX_POINTS,
            admin_secret: DEFAULT_ADMIN_SECRET.into(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            default_session: DEFAULT_SESSION.into(),
            lifeline_types: LifelineKind::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    max_points_per_question: Option<u32>,
    admin_secret: Option<String>,
    data_dir: Option<PathBuf>,
    default_session: Option<String>,
    lifeline_types: Option<Vec<String>>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        let lifeline_types = value
            .lifeline_types
            .map(|names| {
                names
                    .iter()
                    .filter_map(|name| LifelineKind::parse(name))
                    .collect::<Vec<_>>()
            })
            .unwrap_or(defaults.lifeline_types);
        Self {
            max_points_per_question: value
                .max_points_per_question
                .unwrap_or(defaults.max_points_per_question),
            admin_secret: value
                .admin_secret
                .filter(|secret| !secret.is_empty())
                .unwrap_or(defaults.admin_secret),
            data_dir: value.data_dir.unwrap_or(defaults.data_dir),
            default_session: value
                .default_session
                .map(|code| code.trim().to_uppercase())
                .filter(|code| !code.is_empty())
                .unwrap_or(defaults.default_session),
            lifeline_types,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
