//! Layered configuration: built-in defaults, `config.json` in the data
//! directory, then `CODEMASTER_*` environment overrides.
//!
//! API keys never live in the persisted record; they are read from the
//! process environment (optionally populated from `.env`).

use crate::error::{CodeMasterError, Result};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

pub const DATA_DIR_ENV: &str = "CODEMASTER_HOME";
pub const ENV_PREFIX: &str = "CODEMASTER_";
pub const CONFIG_FILE: &str = "config.json";
pub const MAX_RECENT_PROJECTS: usize = 10;

pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const WEATHER_KEY_ENV: &str = "WEATHER_API_KEY";
pub const FONTS_KEY_ENV: &str = "GOOGLE_FONTS_API_KEY";

/// Filesystem layout of the local data directory.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// `explicit` wins, then `~/.codemaster_pro`.
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        let root = explicit.unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".codemaster_pro")
        });
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join("database").join("codemaster.db")
    }

    pub fn fonts_dir(&self) -> PathBuf {
        self.root.join("fonts")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Create the directory tree if it is missing.
    pub fn ensure(&self) -> Result<()> {
        for dir in [
            self.root.clone(),
            self.root.join("database"),
            self.fonts_dir(),
            self.logs_dir(),
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Delete all local state. Missing directories are not an error.
    pub fn wipe(&self) -> Result<bool> {
        if !self.root.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&self.root)?;
        info!(path = %self.root.display(), "local data directory removed");
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderChoice {
    #[default]
    Auto,
    OpenAi,
    Anthropic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiEndpoints {
    pub weather: Url,
    pub geo: Url,
    pub fonts: Url,
    pub openai: Url,
    pub anthropic: Url,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            weather: static_url("https://api.openweathermap.org/data/2.5"),
            geo: static_url("https://api.openweathermap.org/geo/1.0"),
            fonts: static_url("https://www.googleapis.com/webfonts/v1"),
            openai: static_url("https://api.openai.com/v1"),
            anthropic: static_url("https://api.anthropic.com/v1"),
        }
    }
}

fn static_url(s: &str) -> Url {
    match Url::parse(s) {
        Ok(u) => u,
        Err(e) => unreachable!("built-in endpoint {s} is invalid: {e}"),
    }
}

/// Append `path` to a base URL without dropping the base's last segment.
pub fn endpoint(base: &Url, path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&joined)?)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub appearance_mode: String,
    pub color_theme: String,
    pub default_project_path: PathBuf,
    /// Seconds.
    pub auto_save_interval: u64,
    pub weather_location: String,
    pub preferred_font_family: String,
    pub font_size: u32,
    pub ai_provider: AiProviderChoice,
    pub ai_model_preference: String,
    pub anthropic_model: String,
    pub recent_projects: Vec<String>,
    pub loglevel: String,
    pub proxy: Option<Url>,
    pub api_endpoints: ApiEndpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            appearance_mode: "dark".to_string(),
            color_theme: "blue".to_string(),
            default_project_path: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("CodeMaster_Projects"),
            auto_save_interval: 300,
            weather_location: "New York".to_string(),
            preferred_font_family: "Consolas".to_string(),
            font_size: 12,
            ai_provider: AiProviderChoice::Auto,
            ai_model_preference: "gpt-3.5-turbo".to_string(),
            anthropic_model: "claude-3-5-haiku-latest".to_string(),
            recent_projects: Vec::new(),
            loglevel: "info".to_string(),
            proxy: None,
            api_endpoints: ApiEndpoints::default(),
        }
    }
}

impl Config {
    /// Defaults merged with `config.json`; environment overrides are not
    /// applied. A corrupt file is skipped and the second value carries the
    /// parse error so the caller can report it once logging is up.
    pub fn load_file(config_file: &Path) -> Result<(Self, Option<String>)> {
        let defaults = Figment::from(Serialized::defaults(Config::default()));
        match defaults.clone().merge(Json::file(config_file)).extract::<Config>() {
            Ok(cfg) => Ok((cfg, None)),
            Err(e) => Ok((defaults.extract()?, Some(e.to_string()))),
        }
    }

    /// The effective configuration: defaults, `config.json`, then
    /// `CODEMASTER_*` environment overrides.
    pub fn load(config_file: &Path) -> Result<Self> {
        let (stored, _) = Self::load_file(config_file)?;
        stored.layered(env_overrides())
    }

    fn layered(&self, env: Env) -> Result<Self> {
        Ok(Figment::from(Serialized::defaults(self))
            .merge(env)
            .extract()?)
    }
}

fn env_overrides() -> Env {
    Env::prefixed(ENV_PREFIX)
        .ignore(&["HOME"])
        .split("__")
}

/// Provider API keys; blank values count as missing.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub weather: Option<String>,
    pub fonts: Option<String>,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            openai: read(OPENAI_KEY_ENV),
            anthropic: read(ANTHROPIC_KEY_ENV),
            weather: read(WEATHER_KEY_ENV),
            fonts: read(FONTS_KEY_ENV),
        }
    }

    /// `(service, env var, value)` for every key, in display order.
    pub fn entries(&self) -> [(&'static str, &'static str, Option<&str>); 4] {
        [
            ("openai", OPENAI_KEY_ENV, self.openai.as_deref()),
            ("anthropic", ANTHROPIC_KEY_ENV, self.anthropic.as_deref()),
            ("weather", WEATHER_KEY_ENV, self.weather.as_deref()),
            ("fonts", FONTS_KEY_ENV, self.fonts.as_deref()),
        ]
    }
}

/// Mutable view over the persisted configuration file.
///
/// Edits apply to the file record (defaults plus `config.json`); the
/// effective configuration is rebuilt from it with the environment layered
/// on top, so overrides never end up on disk.
pub struct ConfigStore {
    path: PathBuf,
    env: Env,
    stored: Config,
    config: Config,
    load_warning: Option<String>,
}

impl ConfigStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_env(path.into(), env_overrides())
    }

    fn open_with_env(path: PathBuf, env: Env) -> Result<Self> {
        let (stored, load_warning) = Config::load_file(&path)?;
        let config = stored.layered(env.clone())?;
        Ok(Self {
            path,
            env,
            stored,
            config,
            load_warning,
        })
    }

    /// Effective configuration, environment overrides included.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Why `config.json` was ignored on open, if it was.
    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    fn replace_stored(&mut self, stored: Config) -> Result<()> {
        self.config = stored.layered(self.env.clone())?;
        self.stored = stored;
        self.save()
    }

    /// Read a value by dotted key, e.g. `api_endpoints.weather`.
    pub fn get(&self, key: &str) -> Result<Value> {
        let tree = serde_json::to_value(&self.config)?;
        key.split('.')
            .try_fold(&tree, |node, part| node.get(part))
            .cloned()
            .ok_or_else(|| CodeMasterError::UnknownConfigKey(key.to_string()))
    }

    /// Set a value by dotted key and persist. `raw` is parsed as JSON when
    /// possible, otherwise taken as a plain string; string settings always
    /// keep `raw` verbatim. The result must still deserialize into
    /// [`Config`].
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        let mut tree = serde_json::to_value(&self.stored)?;
        let slot = key
            .split('.')
            .try_fold(&mut tree, |node, part| node.get_mut(part))
            .ok_or_else(|| CodeMasterError::UnknownConfigKey(key.to_string()))?;
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(parsed) if !slot.is_string() || parsed.is_string() => parsed,
            _ => Value::String(raw.to_string()),
        };
        *slot = value;

        let updated: Config =
            serde_json::from_value(tree).map_err(|e| CodeMasterError::InvalidConfigValue {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        self.replace_stored(updated)
    }

    /// Write the file record, without environment overrides.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.stored)?)?;
        info!(path = %self.path.display(), "configuration saved");
        Ok(())
    }

    pub fn reset_to_defaults(&mut self) -> Result<()> {
        self.replace_stored(Config::default())
    }

    pub fn export(&self, dest: &Path) -> Result<()> {
        fs::write(dest, serde_json::to_string_pretty(&self.stored)?)?;
        Ok(())
    }

    /// Replace the configuration with `src` merged over the defaults.
    pub fn import(&mut self, src: &Path) -> Result<()> {
        let contents = fs::read_to_string(src)?;
        let imported: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Json::string(&contents))
            .extract()?;
        self.replace_stored(imported)
    }

    /// Move `project` to the front of the recent list, keeping at most
    /// [`MAX_RECENT_PROJECTS`] unique entries.
    pub fn add_recent_project(&mut self, project: &str) -> Result<()> {
        let mut stored = self.stored.clone();
        let recent = &mut stored.recent_projects;
        recent.retain(|p| p != project);
        recent.insert(0, project.to_string());
        recent.truncate(MAX_RECENT_PROJECTS);
        self.replace_stored(stored)
    }
}

/// Create the default project directory when it does not exist yet.
pub fn ensure_project_directory(cfg: &Config) -> Result<PathBuf> {
    let dir = cfg.default_project_path.clone();
    fs::create_dir_all(&dir)?;
    Ok(dir)
}
