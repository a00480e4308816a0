use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_BOT_FILE: &str = "./nlp-with-luis.bot";
pub const DEFAULT_ENVIRONMENT: &str = "development";

const BASE_SETTINGS_FILE: &str = "appsettings.json";

/// Settings as they appear in a single source file. Every field is optional
/// so later sources override earlier ones field by field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    bot_file_path: Option<String>,
    #[serde(default)]
    bot_file_secret: Option<String>,
    #[serde(default)]
    environment: Option<String>,
}

impl SettingsFile {
    fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let file: SettingsFile = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        Ok(Some(file))
    }

    fn merge(self, over: SettingsFile) -> SettingsFile {
        SettingsFile {
            bot_file_path: over.bot_file_path.or(self.bot_file_path),
            bot_file_secret: over.bot_file_secret.or(self.bot_file_secret),
            environment: over.environment.or(self.environment),
        }
    }
}

/// Resolved host settings: base file, environment-specific file, then
/// process environment variables, later sources winning.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bot_file_path: Option<String>,
    pub bot_file_secret: Option<String>,
    pub environment: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."), |key| std::env::var(key).ok())
    }

    /// Load from an explicit directory with an injectable environment
    /// lookup. The environment name itself comes from `BOT_ENVIRONMENT`
    /// or the base file, since it names the override file.
    pub fn load_from<F>(dir: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = SettingsFile::load(&dir.join(BASE_SETTINGS_FILE))?.unwrap_or_default();

        let environment = env("BOT_ENVIRONMENT")
            .or_else(|| base.environment.clone())
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        let env_file = dir.join(format!("appsettings.{}.json", environment));
        let merged = match SettingsFile::load(&env_file)? {
            Some(over) => base.merge(over),
            None => base,
        };

        Ok(Settings {
            bot_file_path: env("BOT_FILE_PATH").or(merged.bot_file_path),
            bot_file_secret: env("BOT_FILE_SECRET").or(merged.bot_file_secret),
            environment,
        })
    }

    /// Effective bot file path, falling back to the sample default.
    pub fn bot_file_path(&self) -> PathBuf {
        PathBuf::from(
            self.bot_file_path
                .as_deref()
                .unwrap_or(DEFAULT_BOT_FILE),
        )
    }
}
