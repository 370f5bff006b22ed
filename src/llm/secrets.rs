use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use dialoguer::{Password, theme::ColorfulTheme};

use crate::config::TutorConfig;
use crate::palette::Palette;
use crate::utils::{get_data_dir, strip_controls_and_escapes, trim_line};

pub const API_KEY_ENV: &str = "SYNTAX_TUTOR_API_KEY";

const KEYS_FILE_NAME: &str = "keys.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    KeyStore,
}

impl KeySource {
    pub fn description(&self) -> &'static str {
        match self {
            KeySource::Environment => "environment variable",
            KeySource::KeyStore => "local key store",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    pub key: String,
    pub source: KeySource,
}

/// API keys saved on disk, one per endpoint, as a flat JSON object.
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    /// Store in the platform data directory.
    pub fn open() -> Result<Self> {
        Ok(Self::at(get_data_dir()?.join(KEYS_FILE_NAME)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn get(&self, endpoint: &str) -> Result<Option<String>> {
        let keys = self.load()?;
        Ok(keys
            .get(endpoint)
            .and_then(|key| trim_line(key))
            .map(str::to_string))
    }

    pub fn set(&self, endpoint: &str, key: &str) -> Result<()> {
        let key = trim_line(key).context("Cannot store an empty API key")?;
        let mut keys = self.load()?;
        keys.insert(endpoint.to_string(), key.to_string());
        self.save(&keys)
    }

    /// Returns whether a key was stored for `endpoint`. The file is removed
    /// once it holds no keys.
    pub fn remove(&self, endpoint: &str) -> Result<bool> {
        let mut keys = self.load()?;
        if keys.remove(endpoint).is_none() {
            return Ok(false);
        }
        if keys.is_empty() {
            fs::remove_file(&self.path).with_context(|| {
                format!("Failed to remove key store at {}", self.path.display())
            })?;
        } else {
            self.save(&keys)?;
        }
        Ok(true)
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read key store at {}", self.path.display()));
            }
        };
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse key store at {}", self.path.display()))
    }

    fn save(&self, keys: &BTreeMap<String, String>) -> Result<()> {
        let mut contents = serde_json::to_string_pretty(keys)?;
        contents.push('\n');
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write key store at {}", self.path.display()))
    }
}

/// Key for the configured endpoint: `SYNTAX_TUTOR_API_KEY` first, then the
/// key store.
pub fn resolve_api_key(config: &TutorConfig, store: &KeyStore) -> Result<Option<ResolvedKey>> {
    resolve_with(|key| env::var(key).ok(), config, store)
}

fn resolve_with<F>(lookup: F, config: &TutorConfig, store: &KeyStore) -> Result<Option<ResolvedKey>>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(API_KEY_ENV)
        && let Some(key) = trim_line(&value)
    {
        return Ok(Some(ResolvedKey {
            key: key.to_string(),
            source: KeySource::Environment,
        }));
    }

    let stored = store.get(config.endpoint())?;
    Ok(stored.map(|key| ResolvedKey {
        key,
        source: KeySource::KeyStore,
    }))
}

pub fn store_api_key(config: &TutorConfig, api_key: &str) -> Result<()> {
    KeyStore::open()?.set(config.endpoint(), api_key)
}

pub fn clear_api_key(config: &TutorConfig) -> Result<bool> {
    KeyStore::open()?.remove(config.endpoint())
}

pub fn prompt_for_api_key(endpoint: &str) -> Result<String> {
    println!(
        "\n{} for {}. It's stored locally for future use.",
        Palette::paint(Palette::SUCCESS, "Enter your API key"),
        Palette::paint(Palette::INFO, endpoint)
    );
    println!(
        "{}",
        Palette::dim(format!("You can also set {API_KEY_ENV} instead."))
    );
    let raw = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("API Key")
        .allow_empty_password(true)
        .interact()
        .context("Failed to read API key from terminal")?;

    Ok(strip_controls_and_escapes(&raw).trim().to_string())
}
