use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::{
    capture::device::{CameraProvider, Facing},
    prediction::DEFAULT_PREDICTION_ENDPOINT,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub prediction_endpoint: String,
    pub prediction_timeout_ms: Option<u64>,
    pub analysis_duration_ms: u64,
    pub default_facing: Facing,
    pub camera_provider: CameraProvider,
    /// Raise the default log filter from `Info` to `Debug`. `RUST_LOG` still
    /// takes precedence.
    pub debug: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            prediction_endpoint: DEFAULT_PREDICTION_ENDPOINT.into(),
            prediction_timeout_ms: None,
            analysis_duration_ms: 5000,
            default_facing: Facing::Back,
            camera_provider: CameraProvider::Synthetic,
            debug: false,
        }
    }
}

impl AppSettings {
    pub fn analysis_duration(&self) -> Duration {
        Duration::from_millis(self.analysis_duration_ms)
    }

    pub fn prediction_timeout(&self) -> Option<Duration> {
        self.prediction_timeout_ms.map(Duration::from_millis)
    }
}

/// Values taken from `AGRISENSE_*` variables. They shadow the stored settings
/// but are never persisted. Unparseable values are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    prediction_endpoint: Option<String>,
    analysis_duration_ms: Option<u64>,
    camera_provider: Option<CameraProvider>,
    debug: Option<bool>,
}

impl SettingsOverrides {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            prediction_endpoint: lookup("AGRISENSE_PREDICT_URL")
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            analysis_duration_ms: lookup("AGRISENSE_ANALYSIS_MS")
                .and_then(|raw| raw.trim().parse().ok()),
            camera_provider: lookup("AGRISENSE_CAMERA").and_then(|raw| raw.parse().ok()),
            debug: lookup("AGRISENSE_DEBUG").map(|flag| {
                matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
            }),
        }
    }

    pub fn apply(&self, settings: &mut AppSettings) {
        if let Some(url) = &self.prediction_endpoint {
            settings.prediction_endpoint = url.clone();
        }
        if let Some(ms) = self.analysis_duration_ms {
            settings.analysis_duration_ms = ms;
        }
        if let Some(provider) = self.camera_provider {
            settings.camera_provider = provider;
        }
        if let Some(debug) = self.debug {
            settings.debug = debug;
        }
    }

    /// Put the `stored` value back into every field this override shadows, so
    /// an edited copy of the effective settings can be persisted.
    fn unapply(&self, settings: &mut AppSettings, stored: &AppSettings) {
        if self.prediction_endpoint.is_some() {
            settings.prediction_endpoint = stored.prediction_endpoint.clone();
        }
        if self.analysis_duration_ms.is_some() {
            settings.analysis_duration_ms = stored.analysis_duration_ms;
        }
        if self.camera_provider.is_some() {
            settings.camera_provider = stored.camera_provider;
        }
        if self.debug.is_some() {
            settings.debug = stored.debug;
        }
    }
}

type OverrideLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

struct Loaded {
    /// Exactly what is on disk.
    stored: AppSettings,
    overrides: SettingsOverrides,
}

impl Loaded {
    fn effective(&self) -> AppSettings {
        let mut settings = self.stored.clone();
        self.overrides.apply(&mut settings);
        settings
    }
}

pub struct SettingsStore {
    path: PathBuf,
    lookup: OverrideLookup,
    data: RwLock<Loaded>,
}

impl SettingsStore {
    /// Load from `path`, falling back to defaults when the file is missing or
    /// unreadable as JSON. Environment overrides are applied on top but never
    /// written back.
    pub fn new(path: PathBuf) -> Result<Self> {
        Self::with_lookup(path, |key| std::env::var(key).ok())
    }

    /// Like [`SettingsStore::new`], reading overrides from `lookup` instead of
    /// the process environment.
    pub fn with_lookup<F>(path: PathBuf, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let stored = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    log::warn!("Ignoring invalid settings file {}: {err}", path.display());
                    AppSettings::default()
                }
            }
        } else {
            AppSettings::default()
        };
        let overrides = SettingsOverrides::from_lookup(&lookup);

        Ok(Self {
            path,
            lookup: Box::new(lookup),
            data: RwLock::new(Loaded { stored, overrides }),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Loaded> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Loaded> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Effective settings: the stored values with overrides applied.
    pub fn get(&self) -> AppSettings {
        self.read().effective()
    }

    /// Settings as persisted, without overrides.
    pub fn stored(&self) -> AppSettings {
        self.read().stored.clone()
    }

    /// Persist `settings`. Fields shadowed by an override keep their stored
    /// value, so a `get`, edit, `update` round trip never writes an override
    /// to disk.
    pub fn update(&self, settings: AppSettings) -> Result<()> {
        let mut guard = self.write();
        let overrides = SettingsOverrides::from_lookup(&self.lookup);
        let mut stored = settings;
        overrides.unapply(&mut stored, &guard.stored);
        self.persist(&stored)?;
        *guard = Loaded { stored, overrides };
        Ok(())
    }

    fn persist(&self, data: &AppSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    /// Re-read the file and the overrides.
    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let stored: AppSettings = serde_json::from_str(&contents)?;
        let overrides = SettingsOverrides::from_lookup(&self.lookup);
        *self.write() = Loaded { stored, overrides };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    use super::*;

    fn no_overrides(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::with_lookup(dir.path().join("settings.json"), no_overrides).unwrap();
        assert_eq!(store.get(), AppSettings::default());
    }

    #[test]
    fn updates_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("settings.json");
        let store = SettingsStore::with_lookup(path.clone(), no_overrides).unwrap();

        let mut settings = store.get();
        settings.prediction_timeout_ms = Some(2500);
        settings.default_facing = Facing::Front;
        store.update(settings.clone()).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"predictionTimeoutMs\": 2500"));

        store.reload().unwrap();
        assert_eq!(store.get().prediction_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(store.get().default_facing, Facing::Front);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::with_lookup(path, no_overrides).unwrap();
        assert_eq!(store.get(), AppSettings::default());
    }

    #[test]
    fn overrides_are_not_written_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::with_lookup(path.clone(), |key| match key {
            "AGRISENSE_PREDICT_URL" => Some("http://localhost:8000/predict".into()),
            _ => None,
        })
        .unwrap();

        let mut settings = store.get();
        assert_eq!(settings.prediction_endpoint, "http://localhost:8000/predict");
        settings.default_facing = Facing::Front;
        store.update(settings).unwrap();

        let persisted: AppSettings = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(persisted.prediction_endpoint, DEFAULT_PREDICTION_ENDPOINT);
        assert_eq!(persisted.default_facing, Facing::Front);
        assert_eq!(store.stored(), persisted);
        assert_eq!(store.get().prediction_endpoint, "http://localhost:8000/predict");
        assert_eq!(store.get().default_facing, Facing::Front);
    }

    #[test]
    fn reload_reapplies_current_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let env: Arc<Mutex<HashMap<String, String>>> = Arc::default();
        let lookup_env = Arc::clone(&env);
        let store = SettingsStore::with_lookup(path, move |key| {
            lookup_env.lock().unwrap().get(key).cloned()
        })
        .unwrap();
        store.update(store.get()).unwrap();
        assert_eq!(store.get().analysis_duration_ms, 5000);

        env.lock()
            .unwrap()
            .insert("AGRISENSE_ANALYSIS_MS".into(), "250".into());
        store.reload().unwrap();
        assert_eq!(store.get().analysis_duration(), Duration::from_millis(250));
        assert_eq!(store.stored().analysis_duration_ms, 5000);

        env.lock().unwrap().clear();
        store.reload().unwrap();
        assert_eq!(store.get().analysis_duration_ms, 5000);
    }

    #[test]
    fn overrides_replace_fields() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("AGRISENSE_PREDICT_URL", "http://localhost:8000/predict"),
            ("AGRISENSE_ANALYSIS_MS", "250"),
            ("AGRISENSE_CAMERA", "none"),
            ("AGRISENSE_DEBUG", "true"),
        ]);

        let mut settings = AppSettings::default();
        SettingsOverrides::from_lookup(|key| env.get(key).map(|value| value.to_string()))
            .apply(&mut settings);

        assert_eq!(settings.prediction_endpoint, "http://localhost:8000/predict");
        assert_eq!(settings.analysis_duration(), Duration::from_millis(250));
        assert_eq!(settings.camera_provider, CameraProvider::Unavailable);
        assert!(settings.debug);
    }

    #[test]
    fn bad_override_values_are_ignored() {
        let mut settings = AppSettings::default();
        let overrides = SettingsOverrides::from_lookup(|key| match key {
            "AGRISENSE_ANALYSIS_MS" => Some("soon".into()),
            "AGRISENSE_CAMERA" => Some("webcam".into()),
            _ => None,
        });
        assert_eq!(overrides, SettingsOverrides::default());
        overrides.apply(&mut settings);
        assert_eq!(settings, AppSettings::default());
    }
}
