use deluge_core::ClientConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Current settings schema version - increment when making breaking changes
pub const SETTINGS_VERSION: u32 = 1;

/// Environment variable overriding the settings directory.
pub const CONFIG_DIR_ENV: &str = "DELUGE_REMOTE_CONFIG_DIR";

/// Persisted application settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_settings_version")]
    pub version: u32,
    /// Saved Deluge clients, in display order
    #[serde(default)]
    pub clients: Vec<ClientConfig>,
    /// Per-request timeout for connection tests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            clients: Vec::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AppSettings {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

fn default_settings_version() -> u32 {
    // Return 0 for settings files without version field (pre-versioning)
    0
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Get the default config directory path
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("deluge-remote")
}

/// Process-level mutex for settings file access.
static SETTINGS_LOCK: Mutex<()> = Mutex::new(());

/// Reads and writes `settings.json` inside one config directory.
#[derive(Clone, Debug)]
pub struct SettingsStore {
    dir: PathBuf,
}

impl SettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at `$DELUGE_REMOTE_CONFIG_DIR`, or the platform config dir.
    pub fn from_env() -> Self {
        match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::new(dir),
            _ => Self::new(default_config_dir()),
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join("settings.json")
    }

    /// Load settings with migration and partial recovery.
    ///
    /// A missing file yields defaults. A file that fails to parse as a whole
    /// is recovered field by field; client records that fail on their own
    /// are dropped with a warning.
    pub fn load(&self) -> AppSettings {
        let path = self.settings_path();

        if !path.exists() {
            log::info!("Settings file not found at {}, using defaults", path.display());
            return AppSettings::default();
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                log::error!("Failed to read settings file {}: {}", path.display(), e);
                return AppSettings::default();
            }
        };

        match serde_json::from_str::<AppSettings>(&content) {
            Ok(settings) => return self.migrate(settings),
            Err(e) => {
                log::warn!("Failed to parse settings directly: {}, attempting partial recovery", e);
            }
        }

        match recover_settings_from_json(&content) {
            Ok(settings) => {
                log::info!("Recovered settings with partial data");
                let settings = self.migrate(settings);
                if let Err(e) = self.save(&settings) {
                    log::warn!("Failed to save recovered settings: {}", e);
                }
                settings
            }
            Err(e) => {
                log::error!("Failed to recover settings from {}: {}", path.display(), e);
                log::error!("Using default settings. Your old settings file has been preserved.");
                AppSettings::default()
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self, settings: &AppSettings) -> Result<()> {
        let path = self.settings_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        restrict_permissions(&path);
        Ok(())
    }

    /// Atomically load, update, and save the saved clients.
    ///
    /// Uses a process-level mutex to prevent concurrent read-modify-write races.
    /// On Unix, also uses file locking (flock) for cross-process safety.
    pub fn update_clients<F>(&self, updater: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<ClientConfig>),
    {
        let _guard = SETTINGS_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let path = self.settings_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        #[cfg(unix)]
        {
            use std::io::{Read, Seek, Write};
            let mut file = std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)?;

            // Acquire exclusive file lock
            unsafe { libc::flock(std::os::unix::io::AsRawFd::as_raw_fd(&file), libc::LOCK_EX) };

            let mut content = String::new();
            file.read_to_string(&mut content)?;
            let settings = if content.trim().is_empty() {
                AppSettings::default()
            } else {
                match serde_json::from_str::<AppSettings>(&content) {
                    Ok(settings) => settings,
                    Err(_) => recover_settings_from_json(&content)?,
                }
            };
            let mut settings = migrate_version(settings);

            updater(&mut settings.clients);

            let new_content = serde_json::to_string_pretty(&settings)?;
            file.seek(std::io::SeekFrom::Start(0))?;
            file.set_len(0)?;
            file.write_all(new_content.as_bytes())?;
            restrict_permissions(&path);

            // Lock is released automatically when `file` is dropped
            return Ok(());
        }

        #[cfg(not(unix))]
        {
            let mut settings = self.load();
            updater(&mut settings.clients);
            self.save(&settings)?;
            Ok(())
        }
    }

    fn migrate(&self, settings: AppSettings) -> AppSettings {
        let original_version = settings.version;
        let settings = migrate_version(settings);
        if original_version != settings.version {
            if let Err(e) = self.save(&settings) {
                log::warn!("Failed to save migrated settings: {}", e);
            }
        }
        settings
    }
}

/// Migrate settings from older versions to the current version
fn migrate_version(mut settings: AppSettings) -> AppSettings {
    let original_version = settings.version;

    // v0 files were a bare client list under `clients`; nothing to rewrite.
    if settings.version == 0 {
        log::info!("Migrating settings from pre-versioning (v0) to v1");
        settings.version = 1;
    }

    if settings.version < SETTINGS_VERSION {
        settings.version = SETTINGS_VERSION;
    }

    if original_version != settings.version {
        log::info!("Settings migrated from v{} to v{}", original_version, settings.version);
    }

    settings
}

/// Extract valid fields from a settings file that failed to parse as a whole.
fn recover_settings_from_json(content: &str) -> Result<AppSettings> {
    let value: serde_json::Value =
        serde_json::from_str(content).context("Settings file is not valid JSON")?;

    let obj = value
        .as_object()
        .context("Settings file root is not a JSON object")?;

    let mut settings = AppSettings {
        version: default_settings_version(),
        ..AppSettings::default()
    };

    if let Some(v) = obj.get("version").and_then(|v| v.as_u64()) {
        settings.version = v as u32;
    }

    if let Some(v) = obj.get("request_timeout_secs").and_then(|v| v.as_u64()) {
        settings.request_timeout_secs = v.clamp(1, 300);
    }

    if let Some(entries) = obj.get("clients").and_then(|v| v.as_array()) {
        for (index, entry) in entries.iter().enumerate() {
            match serde_json::from_value::<ClientConfig>(entry.clone()) {
                Ok(config) => settings.clients.push(config),
                Err(e) => log::warn!("Dropping unreadable client record #{}: {}", index, e),
            }
        }
    }

    Ok(settings)
}

fn restrict_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    let _ = path;
}
