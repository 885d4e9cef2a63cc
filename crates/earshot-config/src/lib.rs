mod config;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Utc;
use earshot_core::{EarshotError, EarshotResult};
use rand::Rng;
use tracing::debug;

pub use config::{ApiConfig, EarshotConfig, OutputConfig, SessionConfig};

pub const DEFAULT_BASE_URL: &str = "https://earshot-app.onrender.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_RETRIES: u32 = 2;

/// Keys accepted by [`set_config_value`].
pub const CONFIG_KEYS: &[&str] = &[
    "api.base_url",
    "api.timeout_secs",
    "api.retries",
    "session.token",
    "session.username",
    "session.device_id",
    "output.simple",
];

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub fn config_path() -> EarshotResult<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| EarshotError::Config("home directory not found".to_string()))?;
    Ok(home.join(".earshot").join("config.toml"))
}

pub fn load_config() -> EarshotResult<EarshotConfig> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> EarshotResult<EarshotConfig> {
    if !path.exists() {
        return Ok(EarshotConfig::default());
    }
    let content = fs::read_to_string(path)
        .map_err(|err| EarshotError::Config(format!("failed to read config: {err}")))?;
    let config = toml::from_str(&content)
        .map_err(|err| EarshotError::Config(format!("failed to parse config: {err}")))?;
    Ok(config)
}

pub fn save_config(config: &EarshotConfig) -> EarshotResult<()> {
    save_config_to(&config_path()?, config)
}

pub fn save_config_to(path: &Path, config: &EarshotConfig) -> EarshotResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| EarshotError::Config(format!("failed to create config dir: {err}")))?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|err| EarshotError::Config(format!("failed to serialize config: {err}")))?;
    fs::write(path, content)
        .map_err(|err| EarshotError::Config(format!("failed to write config: {err}")))?;
    debug!(path = %path.display(), "saved config");
    Ok(())
}

pub fn config_exists() -> EarshotResult<bool> {
    let path = config_path()?;
    Ok(path.exists())
}

pub fn resolve_base_url(config: &EarshotConfig) -> String {
    if let Ok(value) = env::var("EARSHOT_API_URL") {
        if !value.trim().is_empty() {
            return value.trim().trim_end_matches('/').to_string();
        }
    }
    config
        .api
        .base_url
        .as_deref()
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

pub fn resolve_token(config: &EarshotConfig) -> Option<String> {
    if let Ok(value) = env::var("EARSHOT_TOKEN") {
        if !value.trim().is_empty() {
            return Some(value);
        }
    }
    config.session.token.clone()
}

pub fn resolve_timeout_secs(config: &EarshotConfig) -> u64 {
    config.api.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
}

pub fn resolve_retries(config: &EarshotConfig) -> u32 {
    config.api.retries.unwrap_or(DEFAULT_RETRIES)
}

pub fn resolve_simple_output(config: &EarshotConfig) -> Option<bool> {
    if let Ok(value) = env::var("EARSHOT_OUTPUT_SIMPLE") {
        let normalized = value.to_lowercase();
        return Some(normalized == "1" || normalized == "true" || normalized == "yes");
    }
    config.output.simple
}

/// Returns the stored device id, creating and recording one on first use.
/// The flag is true when the id was just created and has not been saved yet.
pub fn ensure_device_id(config: &mut EarshotConfig) -> (String, bool) {
    if let Some(existing) = config
        .session
        .device_id
        .as_ref()
        .filter(|id| !id.trim().is_empty())
    {
        return (existing.clone(), false);
    }
    let device_id = generate_device_id();
    debug!(%device_id, "generated new device id");
    config.session.device_id = Some(device_id.clone());
    (device_id, true)
}

/// Like [`ensure_device_id`], but writes a newly created id to `path` at once,
/// so it survives a login attempt that never gets an answer.
pub fn persist_device_id(path: &Path, config: &mut EarshotConfig) -> EarshotResult<String> {
    let (device_id, created) = ensure_device_id(config);
    if created {
        save_config_to(path, config)?;
    }
    Ok(device_id)
}

/// `device-<unix millis>-<9 base36 chars>-<9 base36 chars>`
pub fn generate_device_id() -> String {
    let mut rng = rand::rng();
    let mut chunk = || -> String {
        (0..9)
            .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
            .collect()
    };
    let first = chunk();
    let second = chunk();
    format!("device-{}-{first}-{second}", Utc::now().timestamp_millis())
}

/// Forgets the token and username; the device id is kept.
pub fn clear_session(config: &mut EarshotConfig) {
    config.session.token = None;
    config.session.username = None;
}

pub fn set_config_value(key_path: &str, value: &str) -> EarshotResult<()> {
    set_config_value_at(&config_path()?, key_path, value)
}

pub fn set_config_value_at(path: &Path, key_path: &str, value: &str) -> EarshotResult<()> {
    if !CONFIG_KEYS.contains(&key_path) {
        return Err(EarshotError::Config(format!(
            "unknown key '{key_path}', expected one of: {}",
            CONFIG_KEYS.join(", ")
        )));
    }

    let content = if path.exists() {
        fs::read_to_string(path)
            .map_err(|err| EarshotError::Config(format!("failed to read config: {err}")))?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|err| EarshotError::Config(format!("failed to parse config: {err}")))?;

    let parts: Vec<&str> = key_path.split('.').collect();
    let Some((last_part, sections)) = parts.split_last() else {
        return Err(EarshotError::Config(format!("invalid key path '{key_path}'")));
    };

    let mut current = doc.as_table_mut();
    for part in sections {
        current = current
            .entry(part)
            .or_insert(toml_edit::Item::Table(Default::default()))
            .as_table_mut()
            .ok_or_else(|| {
                EarshotError::Config(format!("cannot set nested value in '{key_path}'"))
            })?;
    }

    current[*last_part] = typed_value(key_path, value)?;

    let content = doc.to_string();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| EarshotError::Config(format!("failed to create config dir: {err}")))?;
    }
    fs::write(path, content)
        .map_err(|err| EarshotError::Config(format!("failed to write config: {err}")))?;

    Ok(())
}

fn typed_value(key_path: &str, value: &str) -> EarshotResult<toml_edit::Item> {
    match key_path {
        "output.simple" => {
            let flag = value.trim().parse::<bool>().map_err(|_| {
                EarshotError::Config(format!("'{key_path}' expects true or false"))
            })?;
            Ok(toml_edit::value(flag))
        }
        "api.timeout_secs" | "api.retries" => {
            let number = value.trim().parse::<u32>().map_err(|_| {
                EarshotError::Config(format!("'{key_path}' expects a non-negative integer"))
            })?;
            Ok(toml_edit::value(i64::from(number)))
        }
        _ => Ok(toml_edit::value(value)),
    }
}

pub fn get_config_value(config: &EarshotConfig, key_path: &str) -> Option<String> {
    let parts: Vec<&str> = key_path.split('.').collect();

    match parts.as_slice() {
        ["api", "base_url"] => config.api.base_url.clone(),
        ["api", "timeout_secs"] => config.api.timeout_secs.map(|v| v.to_string()),
        ["api", "retries"] => config.api.retries.map(|v| v.to_string()),
        ["session", "token"] => config.session.token.clone(),
        ["session", "username"] => config.session.username.clone(),
        ["session", "device_id"] => config.session.device_id.clone(),
        ["output", "simple"] => config.output.simple.map(|b| b.to_string()),
        _ => None,
    }
}

pub fn open_in_editor() -> EarshotResult<()> {
    let path = config_path()?;
    if !path.exists() {
        save_config(&EarshotConfig::default())?;
    }

    let editor = env::var("EDITOR").unwrap_or_else(|_| {
        if cfg!(target_os = "windows") {
            "notepad".to_string()
        } else {
            "nano".to_string()
        }
    });

    let status = Command::new(&editor)
        .arg(&path)
        .status()
        .map_err(|err| EarshotError::Config(format!("failed to open editor '{editor}': {err}")))?;

    if !status.success() {
        return Err(EarshotError::Config(format!(
            "editor exited with status: {status}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert!(config.session.token.is_none());
        assert_eq!(resolve_retries(&config), DEFAULT_RETRIES);
        assert_eq!(resolve_timeout_secs(&config), DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn save_then_load_keeps_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = EarshotConfig::default();
        config.session.token = Some("jwt".to_string());
        config.session.username = Some("dj".to_string());
        save_config_to(&path, &config).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.session.token.as_deref(), Some("jwt"));
        assert_eq!(loaded.session.username.as_deref(), Some("dj"));
    }

    #[test]
    fn set_value_writes_typed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        set_config_value_at(&path, "output.simple", "true").unwrap();
        set_config_value_at(&path, "api.retries", "4").unwrap();
        set_config_value_at(&path, "api.base_url", "http://localhost:5000").unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.output.simple, Some(true));
        assert_eq!(loaded.api.retries, Some(4));
        assert_eq!(
            get_config_value(&loaded, "api.base_url").as_deref(),
            Some("http://localhost:5000")
        );
    }

    #[test]
    fn set_value_rejects_unknown_and_mistyped_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(matches!(
            set_config_value_at(&path, "api.secret", "x"),
            Err(EarshotError::Config(_))
        ));
        assert!(matches!(
            set_config_value_at(&path, "output.simple", "sometimes"),
            Err(EarshotError::Config(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn device_id_is_generated_once() {
        let mut config = EarshotConfig::default();
        let (first, created) = ensure_device_id(&mut config);
        let (second, created_again) = ensure_device_id(&mut config);
        assert_eq!(first, second);
        assert!(created);
        assert!(!created_again);

        let parts: Vec<&str> = first.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "device");
        assert!(parts[1].parse::<i64>().is_ok());
        assert!(parts[2..].iter().all(|part| {
            part.len() == 9 && part.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        }));
    }

    #[test]
    fn clearing_session_keeps_device() {
        let mut config = EarshotConfig::default();
        config.session.token = Some("t".into());
        config.session.username = Some("u".into());
        let (device, _) = ensure_device_id(&mut config);
        clear_session(&mut config);
        assert!(config.session.token.is_none());
        assert!(config.session.username.is_none());
        assert_eq!(config.session.device_id, Some(device));
    }

    #[test]
    fn set_value_leaves_unparsable_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let original = "[session]\ntoken = \"jwt\"\ndevice_id = \"device-1\"\n[api\n";
        fs::write(&path, original).unwrap();

        let result = set_config_value_at(&path, "output.simple", "true");

        match result {
            Err(EarshotError::Config(msg)) => assert!(msg.contains("failed to parse config")),
            other => panic!("expected config error, got {other:?}"),
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn new_device_id_is_written_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = EarshotConfig::default();

        let device_id = persist_device_id(&path, &mut config).unwrap();

        let saved = load_config_from(&path).unwrap();
        assert_eq!(saved.session.device_id.as_deref(), Some(device_id.as_str()));
    }

    #[test]
    fn existing_device_id_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = EarshotConfig::default();
        config.session.device_id = Some("device-1".into());

        assert_eq!(persist_device_id(&path, &mut config).unwrap(), "device-1");
        assert!(!path.exists());
    }
}
