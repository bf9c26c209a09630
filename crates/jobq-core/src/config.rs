//! Configuration: loaded once at Supervisor / Control API start and passed by
//! value from there on. `config set` only ever touches the file; it never
//! notifies a running supervisor (see design notes — deliberate, not an
//! oversight).

use std::path::Path;

use serde_json::{Map, Value};

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_BASE: u32 = 2;

/// The two knobs this system exposes. Anything else in `config.json` is
/// preserved verbatim by `RawConfig` but never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub max_retries: u32,
    pub backoff_base: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

/// `config.json` loaded as a raw JSON object so that keys this binary does
/// not understand round-trip unchanged across `config set`.
#[derive(Debug, Clone)]
pub struct RawConfig {
    fields: Map<String, Value>,
}

impl RawConfig {
    /// Loads configuration from `path`, or the defaults if the file is
    /// absent or unparseable. Missing known keys fall back to their
    /// defaults; unknown keys are kept as-is.
    pub fn load(path: &Path) -> Self {
        let fields = std::fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();

        let mut cfg = RawConfig { fields };
        cfg.fields
            .entry("max_retries")
            .or_insert_with(|| Value::from(DEFAULT_MAX_RETRIES));
        cfg.fields
            .entry("backoff_base")
            .or_insert_with(|| Value::from(DEFAULT_BACKOFF_BASE));
        cfg
    }

    /// Persists the current fields as pretty-printed JSON, creating the
    /// parent directory if needed.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(&Value::Object(self.fields.clone()))
            .expect("a JSON object always serializes");
        std::fs::write(path, body)
    }

    /// Sets a known key (`max_retries` or `backoff_base`) to an integer
    /// value, preserving every other field already present.
    pub fn set_int(&mut self, key: &str, value: i64) {
        self.fields.insert(key.to_string(), Value::from(value));
    }

    /// The typed view used by the rest of the system.
    pub fn typed(&self) -> Config {
        Config {
            max_retries: self.u32_field("max_retries", DEFAULT_MAX_RETRIES),
            backoff_base: self.u32_field("backoff_base", DEFAULT_BACKOFF_BASE),
        }
    }

    /// The raw JSON object, for `config show`.
    pub fn as_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    fn u32_field(&self, key: &str, default: u32) -> u32 {
        self.fields
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = RawConfig::load(Path::new("/nonexistent/jobq/config.json"));
        assert_eq!(cfg.typed(), Config::default());
    }

    #[test]
    fn unknown_keys_round_trip() {
        let dir = std::env::temp_dir().join(format!("jobq-cfg-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"max_retries": 7, "nickname": "queue-a"}"#).unwrap();

        let mut cfg = RawConfig::load(&path);
        assert_eq!(cfg.typed().max_retries, 7);
        assert_eq!(cfg.typed().backoff_base, DEFAULT_BACKOFF_BASE);

        cfg.set_int("backoff_base", 3);
        cfg.save(&path).unwrap();

        let reloaded = RawConfig::load(&path);
        assert_eq!(reloaded.typed().backoff_base, 3);
        assert_eq!(
            reloaded.as_value().get("nickname").and_then(Value::as_str),
            Some("queue-a")
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
