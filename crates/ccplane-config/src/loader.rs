use std::path::Path;

use tracing::debug;

use crate::error::ConfigError;
use crate::raw::RawSettings;
use crate::settings::Settings;

/// Load settings from a YAML file, then apply env var overrides (`CCPLANE_*`),
/// then fill in documented defaults for anything still unset.
pub fn load(path: &Path) -> Result<Settings, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut raw: RawSettings = serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
        path: path.display().to_string(),
        source: e,
    })?;
    apply_env_overrides(&mut raw);
    debug!("loaded control plane settings from {}", path.display());
    Ok(Settings::from_raw(raw))
}

/// Build settings from defaults plus env var overrides only, for
/// deployments without a settings file (e.g. a container driven entirely
/// by env vars).
pub fn load_from_env() -> Settings {
    let mut raw = RawSettings::default();
    apply_env_overrides(&mut raw);
    Settings::from_raw(raw)
}

fn apply_env_overrides(raw: &mut RawSettings) {
    if let Some(v) = env_u64("CCPLANE_DEDUP_WINDOW_SECS") {
        raw.dedup_window_secs = Some(v);
    }
    if let Some(v) = env_u64("CCPLANE_EXPECTED_HASH_TTL_SECS") {
        raw.expected_hash_ttl_secs = Some(v);
    }
    if let Some(v) = env_u64("CCPLANE_STALE_THRESHOLD_SECS") {
        raw.stale_threshold_secs = Some(v);
    }
    if let Some(v) = env_u64("CCPLANE_DELETE_THRESHOLD_SECS") {
        raw.delete_threshold_secs = Some(v);
    }
    if let Some(v) = env_u64("CCPLANE_REAPER_INTERVAL_SECS") {
        raw.reaper_interval_secs = Some(v);
    }
    if let Some(v) = env_usize("CCPLANE_INGEST_CONCURRENCY") {
        raw.ingest_concurrency = Some(v);
    }
    if let Ok(v) = std::env::var("CCPLANE_AUTO_REGISTER_ON_FIRST_HEARTBEAT") {
        raw.auto_register_on_first_heartbeat = Some(v == "1" || v.eq_ignore_ascii_case("true"));
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
