use serde::{Deserialize, Serialize};

/// Raw YAML representation of the control plane's settings file. Every
/// field is optional so the file only needs to mention overrides;
/// `loader::load` fills in the documented defaults from spec.md.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawSettings {
    pub dedup_window_secs: Option<u64>,
    pub expected_hash_ttl_secs: Option<u64>,
    pub service_resolution_ttl_secs: Option<u64>,
    pub permission_ttl_secs: Option<u64>,
    pub csot_fallback_ttl_secs: Option<u64>,
    pub idp_fallback_ttl_secs: Option<u64>,

    pub ping_interval_secs: Option<u64>,
    pub stale_threshold_multiplier: Option<u32>,
    pub stale_threshold_secs: Option<u64>,
    pub delete_threshold_secs: Option<u64>,
    pub reaper_interval_secs: Option<u64>,

    pub warmup_delay_secs: Option<u64>,
    pub ingest_concurrency: Option<usize>,

    pub auto_register_on_first_heartbeat: Option<bool>,
    pub prod_environment_names: Option<Vec<String>>,

    pub approval_max_cas_retries: Option<u32>,
    pub approval_default_gates: Option<Vec<RawGateRequirement>>,

    pub circuit_breaker_failure_threshold: Option<u32>,
    pub circuit_breaker_reset_secs: Option<u64>,

    pub default_deadline_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawGateRequirement {
    pub gate: String,
    pub min_approvals: u32,
}
