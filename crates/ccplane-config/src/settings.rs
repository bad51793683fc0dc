use std::time::Duration;

use ccplane_domain::GateRequirement;
use ccplane_domain::Gate;

use crate::raw::RawSettings;

/// Validated, fully-defaulted settings for the control plane core. Built
/// once at startup from [`RawSettings`] plus environment overrides; passed
/// down by `Arc` to every service rather than re-read per call.
#[derive(Debug, Clone)]
pub struct Settings {
    pub dedup_window: Duration,
    pub expected_hash_ttl: Duration,
    pub service_resolution_ttl: Duration,
    pub permission_ttl: Duration,
    pub csot_fallback_ttl: Duration,
    pub idp_fallback_ttl: Duration,

    pub stale_threshold: Duration,
    pub delete_threshold: Duration,
    pub reaper_interval: Duration,

    pub warmup_delay: Duration,
    pub ingest_concurrency: usize,

    pub auto_register_on_first_heartbeat: bool,
    pub prod_environment_names: Vec<String>,

    pub approval_max_cas_retries: u32,
    pub approval_default_gates: Vec<GateRequirement>,

    pub circuit_breaker_failure_threshold: u32,
    pub circuit_breaker_reset: Duration,

    pub default_deadline: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_raw(RawSettings::default())
    }
}

impl Settings {
    pub fn from_raw(raw: RawSettings) -> Self {
        let ping_interval_secs = raw.ping_interval_secs.unwrap_or(20);
        let stale_multiplier = raw.stale_threshold_multiplier.unwrap_or(3);
        let stale_threshold_secs = raw
            .stale_threshold_secs
            .unwrap_or(ping_interval_secs * stale_multiplier as u64);

        let ingest_concurrency = raw.ingest_concurrency.unwrap_or_else(default_ingest_concurrency);

        let approval_default_gates = raw
            .approval_default_gates
            .map(|gates| {
                gates
                    .into_iter()
                    .map(|g| GateRequirement { gate: Gate::new(g.gate), min_approvals: g.min_approvals })
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![
                    GateRequirement { gate: Gate::sys_admin(), min_approvals: 1 },
                    GateRequirement { gate: Gate::line_manager(), min_approvals: 1 },
                ]
            });

        Self {
            dedup_window: Duration::from_secs(raw.dedup_window_secs.unwrap_or(5)),
            expected_hash_ttl: Duration::from_secs(raw.expected_hash_ttl_secs.unwrap_or(60)),
            service_resolution_ttl: Duration::from_secs(raw.service_resolution_ttl_secs.unwrap_or(300)),
            permission_ttl: Duration::from_secs(raw.permission_ttl_secs.unwrap_or(30)),
            csot_fallback_ttl: Duration::from_secs(raw.csot_fallback_ttl_secs.unwrap_or(24 * 3600)),
            idp_fallback_ttl: Duration::from_secs(raw.idp_fallback_ttl_secs.unwrap_or(5 * 60)),

            stale_threshold: Duration::from_secs(stale_threshold_secs),
            delete_threshold: Duration::from_secs(raw.delete_threshold_secs.unwrap_or(3600)),
            reaper_interval: Duration::from_secs(raw.reaper_interval_secs.unwrap_or(60)),

            warmup_delay: Duration::from_secs(raw.warmup_delay_secs.unwrap_or(30)),
            ingest_concurrency,

            auto_register_on_first_heartbeat: raw.auto_register_on_first_heartbeat.unwrap_or(false),
            prod_environment_names: raw
                .prod_environment_names
                .unwrap_or_else(|| vec!["prod".to_string(), "production".to_string()]),

            approval_max_cas_retries: raw.approval_max_cas_retries.unwrap_or(5),
            approval_default_gates,

            circuit_breaker_failure_threshold: raw.circuit_breaker_failure_threshold.unwrap_or(5),
            circuit_breaker_reset: Duration::from_secs(raw.circuit_breaker_reset_secs.unwrap_or(30)),

            default_deadline: Duration::from_secs(raw.default_deadline_secs.unwrap_or(10)),
        }
    }

    pub fn is_prod_environment(&self, environment: &str) -> bool {
        self.prod_environment_names.iter().any(|e| e.eq_ignore_ascii_case(environment))
    }
}

fn default_ingest_concurrency() -> usize {
    std::thread::available_parallelism().map(|n| n.get() * 2).unwrap_or(4)
}
