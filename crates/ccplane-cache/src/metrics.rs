use std::sync::atomic::{AtomicU64, Ordering};

/// Per-cache counters backing the hit-ratio health report (spec.md §4.5
/// "Metrics").
#[derive(Debug, Default)]
pub struct CacheMetrics {
    l1_hits: AtomicU64,
    l1_misses: AtomicU64,
    l2_hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

impl CacheMetrics {
    pub fn record_l1_hit(&self) {
        self.l1_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_l1_miss(&self) {
        self.l1_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_l2_hit(&self) {
        self.l2_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn l1_hits(&self) -> u64 {
        self.l1_hits.load(Ordering::Relaxed)
    }

    pub fn l2_hits(&self) -> u64 {
        self.l2_hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    fn total_requests(&self) -> u64 {
        self.l1_hits() + self.l1_misses.load(Ordering::Relaxed).min(u64::MAX)
    }

    /// Fraction of requests served from L1 without falling through to L2.
    pub fn l1_hit_ratio(&self) -> f64 {
        ratio(self.l1_hits(), self.total_requests())
    }

    /// Fraction of L1-missed requests that were served from L2.
    pub fn l2_hit_ratio(&self) -> f64 {
        let l1_misses = self.l1_misses.load(Ordering::Relaxed);
        ratio(self.l2_hits(), l1_misses)
    }

    /// Fraction of all requests served from either tier.
    pub fn overall_hit_ratio(&self) -> f64 {
        let total = self.total_requests();
        ratio(self.l1_hits() + self.l2_hits(), total)
    }

    pub fn error_rate(&self) -> f64 {
        let total = self.total_requests();
        ratio(self.errors(), total)
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratios_are_zero_with_no_traffic() {
        let m = CacheMetrics::default();
        assert_eq!(m.overall_hit_ratio(), 0.0);
        assert_eq!(m.error_rate(), 0.0);
    }

    #[test]
    fn overall_hit_ratio_counts_both_tiers() {
        let m = CacheMetrics::default();
        m.record_l1_hit();
        m.record_l1_miss();
        m.record_l2_hit();
        assert_eq!(m.overall_hit_ratio(), 1.0);
    }
}
