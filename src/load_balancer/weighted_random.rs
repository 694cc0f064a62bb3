// src/load_balancer/weighted_random.rs
use crate::load_balancer::random::{RandomSource, SharedRng};
use crate::load_balancer::LoadBalancer;
use crate::proxy::{Backend, BackendSet};
use std::sync::Arc;

/// Weighted random sampling, one draw per request.
///
/// A draw `r` is taken uniformly from `[0, total)` and the set is walked in
/// order; the first backend whose cumulative interval reaches `r` wins
/// (`upto + weight >= r`, so the upper edge of an interval belongs to it).
/// Zero-weight backends are skipped. If rounding lets the walk run off the
/// end, the last backend with a positive weight is returned.
pub struct WeightedRandomBalancer {
    rng: Arc<dyn RandomSource>,
}

impl WeightedRandomBalancer {
    pub fn new() -> Self {
        Self::with_source(Arc::new(SharedRng::from_clock()))
    }

    pub fn with_source(rng: Arc<dyn RandomSource>) -> Self {
        Self { rng }
    }
}

impl Default for WeightedRandomBalancer {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBalancer for WeightedRandomBalancer {
    fn select_backend(&self, backends: &BackendSet) -> Option<Backend> {
        let (total, divisor) = normalized_total(backends)?;
        let r = self.rng.next_unit() * total;
        walk(backends, r, divisor)
    }

    fn name(&self) -> &'static str {
        "weighted_random"
    }
}

/// Run the cumulative walk for a caller-supplied draw, expressed in the same
/// units as the weights.
pub fn select_with_draw(backends: &BackendSet, r: f64) -> Option<Backend> {
    walk(backends, r, 1.0)
}

/// Total weight plus the divisor applied to every weight. The divisor is 1
/// unless the raw sum overflows, in which case weights are taken relative to
/// the largest one.
fn normalized_total(backends: &BackendSet) -> Option<(f64, f64)> {
    let raw = backends.total_weight();
    if raw <= 0.0 {
        return None;
    }
    if raw.is_finite() {
        return Some((raw, 1.0));
    }

    let max = backends
        .iter()
        .map(Backend::effective_weight)
        .fold(0.0_f64, f64::max);
    let total = backends
        .iter()
        .map(|backend| backend.effective_weight() / max)
        .sum();

    Some((total, max))
}

fn walk(backends: &BackendSet, r: f64, divisor: f64) -> Option<Backend> {
    let mut upto = 0.0;
    let mut last_positive = None;

    for backend in backends {
        let weight = backend.effective_weight() / divisor;
        if weight <= 0.0 {
            continue;
        }
        if upto + weight >= r {
            return Some(backend.clone());
        }
        upto += weight;
        last_positive = Some(backend);
    }

    last_positive.cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        values: Vec<f64>,
        next: AtomicUsize,
    }

    impl Scripted {
        fn new(values: Vec<f64>) -> Arc<Self> {
            Arc::new(Self {
                values,
                next: AtomicUsize::new(0),
            })
        }
    }

    impl RandomSource for Scripted {
        fn next_unit(&self) -> f64 {
            let i = self.next.fetch_add(1, Ordering::Relaxed);
            self.values[i % self.values.len()]
        }
    }

    fn set(entries: &[(&str, f64)]) -> BackendSet {
        entries
            .iter()
            .map(|(address, weight)| Backend::new(*address, *weight))
            .collect()
    }

    fn picked(backends: &BackendSet, r: f64) -> Option<String> {
        select_with_draw(backends, r).map(|b| b.address().to_string())
    }

    #[test]
    fn test_empty_set_selects_nothing() {
        let balancer = WeightedRandomBalancer::new();
        assert!(balancer.select_backend(&BackendSet::empty()).is_none());
        assert!(select_with_draw(&BackendSet::empty(), 0.0).is_none());
    }

    #[test]
    fn test_all_zero_weights_select_nothing() {
        let balancer = WeightedRandomBalancer::new();
        let backends = set(&[("a:80", 0.0), ("b:80", 0.0)]);
        for _ in 0..100 {
            assert!(balancer.select_backend(&backends).is_none());
        }
        assert!(select_with_draw(&backends, 0.0).is_none());
    }

    #[test]
    fn test_negative_weights_count_as_zero() {
        let balancer = WeightedRandomBalancer::new();
        assert!(balancer.select_backend(&set(&[("a:80", -1.0)])).is_none());

        let backends = set(&[("a:80", -5.0), ("b:80", 1.0)]);
        for _ in 0..100 {
            assert_eq!(balancer.select_backend(&backends).unwrap().address(), "b:80");
        }
    }

    #[test]
    fn test_boundary_belongs_to_lower_interval() {
        let backends = set(&[("first:80", 1.0), ("second:80", 1.0)]);

        assert_eq!(picked(&backends, 1.0).as_deref(), Some("first:80"));
        assert_eq!(
            picked(&backends, 1.0 + f64::EPSILON).as_deref(),
            Some("second:80")
        );
        assert_eq!(picked(&backends, 0.0).as_deref(), Some("first:80"));
    }

    #[test]
    fn test_draw_past_total_falls_back_to_last() {
        let backends = set(&[("a:80", 1.0), ("b:80", 1.0), ("drained:80", 0.0)]);
        assert_eq!(picked(&backends, 2.5).as_deref(), Some("b:80"));
    }

    #[test]
    fn test_zero_weight_never_selected_even_at_zero_draw() {
        let backends = set(&[("drained:80", 0.0), ("live:80", 1.0)]);
        assert_eq!(picked(&backends, 0.0).as_deref(), Some("live:80"));
    }

    #[test]
    fn test_scripted_source_drives_selection() {
        // Weights 0.5 / 0.3 / 0.2, total 1.0.
        let backends = set(&[("a:80", 0.5), ("b:80", 0.3), ("c:80", 0.2)]);
        let balancer = WeightedRandomBalancer::with_source(Scripted::new(vec![0.1, 0.6, 0.95]));

        let order: Vec<String> = (0..3)
            .map(|_| balancer.select_backend(&backends).unwrap().address().to_string())
            .collect();

        assert_eq!(order, vec!["a:80", "b:80", "c:80"]);
    }

    #[test]
    fn test_huge_weights_do_not_overflow() {
        let backends = set(&[("a:80", f64::MAX), ("b:80", f64::MAX)]);
        let low = WeightedRandomBalancer::with_source(Scripted::new(vec![0.25]));
        let high = WeightedRandomBalancer::with_source(Scripted::new(vec![0.75]));

        assert_eq!(low.select_backend(&backends).unwrap().address(), "a:80");
        assert_eq!(high.select_backend(&backends).unwrap().address(), "b:80");
    }

    #[test]
    fn test_weighted_distribution() {
        let balancer = WeightedRandomBalancer::with_source(Arc::new(SharedRng::from_seed(7)));
        let backends = set(&[("a:80", 0.5), ("b:80", 0.3), ("c:80", 0.2)]);
        let draws = 100_000;

        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..draws {
            let chosen = balancer.select_backend(&backends).unwrap();
            *counts.entry(chosen.address().to_string()).or_insert(0) += 1;
        }

        for backend in &backends {
            let expected = draws as f64 * backend.weight();
            let observed = counts[backend.address()] as f64;
            assert!(
                (observed - expected).abs() < draws as f64 * 0.01,
                "{}: observed {} expected {}",
                backend.address(),
                observed,
                expected
            );
        }
    }
}
