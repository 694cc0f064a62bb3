//
// src/proxy/registry.rs
//

use super::backend::{Backend, BackendSet};
use crate::config::BackendConfig;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Holds the current backend set. Readers get a whole snapshot; a
/// reconfiguration swaps in a new set, so nobody ever sees a half-updated list.
pub struct BackendRegistry {
    current: ArcSwap<BackendSet>,
}

impl BackendRegistry {
    pub fn new(set: BackendSet) -> Self {
        Self {
            current: ArcSwap::from_pointee(set),
        }
    }

    pub fn from_configs(configs: &[BackendConfig]) -> Self {
        Self::new(set_from_configs(configs))
    }

    pub fn snapshot(&self) -> Arc<BackendSet> {
        self.current.load_full()
    }

    /// Replace the whole set. An empty set is accepted; selections will then
    /// fail until a non-empty set is installed.
    pub fn replace(&self, set: BackendSet) {
        let size = set.len();
        let previous = self.current.swap(Arc::new(set));

        tracing::info!(
            "Backend set replaced: {} -> {} backends",
            previous.len(),
            size
        );
    }
}

pub fn set_from_configs(configs: &[BackendConfig]) -> BackendSet {
    configs
        .iter()
        .map(|config| Backend::new(config.address.as_str(), config.weight))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(entries: &[(&str, f64)]) -> BackendSet {
        entries
            .iter()
            .map(|(address, weight)| Backend::new(*address, *weight))
            .collect()
    }

    #[test]
    fn test_replace_is_visible_to_new_snapshots_only() {
        let registry = BackendRegistry::new(set(&[("a:80", 1.0)]));
        let before = registry.snapshot();

        registry.replace(set(&[("b:80", 1.0), ("c:80", 2.0)]));
        let after = registry.snapshot();

        assert_eq!(before.len(), 1);
        assert_eq!(before.as_slice()[0].address(), "a:80");
        assert_eq!(after.len(), 2);
        assert_eq!(after.as_slice()[1].address(), "c:80");
    }

    #[test]
    fn test_replace_with_empty_set_is_accepted() {
        let registry = BackendRegistry::new(set(&[("a:80", 1.0)]));
        registry.replace(BackendSet::empty());
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_from_configs_keeps_order_and_weights() {
        let configs = vec![
            BackendConfig {
                address: "10.0.0.1:80".into(),
                weight: 0.5,
            },
            BackendConfig {
                address: "10.0.0.2:80".into(),
                weight: 0.0,
            },
        ];

        let snapshot = BackendRegistry::from_configs(&configs).snapshot();
        let listed: Vec<(&str, f64)> = snapshot
            .iter()
            .map(|b| (b.address(), b.weight()))
            .collect();

        assert_eq!(listed, vec![("10.0.0.1:80", 0.5), ("10.0.0.2:80", 0.0)]);
    }
}
