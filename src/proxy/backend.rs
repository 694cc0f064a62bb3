// src/proxy/backend.rs
use std::fmt;
use std::sync::Arc;

/// One upstream instance: where it lives and how much traffic it should get.
///
/// Address and weight always travel together so a backend can never be paired
/// with somebody else's weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Backend {
    address: Arc<str>,
    weight: f64,
}

impl Backend {
    pub fn new(address: impl Into<Arc<str>>, weight: f64) -> Self {
        Self {
            address: address.into(),
            weight,
        }
    }

    /// `host:port` of the instance.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The weight exactly as configured.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Weight used for sampling. Anything that is not a finite positive
    /// number counts as zero, so the backend stays listed but is never picked.
    pub fn effective_weight(&self) -> f64 {
        if self.weight.is_finite() && self.weight > 0.0 {
            self.weight
        } else {
            0.0
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (weight {})", self.address, self.weight)
    }
}

/// Ordered, immutable list of backends. Order only matters as the walk order
/// of the selector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendSet {
    backends: Vec<Backend>,
}

impl BackendSet {
    pub fn new(backends: Vec<Backend>) -> Self {
        Self { backends }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Backend> {
        self.backends.iter()
    }

    pub fn as_slice(&self) -> &[Backend] {
        &self.backends
    }

    /// Sum of effective weights. May be infinite for huge magnitudes.
    pub fn total_weight(&self) -> f64 {
        self.backends.iter().map(Backend::effective_weight).sum()
    }
}

impl FromIterator<Backend> for BackendSet {
    fn from_iter<I: IntoIterator<Item = Backend>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a BackendSet {
    type Item = &'a Backend;
    type IntoIter = std::slice::Iter<'a, Backend>;

    fn into_iter(self) -> Self::IntoIter {
        self.backends.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_weight_ignores_invalid_values() {
        assert_eq!(Backend::new("a:80", 0.5).effective_weight(), 0.5);
        assert_eq!(Backend::new("a:80", 0.0).effective_weight(), 0.0);
        assert_eq!(Backend::new("a:80", -1.0).effective_weight(), 0.0);
        assert_eq!(Backend::new("a:80", f64::NAN).effective_weight(), 0.0);
        assert_eq!(Backend::new("a:80", f64::INFINITY).effective_weight(), 0.0);
    }

    #[test]
    fn test_total_weight() {
        let set: BackendSet = vec![
            Backend::new("a:80", 0.5),
            Backend::new("b:80", 0.3),
            Backend::new("c:80", -4.0),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 3);
        assert!((set.total_weight() - 0.8).abs() < 1e-12);
        assert_eq!(BackendSet::empty().total_weight(), 0.0);
    }
}
