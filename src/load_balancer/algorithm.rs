// src/load_balancer/algorithm.rs
use crate::proxy::{Backend, BackendSet};

pub trait LoadBalancer: Send + Sync {
    /// Pick one backend from the snapshot, or `None` when nothing is eligible.
    fn select_backend(&self, backends: &BackendSet) -> Option<Backend>;

    fn name(&self) -> &'static str;
}
