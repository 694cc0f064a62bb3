// src/load_balancer/mod.rs
mod algorithm;
mod random;
mod weighted_random;

pub use algorithm::LoadBalancer;
pub use random::{RandomSource, SharedRng};
pub use weighted_random::{select_with_draw, WeightedRandomBalancer};
