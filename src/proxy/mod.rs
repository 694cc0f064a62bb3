//
// src/proxy/mod.rs
//
mod backend;
mod proxy;
mod registry;

pub use backend::{Backend, BackendSet};
pub use proxy::{Proxy, ProxyError, REQUEST_ID_HEADER};
pub use registry::{set_from_configs, BackendRegistry};
