// ────────────────────────────────
// src/proxy/proxy.rs
// Forwarding gateway: pick a backend, make one outbound call, relay the result.
// ────────────────────────────────

use super::backend::Backend;
use super::registry::BackendRegistry;
use crate::config::{Config, ForwardMode};
use crate::load_balancer::LoadBalancer;
use hyper::client::HttpConnector;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, HOST};
use hyper::{Body, Client, Method, Request, Response, StatusCode, Uri};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Connection-scoped headers that must not cross the proxy.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub struct Proxy {
    registry: Arc<BackendRegistry>,
    balancer: Arc<dyn LoadBalancer>,
    client: Client<HttpConnector>,
    forward_mode: ForwardMode,
    request_timeout: Duration,
}

impl Proxy {
    pub fn new(
        config: &Config,
        registry: Arc<BackendRegistry>,
        balancer: Arc<dyn LoadBalancer>,
    ) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.timeouts.connect()));

        Self {
            registry,
            balancer,
            client: Client::builder().build(connector),
            forward_mode: config.forward_mode,
            request_timeout: config.timeouts.request(),
        }
    }

    /// Handle one inbound request. Exactly one of the returned variants is
    /// produced per call; the caller turns an error into a response.
    pub async fn handle(&self, mut req: Request<Body>) -> Result<Response<Body>, ProxyError> {
        let request_id = ensure_request_id(&mut req);
        let span = info_span!(
            "proxy",
            request_id = %request_id,
            method = %req.method(),
            path = %req.uri().path(),
        );

        async move {
            let result = self.select_and_forward(req).await;
            match &result {
                Ok(response) => debug!(status = %response.status(), "relayed backend response"),
                Err(err) => warn!(%err, status = %err.status(), "request failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn select_and_forward(&self, req: Request<Body>) -> Result<Response<Body>, ProxyError> {
        let snapshot = self.registry.snapshot();
        let backend = self
            .balancer
            .select_backend(&snapshot)
            .ok_or(ProxyError::NoBackendAvailable)?;

        debug!(
            backend = backend.address(),
            weight = backend.weight(),
            balancer = self.balancer.name(),
            "selected backend"
        );

        self.forward(&backend, req).await
    }

    async fn forward(&self, backend: &Backend, req: Request<Body>) -> Result<Response<Body>, ProxyError> {
        let outbound = self.build_outbound(backend, req)?;
        let deadline = Instant::now() + self.request_timeout;

        let response = timeout_at(deadline, self.client.request(outbound))
            .await
            .map_err(|_| ProxyError::Timeout)?
            .map_err(|err| {
                if err.is_connect() {
                    ProxyError::BackendUnreachable(format!("{}: {}", backend.address(), err))
                } else {
                    ProxyError::BackendReadFailure(format!("{}: {}", backend.address(), err))
                }
            })?;

        let (parts, body) = response.into_parts();
        let bytes = timeout_at(deadline, hyper::body::to_bytes(body))
            .await
            .map_err(|_| ProxyError::Timeout)?
            .map_err(|err| ProxyError::BackendReadFailure(format!("{}: {}", backend.address(), err)))?;

        let mut relayed = Response::new(Body::from(bytes));
        *relayed.status_mut() = parts.status;
        *relayed.headers_mut() = strip_hop_by_hop(parts.headers);
        Ok(relayed)
    }

    fn build_outbound(&self, backend: &Backend, req: Request<Body>) -> Result<Request<Body>, ProxyError> {
        let (parts, body) = req.into_parts();

        let path_and_query = match self.forward_mode {
            ForwardMode::Passthrough => parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/"),
            ForwardMode::RootGet => "/",
        };
        let uri = format!("http://{}{}", backend.address(), path_and_query)
            .parse::<Uri>()
            .map_err(|err| {
                ProxyError::InvalidBackendAddress(format!("{}: {}", backend.address(), err))
            })?;

        let mut outbound = match self.forward_mode {
            ForwardMode::Passthrough => {
                let mut outbound = Request::new(body);
                *outbound.method_mut() = parts.method;
                let mut headers = strip_hop_by_hop(parts.headers);
                // hyper fills Host in from the backend URI.
                headers.remove(HOST);
                *outbound.headers_mut() = headers;
                outbound
            }
            ForwardMode::RootGet => {
                let mut outbound = Request::new(Body::empty());
                *outbound.method_mut() = Method::GET;
                if let Some(id) = parts.headers.get(REQUEST_ID_HEADER) {
                    outbound.headers_mut().insert(REQUEST_ID_HEADER, id.clone());
                }
                outbound
            }
        };
        *outbound.uri_mut() = uri;

        Ok(outbound)
    }
}

/// Reuse the caller's request id or mint a new one, and make sure it is on the
/// request so the backend sees the same id as our logs.
fn ensure_request_id(req: &mut Request<Body>) -> String {
    if let Some(id) = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        return id.to_string();
    }

    let id = Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&id) {
        req.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    id
}

fn strip_hop_by_hop(mut headers: HeaderMap) -> HeaderMap {
    for name in HOP_BY_HOP {
        headers.remove(HeaderName::from_static(name));
    }
    headers
}

/// Failures the gateway turns into a response for the caller.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("No backend available")]
    NoBackendAvailable,

    #[error("Backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Failed to read backend response: {0}")]
    BackendReadFailure(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid backend address: {0}")]
    InvalidBackendAddress(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoBackendAvailable => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::BackendUnreachable(_)
            | ProxyError::BackendReadFailure(_)
            | ProxyError::InvalidBackendAddress(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Short body sent to the caller; the detailed message only goes to logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            ProxyError::NoBackendAvailable => "No backend available",
            ProxyError::BackendUnreachable(_) => "Failed to reach backend",
            ProxyError::BackendReadFailure(_) => "Failed to read backend response",
            ProxyError::Timeout => "Gateway timeout",
            ProxyError::InvalidBackendAddress(_) => "Invalid backend address",
        }
    }
}

// Convert ProxyError to Hyper Response for error handling
impl From<ProxyError> for Response<Body> {
    fn from(err: ProxyError) -> Self {
        let mut response = Response::new(Body::from(err.public_message()));
        *response.status_mut() = err.status();
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
