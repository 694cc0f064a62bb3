//! demos/hello_backend.rs
//! Run: cargo run --example hello_backend -- <port> [name]
//!
//! Answers every request with `Hello from <name>!`. Start a few of these and
//! point the proxy at them with
//! `BACKENDS=127.0.0.1:8001=0.5,127.0.0.1:8002=0.3,127.0.0.1:8003=0.2`.

use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server,
};
use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

#[derive(Clone)]
struct BackendState {
    name: Arc<str>,
    served: Arc<AtomicU64>,
}

async fn handle(req: Request<Body>, state: BackendState) -> Result<Response<Body>, Infallible> {
    let n = state.served.fetch_add(1, Ordering::Relaxed) + 1;
    tracing::debug!(method = %req.method(), path = %req.uri().path(), n, "request");

    Ok(Response::builder()
        .header("Content-Type", "text/plain")
        .header("X-Backend-Name", state.name.as_ref())
        .body(Body::from(format!("Hello from {}!", state.name)))
        .unwrap_or_else(|_| Response::new(Body::empty())))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let port: u16 = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "8001".into())
        .parse()?;
    let name = std::env::args()
        .nth(2)
        .or_else(|| std::env::var("BACKEND_NAME").ok())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| format!("backend-{port}"));

    let state = BackendState {
        name: name.clone().into(),
        served: Arc::new(AtomicU64::new(0)),
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let make_svc = make_service_fn(move |_conn| {
        let st = state.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| handle(req, st.clone()))) }
    });

    tracing::info!("Demo backend '{}' on http://{}", name, addr);
    Server::bind(&addr).serve(make_svc).await?;
    Ok(())
}
