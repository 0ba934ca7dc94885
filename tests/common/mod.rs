//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{body::Body, extract::State, http::Request, routing::post, Json, Router};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use panic_reporter::hub::{Client, ClientOptions, Hub, Scope};
use panic_reporter::sink::MemorySink;

/// A hub reporting into `sink`, with every trace sampled.
pub fn memory_hub(sink: Arc<MemorySink>) -> Arc<Hub> {
    memory_hub_with(sink, ClientOptions {
        traces_sample_rate: 1.0,
        ..Default::default()
    })
}

pub fn memory_hub_with(sink: Arc<MemorySink>, options: ClientOptions) -> Arc<Hub> {
    let client = Arc::new(Client::new(options, sink));
    Arc::new(Hub::new(Some(client), Scope::default()))
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("host", "shop.local")
        .body(Body::empty())
        .unwrap()
}

/// Start a collector on an ephemeral port that records every JSON body
/// POSTed to `/ingest`.
pub async fn start_collector() -> (SocketAddr, Arc<Mutex<Vec<Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/ingest", post(ingest))
        .with_state(received.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, received)
}

async fn ingest(State(received): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>) {
    received.lock().unwrap().push(body);
}
