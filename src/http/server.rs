//! Demo HTTP server.
//!
//! # Responsibilities
//! - Create Axum Router with the demo handlers
//! - Wire up middleware (tracing, panic catching, panic reporting)
//! - Serve on a listener until shutdown is signalled

use axum::{extract::Path, middleware, routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::ReporterConfig;
use crate::http::{report_panics, Options, ReportingHandler};
use crate::hub::Hub;
use crate::lifecycle::Shutdown;

/// HTTP server exposing a few handlers behind the reporting middleware.
pub struct ReportingServer {
    router: Router,
    handler: ReportingHandler,
}

impl ReportingServer {
    /// Create a server whose requests report through clones of `hub`.
    pub fn new(config: &ReporterConfig, hub: Arc<Hub>) -> Self {
        let handler =
            ReportingHandler::new(Options::from(&config.middleware)).with_hub(hub);
        let router = Self::build_router(handler.clone());
        Self { router, handler }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// `CatchPanicLayer` sits outside the reporting middleware so re-raised
    /// panics still become 500 responses.
    pub fn build_router(handler: ReportingHandler) -> Router {
        Router::new()
            .route("/", get(index))
            .route("/orders/{id}", get(order))
            .route("/panic", get(panic_handler))
            .layer(middleware::from_fn_with_state(handler, report_panics))
            .layer(CatchPanicLayer::new())
            .layer(TraceLayer::new_for_http())
    }

    pub fn handler(&self) -> &ReportingHandler {
        &self.handler
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            repanic = self.handler.repanic(),
            wait_for_delivery = self.handler.wait_for_delivery(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn index() -> &'static str {
    "ok"
}

async fn order(Path(id): Path<u64>) -> String {
    format!("order {id}")
}

async fn panic_handler() -> &'static str {
    panic!("demo panic")
}
