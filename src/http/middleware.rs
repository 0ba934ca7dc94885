//! Panic reporting middleware.
//!
//! Wraps the rest of the handler chain, records request context on a
//! per-request [`Hub`], times the request with a [`Span`](crate::trace::Span)
//! and reports panics raised further down the chain.
//!
//! # Registration
//!
//! ```rust,no_run
//! use axum::{middleware, routing::get, Router};
//! use panic_reporter::http::{report_panics, Options, ReportingHandler};
//!
//! let handler = ReportingHandler::new(Options {
//!     repanic: true,
//!     ..Default::default()
//! });
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "ok" }))
//!     .layer(middleware::from_fn_with_state(handler, report_panics));
//! ```
//!
//! With `repanic` set, put a panic-catching layer such as
//! `tower_http::catch_panic::CatchPanicLayer` outside this middleware so the
//! client still gets a response.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use crate::http::request::request_info;
use crate::hub::Hub;
use crate::protocol::event::panic_message;
use crate::protocol::RequestInfo;
use crate::trace::{SpanGuard, SpanStatus, TraceHeader};

/// Flush deadline used when [`Options::timeout`] is zero.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Operation name of request spans.
pub const SPAN_OP: &str = "http.server";

/// Configures a [`ReportingHandler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Re-raise the original panic after reporting it.
    ///
    /// Usually wanted when an outer layer turns panics into responses.
    pub repanic: bool,
    /// After a panic, wait until the report has been delivered (or
    /// `timeout` elapses) before re-raising or responding.
    ///
    /// Useful where execution is frozen once the response is sent, like
    /// serverless platforms.
    pub wait_for_delivery: bool,
    /// Upper bound for the delivery wait. Zero means [`DEFAULT_TIMEOUT`].
    ///
    /// A timed-out wait does not cancel delivery.
    pub timeout: Duration,
}

/// Per-request panic interceptor.
#[derive(Debug, Clone)]
pub struct ReportingHandler {
    repanic: bool,
    wait_for_delivery: bool,
    timeout: Duration,
    default_hub: Option<Arc<Hub>>,
}

impl ReportingHandler {
    pub fn new(options: Options) -> Self {
        let timeout = if options.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            options.timeout
        };
        Self {
            repanic: options.repanic,
            wait_for_delivery: options.wait_for_delivery,
            timeout,
            default_hub: None,
        }
    }

    /// Clone request hubs from `hub` instead of [`Hub::main`].
    pub fn with_hub(mut self, hub: Arc<Hub>) -> Self {
        self.default_hub = Some(hub);
        self
    }

    pub fn repanic(&self) -> bool {
        self.repanic
    }

    pub fn wait_for_delivery(&self) -> bool {
        self.wait_for_delivery
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the rest of the chain for `request`, reporting any panic.
    pub async fn handle(&self, mut request: Request, next: Next) -> Response {
        let hub = match request.extensions().get::<Arc<Hub>>() {
            Some(hub) => hub.clone(),
            None => {
                let base = self.default_hub.clone().unwrap_or_else(Hub::main);
                let hub = Arc::new(Hub::new_from_top(&base));
                request.extensions_mut().insert(hub.clone());
                hub
            }
        };

        let name = format!("{} {}", request.method(), request.uri().path());
        let span = hub.start_span(SPAN_OP, &name, TraceHeader::from_headers(request.headers()));
        request.extensions_mut().insert(span.clone());

        let info = request_info(&request, hub.send_default_pii());
        hub.configure_scope(|scope| scope.set_request(Some(info.clone())));

        // Finishes the span even if this future is dropped mid-request.
        let guard = SpanGuard::new(span.clone());

        let request_span = tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            trace_id = %span.trace_context().trace_id,
        );
        let outcome = AssertUnwindSafe(next.run(request))
            .catch_unwind()
            .instrument(request_span)
            .await;

        match outcome {
            Ok(response) => {
                let status = response.status().as_u16();
                span.set_data("http.response.status_code", status);
                guard.finish(SpanStatus::from_http_status(status));
                response
            }
            Err(payload) => {
                // The span closes before the report and re-raise decision.
                guard.finish(SpanStatus::InternalError);
                self.recover(&hub, info, payload).await
            }
        }
    }

    async fn recover(
        &self,
        hub: &Hub,
        request: RequestInfo,
        payload: Box<dyn Any + Send>,
    ) -> Response {
        let event_id = hub.capture_panic(&*payload, Some(request));
        tracing::error!(
            panic = %panic_message(&*payload),
            event_id = ?event_id.map(|id| id.to_string()),
            "Request handler panicked"
        );

        if let Some(event_id) = event_id {
            if self.wait_for_delivery && !hub.flush(self.timeout).await {
                tracing::warn!(
                    event_id = %event_id,
                    timeout = ?self.timeout,
                    "Timed out waiting for panic report delivery"
                );
            }
        }

        if self.repanic {
            std::panic::resume_unwind(payload);
        }
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

/// Middleware function for [`axum::middleware::from_fn_with_state`].
pub async fn report_panics(
    State(handler): State<ReportingHandler>,
    request: Request,
    next: Next,
) -> Response {
    handler.handle(request, next).await
}
