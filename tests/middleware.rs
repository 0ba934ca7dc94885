//! Panic reporting middleware behaviour through a full axum router.

mod common;

use axum::{
    body::Body,
    extract::Request,
    http::{Request as HttpRequest, StatusCode},
    middleware,
    routing::get,
    Extension, Router,
};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;

use panic_reporter::hub::{ClientOptions, Hub};
use panic_reporter::protocol::{Envelope, Level};
use panic_reporter::sink::MemorySink;
use panic_reporter::trace::{Span, SpanStatus, TraceId};
use panic_reporter::{report_panics, Options, ReportingHandler};

use common::{get as get_request, memory_hub, memory_hub_with};

#[derive(Debug, PartialEq)]
struct OrderPanic {
    order_id: u64,
}

async fn order_panic() -> &'static str {
    panic!("boom")
}

async fn typed_panic() -> &'static str {
    std::panic::panic_any(OrderPanic { order_id: 42 })
}

async fn hang() -> &'static str {
    std::future::pending().await
}

fn routes() -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route("/orders/{id}", get(order_panic))
        .route("/typed", get(typed_panic))
        .route("/hang", get(hang))
}

fn app(options: Options, hub: Arc<Hub>) -> Router {
    let handler = ReportingHandler::new(options).with_hub(hub);
    routes().layer(middleware::from_fn_with_state(handler, report_panics))
}

#[tokio::test]
async fn test_normal_request_finishes_one_span_and_reports_nothing() {
    let sink = Arc::new(MemorySink::new());
    let app = app(Options::default(), memory_hub(sink.clone()));

    let response = app.oneshot(get_request("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(sink.events().is_empty());
    let transactions = sink.transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].name, "GET /");
    assert_eq!(transactions[0].status, SpanStatus::Ok);
    assert_eq!(transactions[0].trace.op, "http.server");
    assert_eq!(transactions[0].data["http.response.status_code"], 200);
}

#[tokio::test]
async fn test_error_status_maps_onto_span() {
    let sink = Arc::new(MemorySink::new());
    let app = app(Options::default(), memory_hub(sink.clone()));

    let response = app.oneshot(get_request("/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let transactions = sink.transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].status, SpanStatus::NotFound);
}

#[tokio::test]
async fn test_panic_is_reported_once_with_request() {
    let sink = Arc::new(MemorySink::new());
    let app = app(Options::default(), memory_hub(sink.clone()));

    let response = app.oneshot(get_request("/orders/42?debug=1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.level, Level::Fatal);
    assert_eq!(event.exception[0].value.as_deref(), Some("boom"));
    assert!(!event.exception[0].mechanism.as_ref().unwrap().handled);
    assert_eq!(event.transaction.as_deref(), Some("GET /orders/42"));

    let request = event.request.as_ref().expect("request attached");
    assert_eq!(request.method, "GET");
    assert_eq!(request.path(), "/orders/42");
    assert_eq!(request.query_string.as_deref(), Some("debug=1"));
}

#[tokio::test]
async fn test_span_finishes_before_panic_is_reported() {
    let sink = Arc::new(MemorySink::new());
    let app = app(Options::default(), memory_hub(sink.clone()));

    app.oneshot(get_request("/orders/42")).await.unwrap();

    let envelopes = sink.envelopes();
    assert_eq!(envelopes.len(), 2);
    let Envelope::Transaction(transaction) = &envelopes[0] else {
        panic!("expected the transaction first, got {:?}", envelopes[0].kind());
    };
    assert_eq!(transaction.status, SpanStatus::InternalError);
    let Envelope::Event(event) = &envelopes[1] else {
        panic!("expected an event second");
    };
    assert_eq!(
        event.trace.as_ref().map(|trace| trace.trace_id),
        Some(transaction.trace.trace_id)
    );
}

#[tokio::test]
async fn test_repanic_reraises_original_payload() {
    let sink = Arc::new(MemorySink::new());
    let options = Options {
        repanic: true,
        ..Default::default()
    };
    let app = app(options, memory_hub(sink.clone()));

    let outcome = AssertUnwindSafe(app.oneshot(get_request("/orders/42")))
        .catch_unwind()
        .await;
    let payload = outcome.expect_err("panic should propagate");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
    assert_eq!(sink.events().len(), 1);
}

#[tokio::test]
async fn test_repanic_keeps_custom_payload_type() {
    let sink = Arc::new(MemorySink::new());
    let options = Options {
        repanic: true,
        ..Default::default()
    };
    let app = app(options, memory_hub(sink.clone()));

    let outcome = AssertUnwindSafe(app.oneshot(get_request("/typed")))
        .catch_unwind()
        .await;
    let payload = outcome.expect_err("panic should propagate");
    assert_eq!(
        payload.downcast_ref::<OrderPanic>(),
        Some(&OrderPanic { order_id: 42 })
    );

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].exception[0].value.as_deref(), Some("Box<dyn Any>"));
}

#[tokio::test(start_paused = true)]
async fn test_repanic_waits_for_delivery_before_reraising() {
    let sink = Arc::new(MemorySink::with_delivery_delay(Duration::from_millis(50)));
    let options = Options {
        repanic: true,
        wait_for_delivery: true,
        timeout: Duration::from_secs(2),
    };
    let app = app(options, memory_hub(sink.clone()));

    let started = Instant::now();
    let outcome = AssertUnwindSafe(app.oneshot(get_request("/orders/42")))
        .catch_unwind()
        .await;
    let elapsed = started.elapsed();

    let payload = outcome.expect_err("panic should propagate");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_secs(2));
    // Delivered before the panic resumed.
    assert_eq!(sink.events().len(), 1);
    assert_eq!(sink.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_request_finishes_span_as_cancelled() {
    let sink = Arc::new(MemorySink::new());
    let app = app(Options::default(), memory_hub(sink.clone()));

    let outcome =
        tokio::time::timeout(Duration::from_millis(50), app.oneshot(get_request("/hang"))).await;
    assert!(outcome.is_err());

    let transactions = sink.transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].name, "GET /hang");
    assert_eq!(transactions[0].status, SpanStatus::Cancelled);
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn test_outer_catch_panic_layer_answers_after_repanic() {
    let sink = Arc::new(MemorySink::new());
    let options = Options {
        repanic: true,
        ..Default::default()
    };
    let app = app(options, memory_hub(sink.clone())).layer(CatchPanicLayer::new());

    let response = app.oneshot(get_request("/orders/42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(sink.events().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_delivery_blocks_until_delivered() {
    let sink = Arc::new(MemorySink::with_delivery_delay(Duration::from_millis(10)));
    let options = Options {
        wait_for_delivery: true,
        timeout: Duration::from_secs(2),
        ..Default::default()
    };
    let app = app(options, memory_hub(sink.clone()));

    let started = Instant::now();
    let response = app.oneshot(get_request("/orders/42")).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(elapsed >= Duration::from_millis(10));
    assert!(elapsed < Duration::from_secs(2));
    assert_eq!(sink.events().len(), 1);
    assert_eq!(sink.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_delivery_gives_up_at_timeout() {
    let sink = Arc::new(MemorySink::stalled());
    let options = Options {
        wait_for_delivery: true,
        timeout: Duration::from_millis(300),
        ..Default::default()
    };
    let app = app(options, memory_hub(sink.clone()));

    let started = Instant::now();
    let response = app.oneshot(get_request("/orders/42")).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_millis(350));
    assert!(sink.events().is_empty());
    assert!(sink.pending() > 0);
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_waits_the_default() {
    let sink = Arc::new(MemorySink::stalled());
    let options = Options {
        wait_for_delivery: true,
        ..Default::default()
    };
    let app = app(options, memory_hub(sink.clone()));

    let started = Instant::now();
    app.oneshot(get_request("/orders/42")).await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_millis(2050));
}

#[tokio::test]
async fn test_no_wait_without_wait_for_delivery() {
    let sink = Arc::new(MemorySink::with_delivery_delay(Duration::from_millis(200)));
    let app = app(Options::default(), memory_hub(sink.clone()));

    let started = Instant::now();
    app.oneshot(get_request("/orders/42")).await.unwrap();

    assert!(started.elapsed() < Duration::from_millis(200));
    assert!(sink.events().is_empty());
    assert_eq!(sink.accepted(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_sampled_out_event_skips_wait() {
    let sink = Arc::new(MemorySink::stalled());
    let hub = memory_hub_with(
        sink.clone(),
        ClientOptions {
            sample_rate: 0.0,
            ..Default::default()
        },
    );
    let options = Options {
        wait_for_delivery: true,
        timeout: Duration::from_secs(1),
        ..Default::default()
    };
    let app = app(options, hub);

    let started = Instant::now();
    let response = app.oneshot(get_request("/orders/42")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(started.elapsed() < Duration::from_millis(1));
    assert_eq!(sink.accepted(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_hub_without_client_skips_wait() {
    let hub = Arc::new(Hub::new(None, Default::default()));
    let options = Options {
        wait_for_delivery: true,
        timeout: Duration::from_secs(1),
        ..Default::default()
    };
    let app = app(options, hub);

    let started = Instant::now();
    let response = app.oneshot(get_request("/orders/42")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(started.elapsed() < Duration::from_millis(1));
}

type Seen = Arc<Mutex<Option<(Arc<Hub>, bool)>>>;

fn probe_app(seen: Seen) -> Router {
    Router::new().route(
        "/probe",
        get(move |request: Request| {
            let seen = seen.clone();
            async move {
                let hub = request.extensions().get::<Arc<Hub>>().cloned();
                let has_span = request.extensions().get::<Span>().is_some();
                *seen.lock().unwrap() = hub.map(|hub| (hub, has_span));
                "ok"
            }
        }),
    )
}

#[tokio::test]
async fn test_missing_hub_is_created_for_request() {
    let sink = Arc::new(MemorySink::new());
    let base = memory_hub(sink.clone());
    let seen: Seen = Arc::default();
    let handler = ReportingHandler::new(Options::default()).with_hub(base.clone());
    let app = probe_app(seen.clone())
        .layer(middleware::from_fn_with_state(handler, report_panics));

    app.oneshot(get_request("/probe")).await.unwrap();

    let (hub, has_span) = seen.lock().unwrap().take().expect("hub in extensions");
    assert!(has_span);
    assert!(!Arc::ptr_eq(&hub, &base));
    assert!(hub.client().is_some());
    // Request context lands on the request hub only.
    assert!(hub.scope().request().is_some());
    assert!(base.scope().request().is_none());
}

#[tokio::test]
async fn test_existing_hub_is_reused() {
    let sink = Arc::new(MemorySink::new());
    let existing = memory_hub(sink.clone());
    let seen: Seen = Arc::default();
    let handler =
        ReportingHandler::new(Options::default()).with_hub(memory_hub(Arc::new(MemorySink::new())));
    let app = probe_app(seen.clone())
        .layer(middleware::from_fn_with_state(handler, report_panics))
        .layer(Extension(existing.clone()));

    app.oneshot(get_request("/probe")).await.unwrap();

    let (hub, _) = seen.lock().unwrap().take().expect("hub in extensions");
    assert!(Arc::ptr_eq(&hub, &existing));
    assert_eq!(sink.transactions().len(), 1);
}

#[tokio::test]
async fn test_panic_reports_through_existing_hub() {
    let sink = Arc::new(MemorySink::new());
    let default_sink = Arc::new(MemorySink::new());
    let existing = memory_hub(sink.clone());
    let handler = ReportingHandler::new(Options::default()).with_hub(memory_hub(default_sink.clone()));
    let app = routes()
        .layer(middleware::from_fn_with_state(handler, report_panics))
        .layer(Extension(existing.clone()));

    app.oneshot(get_request("/orders/7")).await.unwrap();

    assert_eq!(sink.events().len(), 1);
    assert!(default_sink.events().is_empty());
    assert_eq!(existing.last_event_id(), Some(sink.events()[0].event_id));
}

#[tokio::test]
async fn test_sentry_trace_header_continues_trace() {
    let sink = Arc::new(MemorySink::new());
    // Traces are off locally; the upstream decision samples the request.
    let hub = memory_hub_with(sink.clone(), ClientOptions::default());
    let app = app(Options::default(), hub);

    let trace_id: TraceId = "771a43a4192642f0b136d5159a501700".parse().unwrap();
    let request = HttpRequest::builder()
        .uri("/orders/1")
        .header("host", "shop.local")
        .header("sentry-trace", "771a43a4192642f0b136d5159a501700-b8fd5ea3d8e2a9c1-1")
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap();

    let transactions = sink.transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].trace.trace_id, trace_id);
    assert_eq!(
        transactions[0].trace.parent_span_id.map(|id| id.to_string()),
        Some("b8fd5ea3d8e2a9c1".to_string())
    );

    let events = sink.events();
    assert_eq!(events[0].trace.as_ref().unwrap().trace_id, trace_id);
}

#[tokio::test]
async fn test_unsampled_traceparent_records_no_transaction() {
    let sink = Arc::new(MemorySink::new());
    let app = app(Options::default(), memory_hub(sink.clone()));

    let request = HttpRequest::builder()
        .uri("/")
        .header("traceparent", "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-00")
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap();

    assert!(sink.transactions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_order_panic_end_to_end() {
    let sink = Arc::new(MemorySink::with_delivery_delay(Duration::from_millis(10)));
    let options = Options {
        repanic: false,
        wait_for_delivery: true,
        timeout: Duration::from_millis(500),
    };
    let app = app(options, memory_hub(sink.clone()));

    let started = Instant::now();
    let response = app.oneshot(get_request("/orders/42")).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(elapsed < Duration::from_millis(500));

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].exception[0].value.as_deref(), Some("boom"));
    assert_eq!(
        events[0].request.as_ref().map(|request| request.url.as_str()),
        Some("http://shop.local/orders/42")
    );

    let transactions = sink.transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].status, SpanStatus::InternalError);
}
