mod common;

use axum::{routing::get, Router};
use cart_service::config::CartConfig;
use cart_service::{serve_with_shutdown, Application};
use common::{router_with, InMemoryCartStore};
use service_core::config::Config as CoreConfig;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};

/// Cart router plus a `/slow` route that signals `started` and then sleeps.
fn router_with_slow_route(started: Arc<Notify>, delay: Duration) -> Router {
    router_with(InMemoryCartStore::new()).route(
        "/slow",
        get(move || {
            let started = started.clone();
            async move {
                started.notify_one();
                tokio::time::sleep(delay).await;
                "finished"
            }
        }),
    )
}

fn stop_signal() -> (oneshot::Sender<()>, impl Future<Output = ()> + Send + 'static) {
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    (stop_tx, async move {
        stop_rx.await.ok();
    })
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().expect("Failed to read address").port();
    (listener, format!("http://127.0.0.1:{}", port))
}

#[tokio::test]
async fn application_serves_until_signalled() {
    let common = CoreConfig {
        port: 0,
        log_level: "info".to_string(),
        otlp_endpoint: None,
    };
    let config = CartConfig::with_common(common);
    let store = InMemoryCartStore::new();

    let app = Application::with_store(&config, store.clone())
        .await
        .expect("Failed to build application");
    let address = format!("http://127.0.0.1:{}", app.port());

    let (stop_tx, signal) = stop_signal();
    let server = tokio::spawn(app.run_with_shutdown(signal));

    let response = reqwest::Client::new()
        .post(format!("{}/carts", address))
        .body("{}")
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());
    assert_eq!(store.cart_count(), 1);

    stop_tx.send(()).expect("Server already stopped");
    server
        .await
        .expect("Server task panicked")
        .expect("Server did not shut down cleanly");

    // The listener is closed once shutdown completes
    let refused = reqwest::Client::new()
        .get(format!("{}/health", address))
        .send()
        .await;
    assert!(refused.is_err());
}

#[tokio::test]
async fn in_flight_request_completes_during_shutdown() {
    let started = Arc::new(Notify::new());
    let router = router_with_slow_route(started.clone(), Duration::from_millis(300));
    let (listener, address) = bind().await;

    let (stop_tx, signal) = stop_signal();
    let server = tokio::spawn(serve_with_shutdown(
        listener,
        router,
        Duration::from_secs(5),
        signal,
    ));

    let request = tokio::spawn(async move {
        let response = reqwest::get(format!("{}/slow", address)).await?;
        response.text().await
    });
    started.notified().await;

    stop_tx.send(()).expect("Server already stopped");

    let body = request
        .await
        .expect("Request task panicked")
        .expect("In-flight request was cut off");
    assert_eq!(body, "finished");

    server
        .await
        .expect("Server task panicked")
        .expect("Server did not shut down cleanly");
}

#[tokio::test]
async fn connections_left_after_grace_period_are_closed() {
    let started = Arc::new(Notify::new());
    let router = router_with_slow_route(started.clone(), Duration::from_secs(60));
    let (listener, address) = bind().await;
    let grace_period = Duration::from_millis(200);

    let (stop_tx, signal) = stop_signal();
    let server = tokio::spawn(serve_with_shutdown(listener, router, grace_period, signal));

    let request = tokio::spawn(async move { reqwest::get(format!("{}/slow", address)).await });
    started.notified().await;

    stop_tx.send(()).expect("Server already stopped");

    let outcome = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("Server kept running past the grace period")
        .expect("Server task panicked");
    let err = outcome.expect_err("Shutdown should report the forced close");
    assert!(
        err.to_string().contains("server did not stop within"),
        "error: {}",
        err
    );

    // The dropped connection ends the request instead of leaving it hanging
    let response = tokio::time::timeout(Duration::from_secs(2), request)
        .await
        .expect("Connection was still open after the grace period")
        .expect("Request task panicked");
    assert!(response.is_err());
}
