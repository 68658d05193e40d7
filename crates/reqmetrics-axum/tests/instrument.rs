#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::handler::Handler;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use reqmetrics_axum::Instrument;
use reqmetrics_core::{Collector, ErrorKind, Registry};

fn request(method: Method, status: u16) -> Request {
    Request::builder()
        .method(method)
        .uri("/anything")
        .header("x-status", status.to_string())
        .body(Body::empty())
        .unwrap()
}

async fn send<H, T>(handler: H, req: Request) -> Response
where
    H: Handler<T, ()>,
{
    handler.call(req, ()).await
}

/// Responds with the status named in `x-status`.
async fn echo_status(headers: HeaderMap) -> impl IntoResponse {
    let code = headers
        .get("x-status")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(200);
    (StatusCode::from_u16(code).unwrap(), "echo")
}

async fn greeting() -> impl IntoResponse {
    ([("x-greeting", "hello")], "hello, world")
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_millis(20)).await;
    "done"
}

async fn boom() -> &'static str {
    panic!("handler failed")
}

#[tokio::test]
async fn counts_each_status_separately() {
    let reg = Registry::new();
    let inst = Instrument::builder().register(&reg).unwrap();
    let wrapped = inst.wrap("/items", echo_status);

    for status in [200, 200, 404, 500, 200] {
        send(wrapped.clone(), request(Method::GET, status)).await;
    }
    send(wrapped.clone(), request(Method::POST, 201)).await;

    let c = inst.counter();
    assert_eq!(c.get(&["GET", "/items", "200"]), Some(3));
    assert_eq!(c.get(&["GET", "/items", "404"]), Some(1));
    assert_eq!(c.get(&["GET", "/items", "500"]), Some(1));
    assert_eq!(c.get(&["POST", "/items", "201"]), Some(1));
    assert_eq!(c.get(&["POST", "/items", "200"]), None);
    assert_eq!(c.series_len(), 4);
}

#[tokio::test]
async fn counter_only_has_no_histogram_series() {
    let reg = Registry::new();
    let inst = Instrument::builder().register(&reg).unwrap();
    assert!(!inst.has_histogram());
    assert!(inst.histogram().is_none());

    let wrapped = inst.wrap("/items", echo_status);
    send(wrapped.clone(), request(Method::GET, 200)).await;
    send(wrapped, request(Method::GET, 404)).await;

    let samples = inst.collect();
    assert_eq!(samples.len(), 2);
    assert!(samples.iter().all(|s| s.histogram().is_none()));
    assert_eq!(inst.describe().len(), 1);
    assert!(!reg.is_registered("http_handled_latency_seconds").unwrap());
}

#[tokio::test]
async fn histogram_has_one_series_per_tuple() {
    let reg = Registry::new();
    let inst = Instrument::builder()
        .with_histogram(vec![0.1, 1.0])
        .register(&reg)
        .unwrap();
    let wrapped = inst.wrap("/items", echo_status);

    send(wrapped.clone(), request(Method::GET, 200)).await;
    send(wrapped.clone(), request(Method::GET, 200)).await;
    send(wrapped, request(Method::GET, 503)).await;

    let samples = reg.gather().unwrap();
    let hists: Vec<_> = samples.iter().filter(|s| s.histogram().is_some()).collect();
    assert_eq!(hists.len(), 2);
    assert!(hists.iter().all(|s| s.name == "http_handled_latency_seconds"));

    let ok = hists
        .iter()
        .find(|s| s.label("status_code") == Some("200"))
        .unwrap();
    assert_eq!(ok.histogram().unwrap().count, 2);
    assert_eq!(inst.describe().len(), 2);
}

#[tokio::test]
async fn latency_is_recorded_in_seconds() {
    let reg = Registry::new();
    let inst = Instrument::builder()
        .with_histogram(vec![0.001, 10.0])
        .register(&reg)
        .unwrap();

    let req = Request::builder().uri("/slow").body(Body::empty()).unwrap();
    send(inst.wrap("/slow", slow), req).await;

    let h = inst
        .histogram()
        .unwrap()
        .with_label_values(&["GET", "/slow", "200"])
        .unwrap()
        .snapshot();
    assert_eq!(h.count, 1);
    assert_eq!(h.buckets[0].cumulative_count, 0);
    assert_eq!(h.buckets[1].cumulative_count, 1);
    assert!(h.sum >= 0.02, "sum was {}", h.sum);
}

#[tokio::test]
async fn api_group_prefixes_path_label() {
    let reg = Registry::new();
    let inst = Instrument::builder().api_group("/v1").register(&reg).unwrap();
    let wrapped = inst.wrap("/users", echo_status);
    assert_eq!(wrapped.full_path(), "/v1/users");

    send(wrapped, request(Method::GET, 200)).await;

    let samples = inst.collect();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].label("path"), Some("/v1/users"));
    assert_eq!(inst.counter().get(&["GET", "/users", "200"]), None);
}

#[tokio::test]
async fn records_final_status_code() {
    let reg = Registry::new();
    let inst = Instrument::builder().register(&reg).unwrap();
    let wrapped = inst.wrap("/items", echo_status);

    let res = send(wrapped.clone(), request(Method::GET, 404)).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    send(wrapped, request(Method::GET, 200)).await;

    let mut statuses: Vec<String> = inst
        .collect()
        .iter()
        .map(|s| s.label("status_code").unwrap().to_string())
        .collect();
    statuses.sort();
    assert_eq!(statuses, vec!["200", "404"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_lose_no_updates() {
    let reg = Registry::new();
    let inst = Instrument::builder()
        .with_histogram(vec![])
        .register(&reg)
        .unwrap();
    let wrapped = inst.wrap("/hot", echo_status);

    let tasks: Vec<_> = (0..1000)
        .map(|_| {
            let h = wrapped.clone();
            tokio::spawn(async move { send(h, request(Method::GET, 200)).await.status() })
        })
        .collect();
    for t in tasks {
        assert_eq!(t.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(inst.counter().get(&["GET", "/hot", "200"]), Some(1000));
    let h = inst
        .histogram()
        .unwrap()
        .with_label_values(&["GET", "/hot", "200"])
        .unwrap()
        .snapshot();
    assert_eq!(h.count, 1000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn collect_runs_safely_alongside_recording() {
    let reg = Arc::new(Registry::new());
    let inst = Instrument::builder()
        .with_histogram(vec![])
        .register(&reg)
        .unwrap();

    let routes: Vec<_> = (0..50)
        .map(|i| inst.wrap(&format!("/route/{i}"), echo_status))
        .collect();

    let done = Arc::new(AtomicBool::new(false));
    let scraper = {
        let inst = inst.clone();
        let reg = Arc::clone(&reg);
        let done = Arc::clone(&done);
        tokio::spawn(async move {
            let mut scrapes = 0u32;
            while !done.load(Ordering::Relaxed) || scrapes < 200 {
                let seen: u64 = inst.collect().iter().filter_map(|s| s.counter_value()).sum();
                assert!(seen <= 2000);
                reg.gather().unwrap();
                scrapes += 1;
                tokio::task::yield_now().await;
            }
            scrapes
        })
    };

    let tasks: Vec<_> = (0..2000)
        .map(|i| {
            let h = routes[i % routes.len()].clone();
            tokio::spawn(async move { send(h, request(Method::GET, 200)).await.status() })
        })
        .collect();
    for t in tasks {
        assert_eq!(t.await.unwrap(), StatusCode::OK);
    }
    done.store(true, Ordering::Relaxed);
    assert!(scraper.await.unwrap() >= 200);

    let samples = inst.collect();
    let total: u64 = samples.iter().filter_map(|s| s.counter_value()).sum();
    assert_eq!(total, 2000);
    assert_eq!(inst.counter().series_len(), 50);
    assert_eq!(inst.histogram().unwrap().series_len(), 50);
    assert_eq!(inst.counter().get(&["GET", "/route/7", "200"]), Some(40));
}

#[tokio::test]
async fn response_passes_through_unchanged() {
    let reg = Registry::new();
    let inst = Instrument::builder()
        .with_histogram(vec![])
        .register(&reg)
        .unwrap();

    let req = || Request::builder().uri("/greet").body(Body::empty()).unwrap();
    let plain = send(greeting, req()).await;
    let wrapped = send(inst.wrap("/greet", greeting), req()).await;

    assert_eq!(plain.status(), wrapped.status());
    assert_eq!(plain.headers(), wrapped.headers());
    let plain = to_bytes(plain.into_body(), usize::MAX).await.unwrap();
    let wrapped = to_bytes(wrapped.into_body(), usize::MAX).await.unwrap();
    assert_eq!(plain, wrapped);
    assert_eq!(&wrapped[..], b"hello, world");
}

#[tokio::test]
async fn panicking_handler_propagates_and_records_nothing() {
    let reg = Registry::new();
    let inst = Instrument::builder().register(&reg).unwrap();
    let wrapped = inst.wrap("/boom", boom);

    let req = Request::builder().uri("/boom").body(Body::empty()).unwrap();
    let err = tokio::spawn(send(wrapped, req)).await.expect_err("must panic");
    assert!(err.is_panic());
    assert_eq!(inst.counter().series_len(), 0);
}

#[test]
fn colliding_names_fail_registration() {
    let reg = Registry::new();
    Instrument::builder().register(&reg).unwrap();

    let err = Instrument::builder()
        .api_group("/v2")
        .register(&reg)
        .err()
        .expect("must fail");
    assert_eq!(err.kind(), ErrorKind::DuplicateName);

    Instrument::builder()
        .namespace("admin")
        .with_histogram(vec![])
        .register(&reg)
        .unwrap();
    assert!(reg.is_registered("admin_handled_total").unwrap());
    assert!(reg.is_registered("admin_handled_latency_seconds").unwrap());
}

#[test]
fn histogram_collision_registers_nothing() {
    let reg = Registry::new();
    Instrument::builder()
        .namespace("api")
        .with_histogram(vec![])
        .register(&reg)
        .unwrap();

    let err = Instrument::builder()
        .namespace("api")
        .with_histogram(vec![0.5])
        .register(&reg)
        .err()
        .expect("must fail");
    assert_eq!(err.kind(), ErrorKind::DuplicateName);
    assert_eq!(reg.describe().unwrap().len(), 2);
}

#[test]
fn bad_buckets_fail_construction() {
    let reg = Registry::new();
    let err = Instrument::builder()
        .with_histogram(vec![1.0, 0.5])
        .register(&reg)
        .err()
        .expect("must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidBuckets);
    assert!(!reg.is_registered("http_handled_total").unwrap());
}
