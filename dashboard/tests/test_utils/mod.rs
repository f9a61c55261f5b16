#![allow(dead_code)]

use async_trait::async_trait;
use common::test_helpers::{
    affiliate_json, affiliate_order_json, cart_item_json, customer_json, envelope, list_envelope,
    order_json, product_json,
};
use dashboard::{
    FetchResult, QueryCache, QueryClient,
    fetcher::ResourceFetcher,
    hooks::{DashboardHooks, QuerySettings},
    retry::RetryPolicy,
    transport::{ApiRequest, ApiResponse, HttpTransport},
};
use http::Method;
use mockall::mock;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// Expectation-style transport for asserting on individual requests.
mock! {
    pub Transport {}

    #[async_trait]
    impl HttpTransport for Transport {
        async fn send(&self, request: ApiRequest) -> FetchResult<ApiResponse>;
    }
}

type Responder = Box<dyn Fn(&ApiRequest) -> FetchResult<ApiResponse> + Send + Sync>;

/// Hand-written transport that records every request and can delay its
/// answer, for tests about how many requests concurrent callers produce.
pub struct StubTransport {
    responder: Responder,
    delay: Duration,
    requests: Mutex<Vec<ApiRequest>>,
}

impl StubTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ApiRequest) -> FetchResult<ApiResponse> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Stub answering the admin API routes with fixture data.
    pub fn admin_api() -> Self {
        Self::new(admin_api_response)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn calls_to(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn send(&self, request: ApiRequest) -> FetchResult<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.responder)(&request)
    }
}

pub fn ok_json(value: Value) -> FetchResult<ApiResponse> {
    Ok(ApiResponse::json(200, &value))
}

pub fn status_json(status: u16, value: Value) -> FetchResult<ApiResponse> {
    Ok(ApiResponse::json(status, &value))
}

fn product_id(path: &str) -> Option<i64> {
    path.strip_prefix("/api/products/")?.parse().ok()
}

pub fn admin_api_response(request: &ApiRequest) -> FetchResult<ApiResponse> {
    let path = request.path.as_str();
    match (request.method.as_str(), path) {
        ("GET", "/api/products") => ok_json(list_envelope(
            vec![product_json(1, "Semaglutide", Some(40)), product_json(2, "BPC-157", None)],
            1,
            8,
            2,
        )),
        ("GET", "/api/dashboard/popular-products") => ok_json(envelope(json!([
            product_json(3, "Tirzepatide", Some(90)),
            product_json(1, "Semaglutide", Some(40)),
        ]))),
        ("GET", "/api/orders") => ok_json(list_envelope(
            vec![order_json(
                10,
                "payment_selection",
                json!("2024-04-01T09:00:00Z"),
                vec![cart_item_json("Semaglutide", Some(2), Some("10mg"))],
            )],
            1,
            10,
            1,
        )),
        ("GET", "/api/customers") => ok_json(list_envelope(
            vec![customer_json(1, Value::Null), customer_json(2, json!("2024-05-01T00:00:00Z"))],
            1,
            10,
            2,
        )),
        ("GET", "/api/affiliates") => ok_json(list_envelope(
            vec![affiliate_json("rec1", "SPRING")],
            1,
            10,
            1,
        )),
        ("GET", p) if p.ends_with("/orders") && p.starts_with("/api/affiliates/") => {
            ok_json(list_envelope(vec![affiliate_order_json("o1", "SPRING")], 1, 10, 1))
        }
        ("GET", p) if p.ends_with("/stats") && p.starts_with("/api/affiliates/") => {
            ok_json(envelope(json!({ "totalOrders": 4, "totalSales": 120.5, "totalCommission": 12.05 })))
        }
        ("GET", p) => match product_id(p) {
            Some(id) => ok_json(envelope(product_json(id, "Semaglutide", Some(40)))),
            None => status_json(404, json!({ "success": false, "message": "Not found" })),
        },
        ("PATCH", p) => match product_id(p) {
            Some(id) => {
                let mut product = product_json(id, "Semaglutide", Some(40));
                if let Some(body) = request.body.as_ref().and_then(Value::as_object) {
                    for (field, value) in body {
                        product[field] = value.clone();
                    }
                }
                ok_json(envelope(product))
            }
            None => status_json(404, json!({ "success": false })),
        },
        _ => status_json(405, json!({ "success": false })),
    }
}

pub fn hooks_with(transport: Arc<dyn HttpTransport>, settings: QuerySettings) -> DashboardHooks {
    DashboardHooks::new(
        QueryClient::new(QueryCache::new(), RetryPolicy::none()),
        ResourceFetcher::new(transport),
        settings,
    )
}

/// Settings under which every query stays fresh for five minutes.
pub fn long_lived_settings() -> QuerySettings {
    QuerySettings {
        stale_time: Duration::from_secs(300),
        popular_products_stale_time: Duration::from_secs(600),
        gc_time: Duration::from_secs(900),
    }
}
