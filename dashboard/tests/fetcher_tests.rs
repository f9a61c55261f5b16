mod test_utils;

use common::test_helpers::{
    customer_json, envelope, failed_envelope, list_envelope, order_json, product_json,
};
use dashboard::{
    FetchError,
    fetcher::{PINNED_ORDER_STATUS, ResourceFetcher, UPDATE_PRODUCT_FALLBACK_MESSAGE},
    model::{
        AffiliateListParams, CustomerListParams, OrderListParams, OrderStatus, Page, PageRequest,
        ProductListParams, ProductPatch,
    },
    transport::ApiResponse,
};
use serde_json::{Value, json};
use std::sync::Arc;
use test_utils::{MockTransport, StubTransport, ok_json, status_json};

#[tokio::test]
async fn list_orders_always_requests_payment_selection() {
    let cases = [(1, 10, None), (2, 25, Some("shipped")), (7, 1, Some("payment_selection")), (3, 50, Some(""))];

    for (page, limit, status) in cases {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(move |request| {
                request.path == "/api/orders"
                    && request.query_value("status") == Some(PINNED_ORDER_STATUS)
                    && request.query_value("page") == Some(page.to_string().as_str())
                    && request.query_value("limit") == Some(limit.to_string().as_str())
            })
            .times(1)
            .returning(|_| ok_json(list_envelope(vec![], 1, 10, 0)));

        let fetcher = ResourceFetcher::new(Arc::new(transport));
        let params = OrderListParams {
            status: status.map(str::to_string),
            ..OrderListParams::page(page, limit)
        };
        let result = fetcher.list_orders(&params).await.unwrap();
        assert!(result.success);
    }
}

#[tokio::test]
async fn optional_filters_are_absent_unless_set() {
    let transport = Arc::new(StubTransport::new(|_| ok_json(list_envelope(vec![], 1, 8, 0))));
    let fetcher = ResourceFetcher::new(transport.clone());

    fetcher.list_products(&ProductListParams::page(1, 8)).await.unwrap();
    fetcher
        .list_products(&ProductListParams {
            category: Some("peptides".into()),
            search: Some("sema".into()),
            ..ProductListParams::page(2, 8)
        })
        .await
        .unwrap();
    fetcher
        .list_affiliates(&AffiliateListParams {
            status: Some(String::new()),
            ..AffiliateListParams::page(1, 10)
        })
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].query_value("category"), None);
    assert_eq!(requests[0].query_value("search"), None);
    assert_eq!(requests[1].query_value("category"), Some("peptides"));
    assert_eq!(requests[1].query_value("search"), Some("sema"));
    assert_eq!(requests[2].query_value("status"), None);
}

#[tokio::test]
async fn list_orders_normalizes_dates() {
    let transport = StubTransport::new(|_| {
        ok_json(list_envelope(
            vec![
                order_json(1, "payment_selection", json!("2024-04-01T09:00:00Z"), vec![]),
                order_json(2, "payment_selection", Value::Null, vec![]),
                order_json(3, "shipped", json!("not-a-date"), vec![]),
            ],
            1,
            10,
            3,
        ))
    });
    let fetcher = ResourceFetcher::new(Arc::new(transport));

    let page = fetcher.list_orders(&OrderListParams::page(1, 10)).await.unwrap();
    assert_eq!(page.total, 3);
    assert!(page.items[0].created_at.is_some());
    assert!(page.items[1].created_at.is_none());
    assert!(page.items[2].created_at.is_none());
    assert_eq!(page.items[0].status, OrderStatus::PaymentSelection);
}

#[tokio::test]
async fn order_without_status_does_not_sink_the_page() {
    let transport = StubTransport::new(|_| {
        ok_json(list_envelope(
            vec![
                json!({ "id": 1, "firstname": "Ada", "lastname": "Lovelace" }),
                order_json(2, "payment_selection", Value::Null, vec![]),
            ],
            1,
            10,
            2,
        ))
    });
    let fetcher = ResourceFetcher::new(Arc::new(transport));

    let page = fetcher.list_orders(&OrderListParams::page(1, 10)).await.unwrap();
    assert!(page.success);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].status, OrderStatus::Unknown);
}

#[tokio::test]
async fn unsuccessful_envelope_yields_empty_page() {
    let transport = StubTransport::new(|_| ok_json(failed_envelope("database unavailable")));
    let fetcher = ResourceFetcher::new(Arc::new(transport));

    let page = fetcher.list_orders(&OrderListParams::page(1, 10)).await.unwrap();
    assert_eq!(page, Page::unsuccessful());
}

#[tokio::test]
async fn non_success_status_on_read_is_a_status_error() {
    let transport = StubTransport::new(|_| status_json(500, json!({ "success": false })));
    let fetcher = ResourceFetcher::new(Arc::new(transport));

    let err = fetcher.list_products(&ProductListParams::page(1, 8)).await.unwrap_err();
    assert_eq!(err, FetchError::Status { status: 500, path: "/api/products".into() });
}

#[tokio::test]
async fn malformed_json_is_a_parse_error() {
    let transport = StubTransport::new(|_| Ok(ApiResponse::new(200, "<html>oops</html>")));
    let fetcher = ResourceFetcher::new(Arc::new(transport));

    let err = fetcher.list_customers(&CustomerListParams::page(1, 10)).await.unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)));
}

#[tokio::test]
async fn missing_product_is_none() {
    let transport = StubTransport::new(|_| status_json(404, json!({ "success": false })));
    let fetcher = ResourceFetcher::new(Arc::new(transport));

    assert_eq!(fetcher.get_product(99).await.unwrap(), None);
    assert_eq!(fetcher.get_order(99).await.unwrap(), None);
}

#[tokio::test]
async fn get_product_decodes_envelope() {
    let transport = StubTransport::new(|_| ok_json(envelope(product_json(5, "Retatrutide", Some(3)))));
    let fetcher = ResourceFetcher::new(Arc::new(transport));

    let product = fetcher.get_product(5).await.unwrap().unwrap();
    assert_eq!(product.name, "Retatrutide");
    assert_eq!(product.total_sales(), 3);
    assert_eq!(product.price_amount(), Some(19.99));
}

#[tokio::test]
async fn popular_products_keep_server_order() {
    let transport = StubTransport::new(|_| {
        ok_json(envelope(json!([
            product_json(2, "B", Some(1)),
            product_json(1, "A", Some(99)),
        ])))
    });
    let fetcher = ResourceFetcher::new(Arc::new(transport));

    let ids: Vec<i64> = fetcher
        .list_popular_products()
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![2, 1]);
}

#[tokio::test]
async fn customers_with_null_dates_get_current_time() {
    let transport = StubTransport::new(|_| {
        ok_json(list_envelope(vec![customer_json(1, Value::Null)], 1, 10, 1))
    });
    let fetcher = ResourceFetcher::new(Arc::new(transport));

    let before = chrono::Utc::now();
    let page = fetcher.list_customers(&CustomerListParams::page(1, 10)).await.unwrap();
    let customer = &page.items[0];
    assert!(customer.last_order_date >= before);
    assert!(customer.last_order_date <= chrono::Utc::now());
    assert_eq!(customer.orders.len(), 1);
}

#[tokio::test]
async fn update_product_sends_only_changed_fields() {
    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .withf(|request| {
            request.method == http::Method::PATCH
                && request.path == "/api/products/7"
                && request.body == Some(json!({ "stock": 3 }))
        })
        .times(1)
        .returning(|_| ok_json(envelope(product_json(7, "Semaglutide", None))));
    let fetcher = ResourceFetcher::new(Arc::new(transport));

    let product = fetcher.update_product(&ProductPatch::new(7).stock(3)).await.unwrap();
    assert_eq!(product.id, 7);
}

#[tokio::test]
async fn update_product_accepts_bare_product() {
    let transport = StubTransport::new(|_| ok_json(product_json(7, "Semaglutide", None)));
    let fetcher = ResourceFetcher::new(Arc::new(transport));

    let product = fetcher.update_product(&ProductPatch::new(7).price("12.00")).await.unwrap();
    assert_eq!(product.id, 7);
}

#[tokio::test]
async fn update_product_surfaces_server_message() {
    let transport = StubTransport::new(|_| {
        status_json(422, json!({ "success": false, "message": "Stock cannot be negative" }))
    });
    let fetcher = ResourceFetcher::new(Arc::new(transport));

    let err = fetcher.update_product(&ProductPatch::new(7).stock(-1)).await.unwrap_err();
    assert_eq!(
        err,
        FetchError::Validation { status: 422, message: "Stock cannot be negative".into() }
    );
}

#[tokio::test]
async fn update_product_falls_back_to_generic_message() {
    let transport = StubTransport::new(|_| Ok(ApiResponse::new(500, "Internal Server Error")));
    let fetcher = ResourceFetcher::new(Arc::new(transport));

    let err = fetcher.update_product(&ProductPatch::new(7).stock(1)).await.unwrap_err();
    assert_eq!(err.to_string(), UPDATE_PRODUCT_FALLBACK_MESSAGE);
}

#[tokio::test]
async fn affiliate_requests_need_a_code() {
    let mut transport = MockTransport::new();
    transport.expect_send().times(0);
    let fetcher = ResourceFetcher::new(Arc::new(transport));

    assert_eq!(
        fetcher.list_affiliate_orders("", PageRequest::new(1, 10)).await.unwrap_err(),
        FetchError::MissingParameter("affiliate code")
    );
    assert_eq!(
        fetcher.get_affiliate_stats("   ").await.unwrap_err(),
        FetchError::MissingParameter("affiliate code")
    );
}

#[tokio::test]
async fn affiliate_orders_and_stats_hit_code_routes() {
    let transport = Arc::new(StubTransport::admin_api());
    let fetcher = ResourceFetcher::new(transport.clone());

    let orders = fetcher
        .list_affiliate_orders("SPRING", PageRequest::new(1, 10))
        .await
        .unwrap();
    assert_eq!(orders.items[0].affiliate_code, "SPRING");

    let stats = fetcher.get_affiliate_stats("SPRING").await.unwrap();
    assert_eq!(stats.total_orders, 4);

    let paths: Vec<String> = transport.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/api/affiliates/SPRING/orders", "/api/affiliates/SPRING/stats"]);
}

#[tokio::test]
async fn affiliate_code_with_spaces_is_path_encoded() {
    let transport = Arc::new(StubTransport::admin_api());
    let fetcher = ResourceFetcher::new(transport.clone());

    fetcher.get_affiliate_stats("SUMMER SALE").await.unwrap();

    assert_eq!(transport.requests()[0].path, "/api/affiliates/SUMMER%20SALE/stats");
}
