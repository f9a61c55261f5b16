/// Shared Test Helpers for Cross-Crate Use
///
/// JSON fixtures shaped like the admin API responses, so the dashboard test
/// suites do not each re-declare the envelope and entity layouts.
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};

// Global counter for unique identifiers across parallel tests
static GLOBAL_TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique string identifier, e.g. for affiliate codes.
///
/// # Returns
/// A string in the format: "{prefix}-{counter}"
pub fn generate_unique_id(prefix: &str) -> String {
    let counter = GLOBAL_TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}", prefix, counter)
}

/// Wrap a single value in the `{success: true, data}` envelope.
pub fn envelope(data: Value) -> Value {
    json!({ "success": true, "data": data })
}

/// Wrap a list in the envelope with a pagination block.
pub fn list_envelope(items: Vec<Value>, page: u32, limit: u32, total: u64) -> Value {
    json!({
        "success": true,
        "data": items,
        "pagination": { "page": page, "limit": limit, "total": total }
    })
}

/// Envelope reported by the server when it could not serve the request.
pub fn failed_envelope(message: &str) -> Value {
    json!({ "success": false, "message": message })
}

pub fn product_json(id: i64, name: &str, total_sales: Option<i64>) -> Value {
    let mut product = json!({
        "id": id,
        "name": name,
        "price": "19.99",
        "weight": "10mg",
        "category": "peptides",
        "image": format!("/images/{}.png", id),
        "imageAlt": name,
        "stock": 12,
        "lowStockThreshold": 5
    });
    if let Some(total_sales) = total_sales {
        product["salesData"] = json!({ "totalSales": total_sales });
    }
    product
}

pub fn cart_item_json(name: &str, quantity: Option<u32>, selected_weight: Option<&str>) -> Value {
    let mut item = json!({ "product": { "id": 1, "name": name, "price": "10.00" } });
    if let Some(quantity) = quantity {
        item["quantity"] = json!(quantity);
    }
    if let Some(weight) = selected_weight {
        item["selectedWeight"] = json!(weight);
    }
    item
}

pub fn order_json(id: i64, status: &str, created_at: Value, cart_items: Vec<Value>) -> Value {
    json!({
        "id": id,
        "firstname": "Ada",
        "lastname": "Lovelace",
        "status": status,
        "cartItems": cart_items,
        "createdAt": created_at
    })
}

pub fn customer_json(id: i64, last_order_date: Value) -> Value {
    json!({
        "id": id,
        "firstname": "Grace",
        "lastname": "Hopper",
        "email": format!("customer{}@example.com", id),
        "phone": null,
        "totalOrders": 2,
        "totalSpent": 59.5,
        "lastOrderDate": last_order_date,
        "createdAt": "2024-01-15T10:00:00Z",
        "orders": [
            { "id": 100 + id, "status": "shipped", "total": 29.75, "createdAt": "2024-02-01T08:30:00Z" }
        ]
    })
}

pub fn affiliate_json(id: &str, code: &str) -> Value {
    json!({
        "id": id,
        "Code": code,
        "name": "Partner",
        "email": "partner@example.com",
        "status": "active",
        "payoutMethod": "paypal"
    })
}

pub fn affiliate_order_json(id: &str, code: &str) -> Value {
    json!({
        "id": id,
        "affiliatecode": code,
        "orderTotal": 42.0
    })
}
