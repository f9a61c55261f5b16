use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::model::{
    Affiliate, AffiliateListParams, AffiliateOrder, AffiliateStats, Customer, CustomerListParams,
    Envelope, ModelId, Order, OrderListParams, Page, PageRequest, Product, ProductListParams,
    ProductPatch,
};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};

pub const ORDERS_PATH: &str = "/api/orders";
pub const PRODUCTS_PATH: &str = "/api/products";
pub const POPULAR_PRODUCTS_PATH: &str = "/api/dashboard/popular-products";
pub const CUSTOMERS_PATH: &str = "/api/customers";
pub const AFFILIATES_PATH: &str = "/api/affiliates";

/// The orders list only ever shows orders awaiting payment selection.
pub const PINNED_ORDER_STATUS: &str = "payment_selection";
pub const UPDATE_PRODUCT_FALLBACK_MESSAGE: &str = "Failed to update product";

/// Request construction, shared by the fetcher and by anything that needs a
/// request's cache key without sending it.
pub mod requests {
    use super::*;
    use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

    fn paged(path: impl Into<String>, page: PageRequest) -> ApiRequest {
        ApiRequest::get(path)
            .param("page", page.page)
            .param("limit", page.limit)
    }

    pub fn list_orders(params: &OrderListParams) -> ApiRequest {
        paged(ORDERS_PATH, params.page)
            .param("status", PINNED_ORDER_STATUS)
            .optional_param("search", params.search.as_deref())
    }

    pub fn get_order(id: ModelId) -> ApiRequest {
        ApiRequest::get(format!("{}/{}", ORDERS_PATH, id))
    }

    pub fn list_products(params: &ProductListParams) -> ApiRequest {
        paged(PRODUCTS_PATH, params.page)
            .optional_param("category", params.category.as_deref())
            .optional_param("search", params.search.as_deref())
    }

    pub fn get_product(id: ModelId) -> ApiRequest {
        ApiRequest::get(product_path(id))
    }

    pub fn product_path(id: ModelId) -> String {
        format!("{}/{}", PRODUCTS_PATH, id)
    }

    pub fn list_popular_products() -> ApiRequest {
        ApiRequest::get(POPULAR_PRODUCTS_PATH)
    }

    pub fn list_customers(params: &CustomerListParams) -> ApiRequest {
        paged(CUSTOMERS_PATH, params.page).optional_param("search", params.search.as_deref())
    }

    pub fn list_affiliates(params: &AffiliateListParams) -> ApiRequest {
        paged(AFFILIATES_PATH, params.page)
            .optional_param("search", params.search.as_deref())
            .optional_param("status", params.status.as_deref())
    }

    pub fn list_affiliate_orders(code: &str, page: PageRequest) -> ApiRequest {
        paged(format!("{}/{}/orders", AFFILIATES_PATH, encode_segment(code)), page)
    }

    pub fn get_affiliate_stats(code: &str) -> ApiRequest {
        ApiRequest::get(format!("{}/{}/stats", AFFILIATES_PATH, encode_segment(code)))
    }

    /// Characters escaped in a single path segment: the URL path set plus
    /// `/`, `%` and `+`, so the server sees the code exactly as given.
    const PATH_SEGMENT: &AsciiSet = &CONTROLS
        .add(b' ')
        .add(b'"')
        .add(b'#')
        .add(b'<')
        .add(b'>')
        .add(b'?')
        .add(b'`')
        .add(b'{')
        .add(b'}')
        .add(b'/')
        .add(b'%')
        .add(b'+');

    fn encode_segment(segment: &str) -> String {
        utf8_percent_encode(segment.trim(), PATH_SEGMENT).to_string()
    }
}

/// Issues exactly one request per call and decodes the response envelope.
///
/// Every operation returns a typed [`FetchResult`]; deciding whether a
/// failure is shown or replaced by an empty result is left to the caller.
#[derive(Clone)]
pub struct ResourceFetcher {
    transport: Arc<dyn HttpTransport>,
}

impl ResourceFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    pub async fn list_orders(&self, params: &OrderListParams) -> FetchResult<Page<Order>> {
        if let Some(status) = params.status.as_deref().filter(|s| *s != PINNED_ORDER_STATUS) {
            debug!(requested = status, pinned = PINNED_ORDER_STATUS, "Ignoring order status filter");
        }
        self.fetch_page(requests::list_orders(params), params.page).await
    }

    pub async fn get_order(&self, id: ModelId) -> FetchResult<Option<Order>> {
        self.fetch_item(requests::get_order(id)).await
    }

    pub async fn list_products(&self, params: &ProductListParams) -> FetchResult<Page<Product>> {
        self.fetch_page(requests::list_products(params), params.page).await
    }

    pub async fn get_product(&self, id: ModelId) -> FetchResult<Option<Product>> {
        self.fetch_item(requests::get_product(id)).await
    }

    /// Already ranked by the server; the order is kept as received.
    pub async fn list_popular_products(&self) -> FetchResult<Vec<Product>> {
        let request = requests::list_popular_products();
        let path = request.path.clone();
        let envelope = read_envelope(self.transport.send(request).await?, &path)?;
        Ok(decode_vec(envelope, &path))
    }

    pub async fn update_product(&self, patch: &ProductPatch) -> FetchResult<Product> {
        let path = requests::product_path(patch.id);
        let body = serde_json::to_value(patch)?;
        debug!(product_id = patch.id, body = %body, "Updating product");

        let response = self
            .transport
            .send(ApiRequest::patch(path.clone(), body))
            .await?;

        if !response.is_success() {
            let message = server_message(&response.body)
                .unwrap_or_else(|| UPDATE_PRODUCT_FALLBACK_MESSAGE.to_string());
            warn!(product_id = patch.id, status = response.status, %message, "Product update rejected");
            return Err(FetchError::Validation {
                status: response.status,
                message,
            });
        }

        let value: Value = serde_json::from_slice(&response.body)?;
        decode_product_payload(value, response.status)
    }

    pub async fn list_customers(&self, params: &CustomerListParams) -> FetchResult<Page<Customer>> {
        self.fetch_page(requests::list_customers(params), params.page).await
    }

    pub async fn list_affiliates(
        &self,
        params: &AffiliateListParams,
    ) -> FetchResult<Page<Affiliate>> {
        self.fetch_page(requests::list_affiliates(params), params.page).await
    }

    pub async fn list_affiliate_orders(
        &self,
        code: &str,
        page: PageRequest,
    ) -> FetchResult<Page<AffiliateOrder>> {
        if code.trim().is_empty() {
            return Err(FetchError::MissingParameter("affiliate code"));
        }
        self.fetch_page(requests::list_affiliate_orders(code, page), page).await
    }

    pub async fn get_affiliate_stats(&self, code: &str) -> FetchResult<AffiliateStats> {
        if code.trim().is_empty() {
            return Err(FetchError::MissingParameter("affiliate code"));
        }
        let request = requests::get_affiliate_stats(code);
        let path = request.path.clone();
        let envelope = read_envelope(self.transport.send(request).await?, &path)?;
        Ok(decode_data::<AffiliateStats>(envelope, &path).unwrap_or_default())
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        page: PageRequest,
    ) -> FetchResult<Page<T>> {
        let path = request.path.clone();
        let envelope = read_envelope(self.transport.send(request).await?, &path)?;
        Ok(decode_page(envelope, page, &path))
    }

    async fn fetch_item<T: DeserializeOwned>(&self, request: ApiRequest) -> FetchResult<Option<T>> {
        let path = request.path.clone();
        let response = self.transport.send(request).await?;
        if response.status == 404 {
            debug!(%path, "Resource not found");
            return Ok(None);
        }
        let envelope = read_envelope(response, &path)?;
        Ok(decode_data(envelope, &path))
    }
}

fn read_envelope(response: ApiResponse, path: &str) -> FetchResult<Envelope<Value>> {
    if !response.is_success() {
        return Err(FetchError::Status {
            status: response.status,
            path: path.to_string(),
        });
    }
    Ok(serde_json::from_slice(&response.body)?)
}

fn decode_data<T: DeserializeOwned>(envelope: Envelope<Value>, path: &str) -> Option<T> {
    if !envelope.success {
        warn!(%path, message = ?envelope.message, "API reported failure");
        return None;
    }
    let data = envelope.data?;
    match serde_json::from_value(data) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(%path, error = %e, "Malformed data in response");
            None
        }
    }
}

fn decode_vec<T: DeserializeOwned>(envelope: Envelope<Value>, path: &str) -> Vec<T> {
    decode_data(envelope, path).unwrap_or_default()
}

fn decode_page<T: DeserializeOwned>(
    mut envelope: Envelope<Value>,
    request: PageRequest,
    path: &str,
) -> Page<T> {
    let pagination = envelope.pagination.take().unwrap_or_default();
    match decode_data::<Vec<T>>(envelope, path) {
        Some(items) => {
            let total = if pagination.total > 0 {
                pagination.total
            } else {
                items.len() as u64
            };
            Page {
                items,
                total,
                page: if pagination.page > 0 { pagination.page } else { request.page },
                limit: if pagination.limit > 0 { pagination.limit } else { request.limit },
                success: true,
            }
        }
        None => Page::unsuccessful(),
    }
}

fn server_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<Envelope<Value>>(body)
        .ok()
        .and_then(|envelope| envelope.message)
        .filter(|m| !m.trim().is_empty())
}

/// The PATCH endpoint answers either with an envelope or with the bare product.
fn decode_product_payload(value: Value, status: u16) -> FetchResult<Product> {
    if value.get("success").is_none() {
        return Ok(serde_json::from_value(value)?);
    }
    let envelope: Envelope<Product> = serde_json::from_value(value)?;
    if !envelope.success {
        return Err(FetchError::Validation {
            status,
            message: envelope
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| UPDATE_PRODUCT_FALLBACK_MESSAGE.to_string()),
        });
    }
    envelope
        .data
        .ok_or_else(|| FetchError::Parse("product update response has no data".to_string()))
}
