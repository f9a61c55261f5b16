//! Pure helpers behind the dashboard widgets (recent orders, popular products,
//! stock warnings). Rendering lives elsewhere; these fix what gets rendered.

use crate::cache::QueryState;
use crate::model::{Order, OrderStatus, Page, Product};

pub const NO_PRODUCTS: &str = "No products";
pub const INVALID_DATE: &str = "Invalid date";
pub const POPULAR_PRODUCTS_LIMIT: usize = 4;

/// Label for the products of an order: the first item, its selected weight
/// when it is the only item, and a count of the rest.
pub fn product_name(order: &Order) -> String {
    let Some(first) = order.cart_items.first() else {
        return NO_PRODUCTS.to_string();
    };
    let name = &first.product.name;
    match order.cart_items.len() {
        1 => match first.selected_weight.as_deref().filter(|w| !w.trim().is_empty()) {
            Some(weight) => format!("{} ({})", name, weight),
            None => name.clone(),
        },
        n => format!("{} + {} more", name, n - 1),
    }
}

/// Total quantity across cart items; an item without a quantity counts once.
pub fn items_count(order: &Order) -> u32 {
    order
        .cart_items
        .iter()
        .map(|item| item.quantity.unwrap_or(1))
        .sum()
}

/// `payment_selection` is shown to admins as "ordered".
pub fn status_label(status: &OrderStatus) -> String {
    match status {
        OrderStatus::PaymentSelection => OrderStatus::Ordered.to_string(),
        other => other.to_string(),
    }
}

pub fn format_order_date(order: &Order) -> String {
    order
        .created_at
        .map(|dt| dt.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| INVALID_DATE.to_string())
}

/// Best sellers first (positive sales, descending; ties keep input order),
/// padded with the remaining products in input order, cut to `limit`.
pub fn rank_popular_products(products: &[Product], limit: usize) -> Vec<Product> {
    let (mut selling, rest): (Vec<&Product>, Vec<&Product>) =
        products.iter().partition(|p| p.total_sales() > 0);
    selling.sort_by_key(|p| std::cmp::Reverse(p.total_sales()));
    selling
        .into_iter()
        .chain(rest)
        .take(limit)
        .cloned()
        .collect()
}

pub fn low_stock_products(products: &[Product]) -> Vec<&Product> {
    products.iter().filter(|p| p.is_low_stock()).collect()
}

/// Most recent orders first; orders without a date go last.
pub fn recent_orders(orders: &[Order], limit: usize) -> Vec<&Order> {
    let mut sorted: Vec<&Order> = orders.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted.truncate(limit);
    sorted
}

/// Which branch a list widget renders.
#[derive(Debug, PartialEq)]
pub enum ViewState<'a, T> {
    Skeleton,
    Empty,
    Ready(&'a [T]),
}

impl<'a, T> ViewState<'a, T> {
    pub fn from_items(loading: bool, items: &'a [T]) -> Self {
        if loading {
            ViewState::Skeleton
        } else if items.is_empty() {
            ViewState::Empty
        } else {
            ViewState::Ready(items)
        }
    }

    /// A failed list renders like an empty one.
    pub fn from_page(state: &'a QueryState<Page<T>>) -> Self {
        let items = state.data().map(|page| page.items.as_slice()).unwrap_or(&[]);
        Self::from_items(state.is_loading, items)
    }

    pub fn from_list(state: &'a QueryState<Vec<T>>) -> Self {
        let items = state.data().map(Vec::as_slice).unwrap_or(&[]);
        Self::from_items(state.is_loading, items)
    }
}
