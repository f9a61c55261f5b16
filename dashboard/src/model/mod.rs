use serde::{Deserialize, Serialize};

pub type ModelId = i64;

pub mod affiliate;
pub mod customer;
pub mod dates;
pub mod order;
pub mod product;

pub use affiliate::{Affiliate, AffiliateOrder, AffiliateStats};
pub use customer::{Customer, CustomerOrderSummary};
pub use order::{CartItem, CartProduct, Order, OrderStatus};
pub use product::{Product, ProductPatch, SalesData};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
}

/// `{success, data, pagination}` wrapper used by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default, alias = "error")]
    pub message: Option<String>,
}

/// One page of a list endpoint.
///
/// `success == false` means "no data"; it is not necessarily an error the
/// user is shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub success: bool,
}

impl<T> Page<T> {
    pub fn unsuccessful() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 0,
            limit: 0,
            success: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::unsuccessful()
    }
}

/// Page and page size of a list request; both 1-based and positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderListParams {
    pub page: PageRequest,
    /// Ignored by the orders endpoint, which always asks for `payment_selection`.
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductListParams {
    pub page: PageRequest,
    pub category: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerListParams {
    pub page: PageRequest,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AffiliateListParams {
    pub page: PageRequest,
    pub search: Option<String>,
    pub status: Option<String>,
}

impl ProductListParams {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page: PageRequest::new(page, limit),
            ..Default::default()
        }
    }
}

impl OrderListParams {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page: PageRequest::new(page, limit),
            ..Default::default()
        }
    }
}

impl CustomerListParams {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page: PageRequest::new(page, limit),
            ..Default::default()
        }
    }
}

impl AffiliateListParams {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page: PageRequest::new(page, limit),
            ..Default::default()
        }
    }
}
