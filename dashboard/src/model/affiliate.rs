use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Affiliate records come from an external system; beyond the id and referral
/// code the shape is not fixed, so unknown fields are kept in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affiliate {
    pub id: String,
    #[serde(alias = "Code")]
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Affiliate {
    pub fn owns(&self, order: &AffiliateOrder) -> bool {
        !self.code.is_empty() && self.code == order.affiliate_code
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffiliateOrder {
    pub id: String,
    #[serde(rename = "affiliatecode", alias = "affiliateCode", default)]
    pub affiliate_code: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateStats {
    #[serde(default)]
    pub total_orders: u64,
    #[serde(default)]
    pub total_sales: f64,
    #[serde(default)]
    pub total_commission: f64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
