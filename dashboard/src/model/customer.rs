use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ModelId;
use crate::model::dates::{date_or_now, optional_date};
use crate::model::order::{OrderStatus, status_or_unknown};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerOrderSummary {
    pub id: ModelId,
    #[serde(default, deserialize_with = "status_or_unknown")]
    pub status: OrderStatus,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default, deserialize_with = "optional_date")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Totals are computed server-side; dates are always valid after decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: ModelId,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub total_orders: u64,
    #[serde(default)]
    pub total_spent: f64,
    #[serde(default = "Utc::now", deserialize_with = "date_or_now")]
    pub last_order_date: DateTime<Utc>,
    #[serde(default = "Utc::now", deserialize_with = "date_or_now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub orders: Vec<CustomerOrderSummary>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname).trim().to_string()
    }
}
