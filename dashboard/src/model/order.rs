use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{Display as EnumDisplay, EnumString};

use crate::model::ModelId;
use crate::model::dates::optional_date;

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumDisplay, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    PaymentSelection,
    Ordered,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    #[serde(other)]
    #[default]
    Unknown,
}

/// Missing or null statuses decode as `Unknown` instead of failing the record.
pub(crate) fn status_or_unknown<'de, D>(deserializer: D) -> Result<OrderStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<OrderStatus>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    #[serde(default)]
    pub id: Option<ModelId>,
    pub name: String,
    #[serde(default)]
    pub price: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product: CartProduct,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub selected_weight: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: ModelId,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default, deserialize_with = "status_or_unknown")]
    pub status: OrderStatus,
    #[serde(default)]
    pub cart_items: Vec<CartItem>,
    #[serde(default, deserialize_with = "optional_date")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn customer_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname).trim().to_string()
    }
}
