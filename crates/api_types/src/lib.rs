use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Accepts ids sent either as JSON strings or numbers and keeps them as strings.
///
/// Remote ids are 64-bit and exceed the precision of a JSON double, so they are
/// never handled as numbers past this point.
pub fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

pub mod item {
    use super::*;

    /// Inventory item as returned by the remote catalog.
    ///
    /// Only the fields the proxy filters on are typed; everything else is kept in
    /// `extra` and forwarded untouched.
    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct Item {
        #[serde(deserialize_with = "id_from_string_or_number")]
        pub item_id: String,
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub sku: Option<String>,
        #[serde(default)]
        pub unit: Option<String>,
        #[serde(default)]
        pub item_type: Option<String>,
        #[serde(default)]
        pub status: Option<String>,
        #[serde(default)]
        pub product_type: Option<String>,
        #[serde(default)]
        pub is_combo_product: Option<bool>,
        #[serde(default)]
        pub track_inventory: Option<bool>,
        #[serde(default)]
        pub is_returnable: Option<bool>,
        #[serde(flatten)]
        pub extra: Map<String, Value>,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct PageContext {
        #[serde(default)]
        pub page: Option<u32>,
        #[serde(default)]
        pub per_page: Option<u32>,
        #[serde(default)]
        pub has_more_page: Option<bool>,
    }

    /// One page of the remote `/items` listing.
    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct ItemsPage {
        #[serde(default)]
        pub items: Vec<Item>,
        #[serde(default)]
        pub page_context: Option<PageContext>,
    }

    /// Response body of `GET /api/items`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ItemsResponse {
        pub code: i64,
        pub message: String,
        pub items: Vec<Item>,
    }
}

pub mod location {
    use super::*;

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct RemoteWarehouse {
        #[serde(deserialize_with = "id_from_string_or_number")]
        pub warehouse_id: String,
        #[serde(default)]
        pub warehouse_name: String,
        #[serde(default)]
        pub status: Option<String>,
        #[serde(default)]
        pub is_primary: Option<bool>,
    }

    /// Location record of the remote `/locations` listing, optionally nesting
    /// warehouses.
    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct RemoteLocation {
        #[serde(deserialize_with = "id_from_string_or_number")]
        pub location_id: String,
        #[serde(default)]
        pub location_name: String,
        #[serde(default)]
        pub status: Option<String>,
        #[serde(default)]
        pub is_storage_location_enabled: Option<bool>,
        #[serde(default)]
        pub is_primary: Option<bool>,
        #[serde(default)]
        pub warehouses: Vec<RemoteWarehouse>,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct LocationsPage {
        #[serde(default)]
        pub code: i64,
        #[serde(default)]
        pub message: String,
        #[serde(default)]
        pub locations: Vec<RemoteLocation>,
    }

    /// A location goods can be transferred from/to.
    ///
    /// `location_id` is the id to use in a transfer order: the warehouse id for
    /// flattened warehouses, the location id otherwise.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct TransferLocation {
        pub location_id: String,
        pub location_name: String,
        pub warehouse_id: Option<String>,
        pub warehouse_name: Option<String>,
        pub parent_location_id: Option<String>,
        pub parent_location_name: Option<String>,
        pub parent_location_storage_enabled: Option<bool>,
        pub status: String,
        pub is_primary: bool,
    }

    /// Response body of `GET /api/locations`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct LocationsResponse {
        pub code: i64,
        pub message: String,
        pub locations: Vec<TransferLocation>,
    }
}

pub mod transfer_order {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct TransferLineNew {
        #[serde(deserialize_with = "id_from_string_or_number")]
        pub item_id: String,
        /// Quantity in container units (e.g. cartons).
        pub quantity_transfer: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
    }

    /// Request body of `POST /api/transfer-orders`.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct TransferOrderNew {
        #[serde(deserialize_with = "id_from_string_or_number")]
        pub from_location_id: String,
        #[serde(deserialize_with = "id_from_string_or_number")]
        pub to_location_id: String,
        /// `YYYY-MM-DD`, defaults to today when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub date: Option<String>,
        pub line_items: Vec<TransferLineNew>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct RemoteTransferLine {
        pub item_id: String,
        pub name: String,
        pub quantity_transfer: f64,
        pub unit: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
    }

    /// Payload posted to the remote `/transferorders` endpoint.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct RemoteTransferOrder {
        pub from_warehouse_id: String,
        pub to_warehouse_id: String,
        pub date: String,
        pub line_items: Vec<RemoteTransferLine>,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct CreatedTransferOrder {
        #[serde(default)]
        pub transfer_order_id: Option<String>,
        #[serde(default)]
        pub transfer_order_number: Option<String>,
    }
}

pub mod auth {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct LoginUrl {
        pub auth_url: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct LoginRequest {
        #[serde(default)]
        pub custom_scope: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CodeExchange {
        pub code: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct CallbackQuery {
        pub code: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Success {
        pub success: bool,
        pub message: String,
    }

    /// Response body of `GET /auth/status`. Durations are in seconds.
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AuthStatus {
        pub authenticated: bool,
        pub has_refresh_token: bool,
        pub token_expires_in: Option<i64>,
        pub token_expires_in_minutes: Option<i64>,
        pub auto_refresh_enabled: bool,
        pub will_refresh_in: Option<i64>,
    }
}
