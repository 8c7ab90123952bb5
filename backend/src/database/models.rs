//! Rust structs that represent database table rows.
//!
//! These mirror what the admin screens and the dashboard select, including
//! the relations they embed. Columns a screen never reads are omitted.

use chrono::{DateTime, Utc};
use eggo_adapters::Identity;
use serde::{Deserialize, Serialize};

const DAYS_OF_WEEK: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Lookup rows embedded by name only (`condominium_types`, `order_statuses`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condominium {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub type_id: Option<String>,
    pub has_lobby: bool,
    #[serde(default)]
    pub distribution_type_id: Option<String>,
    #[serde(default)]
    pub location_lat: Option<f64>,
    #[serde(default)]
    pub location_lng: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, rename = "type")]
    pub kind: Option<NamedRef>,
    #[serde(default)]
    pub distribution_type: Option<NamedRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryWindow {
    pub id: String,
    pub condominium_id: String,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub condominium: Option<NamedRef>,
}

impl DeliveryWindow {
    /// Weekday name, Sunday being day 0.
    pub fn day_label(&self) -> &'static str {
        DAYS_OF_WEEK
            .get(self.day_of_week as usize)
            .copied()
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EggSize {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerAddress {
    pub id: String,
    pub unit_identifier: String,
    #[serde(default)]
    pub condominium_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub total_amount: f64,
    #[serde(default)]
    pub delivery_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<NamedRef>,
    #[serde(default)]
    pub customer_address: Option<CustomerAddress>,
}

impl Order {
    /// `Order #1a2b3c4d`, the first eight characters of the id.
    pub fn short_label(&self) -> String {
        let short: String = self.id.chars().take(8).collect();
        format!("Order #{}", short)
    }

    pub fn status_name(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.name.as_str())
    }
}

/// Row of the admin user listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedUser {
    pub id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub created_at: Option<String>,
}

impl From<Identity> for ManagedUser {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email,
            full_name: identity.user_metadata.full_name,
            username: identity.user_metadata.username,
            created_at: identity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn delivery_window_decodes_with_embedded_condominium() {
        let window: DeliveryWindow = serde_json::from_value(json!({
            "id": "w1",
            "condominium_id": "c1",
            "day_of_week": 1,
            "start_time": "08:00:00",
            "end_time": "10:00:00",
            "is_active": true,
            "created_at": "2024-03-01T12:00:00+00:00",
            "updated_at": "2024-03-01T12:00:00+00:00",
            "condominium": { "id": "c1", "name": "Palm Court" }
        }))
        .unwrap();
        assert_eq!(window.day_label(), "Monday");
        assert_eq!(window.condominium.unwrap().name, "Palm Court");
    }

    #[test]
    fn out_of_range_weekday_is_labelled_unknown() {
        let window: DeliveryWindow = serde_json::from_value(json!({
            "id": "w1",
            "condominium_id": "c1",
            "day_of_week": 9,
            "start_time": "08:00:00",
            "end_time": "10:00:00",
            "is_active": false,
            "created_at": "2024-03-01T12:00:00Z"
        }))
        .unwrap();
        assert_eq!(window.day_label(), "Unknown");
    }

    #[test]
    fn condominium_type_relation_maps_to_kind() {
        let condo: Condominium = serde_json::from_value(json!({
            "id": "c1",
            "name": "Palm Court",
            "has_lobby": true,
            "is_active": true,
            "created_at": "2024-03-01T12:00:00Z",
            "type": { "id": "t1", "name": "Tower" }
        }))
        .unwrap();
        assert_eq!(condo.kind.unwrap().name, "Tower");
        assert!(condo.distribution_type.is_none());
    }

    #[test]
    fn order_short_label_uses_first_eight_chars() {
        let order: Order = serde_json::from_value(json!({
            "id": "1a2b3c4d-5e6f",
            "customer_id": "u1",
            "total_amount": 12.5,
            "created_at": "2024-03-01T12:00:00Z"
        }))
        .unwrap();
        assert_eq!(order.short_label(), "Order #1a2b3c4d");
        assert_eq!(order.status_name(), None);
    }
}
