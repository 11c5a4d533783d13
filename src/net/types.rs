//! Typed records exchanged with the POS backend.
//!
//! DESIGN
//! ======
//! The backend speaks loosely typed JSON (`_id` identifiers, camelCase
//! fields, numbers that are sometimes strings). Everything is pinned down
//! here so the rest of the crate only ever sees validated structs: required
//! fields are plain values, optional ones are `Option`, and closed value sets
//! are enums that reject anything unexpected at the boundary.

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

/// Minimum accepted length for a new account password.
pub const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// VALIDATION
// =============================================================================

/// Client-side required-field failures, reported before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("price must be a non-negative number")]
    InvalidPrice,
    #[error("order has no items")]
    EmptyOrder,
    #[error("new passwords do not match")]
    PasswordMismatch,
    #[error("password must be at least {} characters", MIN_PASSWORD_LEN)]
    PasswordTooShort,
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

fn require_price(price: f64) -> Result<(), ValidationError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ValidationError::InvalidPrice);
    }
    Ok(())
}

// =============================================================================
// ENUMERATIONS
// =============================================================================

/// Error returned when parsing one of the enumerations from user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

macro_rules! wire_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            /// Wire representation.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(ParseEnumError { kind: $kind, value: s.to_owned() }),
                }
            }
        }
    };
}

/// Account role. Only used for display; the backend enforces permissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Cashier,
}

wire_enum!(Role, "role", { Admin => "admin", Cashier => "cashier" });

impl Role {
    /// Human-readable label shown next to a user.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Admin => "Administrator",
            Self::Cashier => "Cashier",
        }
    }
}

/// How an order is fulfilled. Drives service-charge applicability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OrderType {
    #[serde(rename = "dine-in")]
    DineIn,
    #[serde(rename = "takeaway")]
    Takeaway,
    #[serde(rename = "delivery")]
    Delivery,
}

wire_enum!(OrderType, "order type", { DineIn => "dine-in", Takeaway => "takeaway", Delivery => "delivery" });

impl OrderType {
    /// Map the numeric type id used by the order-type picker (`1`, `2`, `3`).
    #[must_use]
    pub fn from_type_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::DineIn),
            2 => Some(Self::Takeaway),
            3 => Some(Self::Delivery),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Served,
    Completed,
    Cancelled,
}

wire_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Preparing => "preparing",
    Ready => "ready",
    Served => "served",
    Completed => "completed",
    Cancelled => "cancelled",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

wire_enum!(PaymentStatus, "payment status", { Paid => "paid", Unpaid => "unpaid" });

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Cash,
    Card,
    Transfer,
}

wire_enum!(PaymentType, "payment type", { Cash => "cash", Card => "card", Transfer => "transfer" });

/// Table occupancy. The backend capitalizes these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableStatus {
    Available,
    Occupied,
    Reserved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

// =============================================================================
// ENTITIES
// =============================================================================

/// A staff account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// A dish or drink on the menu.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// Unit price. Older records store this as a numeric string.
    #[serde(deserialize_with = "deserialize_f64_lenient")]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Public image URL, if one was uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default = "default_available")]
    pub available: bool,
}

/// One line of an order: a menu item with the price captured at order time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    pub price: f64,
    #[serde(default, deserialize_with = "deserialize_u32_from_number")]
    pub qty: u32,
}

/// An order, persisted or still being composed.
///
/// Every field is optional on the wire: unsaved orders carry no `_id`, and
/// totals are only present once the backend has computed them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(alias = "type", default, skip_serializing_if = "Option::is_none")]
    pub order_type: Option<OrderType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(alias = "phone", default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<PaymentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_charge: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<OffsetDateTime>,
}

impl Order {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status == Some(OrderStatus::Cancelled)
    }
}

/// A physical table in the dining room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub number: u32,
    #[serde(alias = "seats", default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TableStatus>,
}

/// Reservation table reference: populated on reads, a bare id otherwise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReservationTable {
    Populated(Table),
    Id(String),
}

impl ReservationTable {
    #[must_use]
    pub fn number(&self) -> Option<u32> {
        match self {
            Self::Populated(table) => Some(table.number),
            Self::Id(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<ReservationTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_u32_from_number", skip_serializing_if = "Option::is_none")]
    pub guests: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReservationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// =============================================================================
// REQUEST PAYLOADS
// =============================================================================

/// New menu item. Sent as multipart form fields.
#[derive(Clone, Debug, PartialEq)]
pub struct NewMenuItem {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub description: String,
    pub available: bool,
    pub image: Option<String>,
}

impl NewMenuItem {
    /// # Errors
    ///
    /// Returns the first missing required field, or an invalid price.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.name, "name")?;
        require(&self.category, "category")?;
        require_price(self.price)
    }
}

/// Full replacement of an existing menu item's editable fields.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuUpdate {
    pub name: String,
    pub price: f64,
    pub category: String,
    pub description: String,
    pub image: String,
    pub available: bool,
}

impl MenuUpdate {
    /// Prefill an update from the current record.
    #[must_use]
    pub fn from_item(item: &MenuItem) -> Self {
        Self {
            name: item.name.clone(),
            price: item.price,
            category: item.category.clone().unwrap_or_default(),
            description: item.description.clone().unwrap_or_default(),
            image: item.image.clone().unwrap_or_default(),
            available: item.available,
        }
    }

    /// # Errors
    ///
    /// Returns an error when the name is blank or the price is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.name, "name")?;
        require_price(self.price)
    }
}

/// One requested line of a new order, by menu id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub menu_id: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub customer_name: String,
    pub phone: String,
    pub items: Vec<OrderLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<PaymentType>,
}

impl NewOrder {
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyOrder`] unless some line has a positive quantity.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.items.iter().any(|line| line.quantity > 0) {
            return Err(ValidationError::EmptyOrder);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
    pub table_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guests: Option<u32>,
    pub date: String,
    pub time: String,
    pub notes: String,
}

impl NewReservation {
    /// # Errors
    ///
    /// Returns the first missing required field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.table_id, "tableId")?;
        require(&self.customer_name, "customerName")?;
        require(&self.customer_phone, "customerPhone")
    }
}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct RegisterUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl fmt::Debug for RegisterUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl RegisterUser {
    /// # Errors
    ///
    /// Returns the first missing required field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.name, "name")?;
        require(&self.email, "email")?;
        require(&self.password, "password")
    }
}

/// Admin edit of another account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Self-service edit of the signed-in account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
}

#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    current_password: String,
    new_password: String,
}

impl fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordChange { .. }")
    }
}

impl PasswordChange {
    /// Build a password change from the three form fields.
    ///
    /// # Errors
    ///
    /// Returns an error when the confirmation differs from the new password
    /// or the new password is shorter than [`MIN_PASSWORD_LEN`].
    pub fn new(current: &str, new: &str, confirm: &str) -> Result<Self, ValidationError> {
        if new != confirm {
            return Err(ValidationError::PasswordMismatch);
        }
        if new.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }
        Ok(Self { current_password: current.to_owned(), new_password: new.to_owned() })
    }
}

// =============================================================================
// LENIENT NUMBERS
// =============================================================================

fn default_available() -> bool {
    true
}

fn deserialize_f64_lenient<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| D::Error::custom(format!("value {number} is not a finite number"))),
        serde_json::Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("expected numeric string, got {text:?}"))),
        serde_json::Value::Null => Ok(0.0),
        other => Err(D::Error::custom(format!("expected number, got {other}"))),
    }
}

fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    u32_from_value(&value).map_err(D::Error::custom)
}

fn deserialize_opt_u32_from_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(ref text) if text.trim().is_empty() => Ok(None),
        other => u32_from_value(&other).map(Some).map_err(D::Error::custom),
    }
}

fn u32_from_value(value: &serde_json::Value) -> Result<u32, String> {
    match value {
        serde_json::Value::Number(number) => {
            if let Some(int) = number.as_u64() {
                return u32::try_from(int).map_err(|_| format!("value {int} out of range for u32"));
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            if let Some(float) = number.as_f64()
                && float.is_finite()
                && float.fract() == 0.0
                && float >= 0.0
                && float <= f64::from(u32::MAX)
            {
                return Ok(float as u32);
            }
            Err(format!("expected non-negative integer, got {number}"))
        }
        serde_json::Value::String(text) => text
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("expected integer string, got {text:?}")),
        other => Err(format!("expected integer, got {other}")),
    }
}
