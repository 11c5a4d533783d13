//! Order total calculation.
//!
//! Fixed rates: 13% tax on every order, 10% service charge on dine-in only.
//! Values keep full `f64` precision; rounding happens only when formatting.
//!
//! A stored total is used whenever the field is present, including a stored
//! `0`. Only absent fields are recomputed from the line items.

#[cfg(test)]
#[path = "totals_test.rs"]
mod tests;

use serde::Serialize;

use crate::net::types::{LineItem, Order, OrderType};

pub const TAX_RATE: f64 = 0.13;
pub const SERVICE_CHARGE_RATE: f64 = 0.10;
pub const CURRENCY: &str = "LKR";

/// Subtotal, tax, service charge and grand total for one order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub service_charge: f64,
    pub total: f64,
}

impl OrderTotals {
    /// Compute totals from line items. An empty list yields all zeros.
    #[must_use]
    pub fn compute(items: &[LineItem], order_type: Option<OrderType>) -> Self {
        let subtotal: f64 = items.iter().map(|item| item.price * f64::from(item.qty)).sum();
        Self::from_subtotal(subtotal, order_type)
    }

    #[must_use]
    pub fn from_subtotal(subtotal: f64, order_type: Option<OrderType>) -> Self {
        let tax = subtotal * TAX_RATE;
        let service_charge = if order_type == Some(OrderType::DineIn) { subtotal * SERVICE_CHARGE_RATE } else { 0.0 };
        Self { subtotal, tax, service_charge, total: subtotal + tax + service_charge }
    }

    /// Totals for a record: stored values win, absent ones are recomputed.
    #[must_use]
    pub fn resolve(order: &Order) -> Self {
        let subtotal = order
            .subtotal
            .unwrap_or_else(|| Self::compute(&order.items, order.order_type).subtotal);
        let computed = Self::from_subtotal(subtotal, order.order_type);
        let tax = order.tax.unwrap_or(computed.tax);
        let service_charge = order.service_charge.unwrap_or(computed.service_charge);
        let total = order.total.unwrap_or(subtotal + tax + service_charge);
        Self { subtotal, tax, service_charge, total }
    }
}

/// Two-decimal display of an amount.
#[must_use]
pub fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

/// Amount with the currency prefix, e.g. `LKR 307.50`.
#[must_use]
pub fn format_money(value: f64) -> String {
    format!("{CURRENCY} {value:.2}")
}
