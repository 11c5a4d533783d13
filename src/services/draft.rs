//! Order-entry draft: the state behind composing a new order.
//!
//! Quantities are keyed by menu id and kept in insertion order so a preview
//! bill lists lines the way they were picked. The running total is pre-tax,
//! priced against the menu as last fetched.

#[cfg(test)]
#[path = "draft_test.rs"]
mod tests;

use crate::net::types::{
    LineItem, MenuItem, NewOrder, Order, OrderLine, OrderStatus, OrderType, PaymentStatus, PaymentType,
    ValidationError,
};

#[derive(Clone, Debug, PartialEq)]
pub struct OrderDraft {
    pub order_type: OrderType,
    pub customer_name: String,
    pub phone: String,
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_type: Option<PaymentType>,
    lines: Vec<(String, u32)>,
}

impl OrderDraft {
    #[must_use]
    pub fn new(order_type: OrderType) -> Self {
        Self {
            order_type,
            customer_name: String::new(),
            phone: String::new(),
            order_status: None,
            payment_status: None,
            payment_type: None,
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn quantity(&self, menu_id: &str) -> u32 {
        self.lines
            .iter()
            .find(|(id, _)| id == menu_id)
            .map_or(0, |(_, qty)| *qty)
    }

    pub fn set_quantity(&mut self, menu_id: &str, quantity: u32) {
        if let Some(line) = self.lines.iter_mut().find(|(id, _)| id == menu_id) {
            line.1 = quantity;
        } else {
            self.lines.push((menu_id.to_owned(), quantity));
        }
    }

    pub fn increase(&mut self, menu_id: &str) {
        let next = self.quantity(menu_id).saturating_add(1);
        self.set_quantity(menu_id, next);
    }

    /// Decrease by one. A line already at zero is left alone.
    pub fn decrease(&mut self, menu_id: &str) {
        let current = self.quantity(menu_id);
        if current > 0 {
            self.set_quantity(menu_id, current - 1);
        }
    }

    /// Pre-tax running total. Ids missing from `menu` contribute nothing.
    #[must_use]
    pub fn running_total(&self, menu: &[MenuItem]) -> f64 {
        self.lines
            .iter()
            .filter_map(|(id, qty)| {
                menu.iter()
                    .find(|item| &item.id == id)
                    .map(|item| item.price * f64::from(*qty))
            })
            .sum()
    }

    /// Build the create-order payload, dropping zero quantities.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyOrder`] when no line has a positive quantity.
    pub fn to_request(&self) -> Result<NewOrder, ValidationError> {
        let request = NewOrder {
            order_type: self.order_type,
            customer_name: self.customer_name.clone(),
            phone: self.phone.clone(),
            items: self
                .lines
                .iter()
                .filter(|(_, qty)| *qty > 0)
                .map(|(id, qty)| OrderLine { menu_id: id.clone(), quantity: *qty })
                .collect(),
            order_status: self.order_status,
            payment_status: self.payment_status,
            payment_type: self.payment_type,
        };
        request.validate()?;
        Ok(request)
    }

    /// Unsaved order for a bill preview, capturing menu names and prices.
    #[must_use]
    pub fn to_order(&self, menu: &[MenuItem]) -> Order {
        let items = self
            .lines
            .iter()
            .filter(|(_, qty)| *qty > 0)
            .filter_map(|(id, qty)| {
                menu.iter().find(|item| &item.id == id).map(|item| LineItem {
                    menu_id: Some(item.id.clone()),
                    name: item.name.clone(),
                    price: item.price,
                    qty: *qty,
                })
            })
            .collect();

        Order {
            items,
            order_type: Some(self.order_type),
            customer_name: non_empty(&self.customer_name),
            customer_phone: non_empty(&self.phone),
            status: self.order_status,
            payment_status: self.payment_status,
            payment_type: self.payment_type,
            ..Order::default()
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
