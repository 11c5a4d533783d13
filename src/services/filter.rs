//! List filters for orders, menu items, users and tables.
//!
//! Every filter is a conjunction of optional predicates: an unset field
//! imposes no constraint. Calendar-day matching happens in the caller's
//! local offset, never as a raw timestamp range.

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;

use time::{Date, OffsetDateTime, UtcOffset};

use crate::net::types::{MenuItem, Order, OrderStatus, OrderType, PaymentStatus, Role, Table, TableStatus, User};

/// Local calendar day of a timestamp.
#[must_use]
pub fn local_date(at: OffsetDateTime, offset: UtcOffset) -> Date {
    at.to_offset(offset).date()
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn normalized(search: Option<&str>) -> Option<&str> {
    search.map(str::trim).filter(|s| !s.is_empty())
}

// =============================================================================
// ORDERS
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub date: Option<Date>,
    pub order_type: Option<OrderType>,
    pub payment_status: Option<PaymentStatus>,
    pub status: Option<OrderStatus>,
    /// Case-insensitive substring matched against item names.
    pub search: Option<String>,
}

impl OrderFilter {
    #[must_use]
    pub fn matches(&self, order: &Order, offset: UtcOffset) -> bool {
        if let Some(date) = self.date {
            match order.created_at {
                Some(at) if local_date(at, offset) == date => {}
                _ => return false,
            }
        }
        if self.order_type.is_some() && order.order_type != self.order_type {
            return false;
        }
        if self.payment_status.is_some() && order.payment_status != self.payment_status {
            return false;
        }
        if self.status.is_some() && order.status != self.status {
            return false;
        }
        if let Some(needle) = normalized(self.search.as_deref()) {
            if !order.items.iter().any(|item| contains_ignore_case(&item.name, needle)) {
                return false;
            }
        }
        true
    }

    /// Visible subset, in input order.
    #[must_use]
    pub fn apply<'a>(&self, orders: &'a [Order], offset: UtcOffset) -> Vec<&'a Order> {
        orders.iter().filter(|order| self.matches(order, offset)).collect()
    }
}

// =============================================================================
// MENU
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MenuFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl MenuFilter {
    #[must_use]
    pub fn matches(&self, item: &MenuItem) -> bool {
        if let Some(category) = normalized(self.category.as_deref()) {
            let same = item
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category));
            if !same {
                return false;
            }
        }
        normalized(self.search.as_deref()).is_none_or(|needle| contains_ignore_case(&item.name, needle))
    }

    #[must_use]
    pub fn apply<'a>(&self, items: &'a [MenuItem]) -> Vec<&'a MenuItem> {
        items.iter().filter(|item| self.matches(item)).collect()
    }
}

// =============================================================================
// USERS
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub search: Option<String>,
}

impl UserFilter {
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        if self.role.is_some_and(|role| role != user.role) {
            return false;
        }
        normalized(self.search.as_deref()).is_none_or(|needle| contains_ignore_case(&user.name, needle))
    }

    #[must_use]
    pub fn apply<'a>(&self, users: &'a [User]) -> Vec<&'a User> {
        users.iter().filter(|user| self.matches(user)).collect()
    }
}

// =============================================================================
// TABLES
// =============================================================================

/// Tables that can be offered for a new reservation.
#[must_use]
pub fn available_tables(tables: &[Table]) -> Vec<&Table> {
    tables
        .iter()
        .filter(|table| table.status == Some(TableStatus::Available))
        .collect()
}
