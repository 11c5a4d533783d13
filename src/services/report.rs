//! Sales report aggregation over fetched orders.
//!
//! DESIGN
//! ======
//! The report works on the orders already in hand; nothing is fetched here.
//! Cancelled orders never count toward revenue. Per-order amounts go through
//! [`OrderTotals::resolve`] so records without stored totals still contribute.
//! All day/hour/month bucketing is done in the supplied local offset.
//!
//! Month-over-month growth compares the current and previous calendar months
//! across every fetched order, independent of the report filter, so narrowing
//! the window does not change the trend figure. When the filter selects no
//! orders at all, every figure is zero, growth included.

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use time::{Date, Duration, Month, OffsetDateTime, UtcOffset};

use super::filter::local_date;
use super::totals::{OrderTotals, format_money};
use crate::net::types::{Order, OrderType, PaymentStatus};

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const DAILY_SERIES_DAYS: usize = 30;
pub const TOP_ITEMS_LIMIT: usize = 5;
pub const UNKNOWN_ITEM: &str = "Unknown Item";

// =============================================================================
// FILTER
// =============================================================================

/// Which orders a report covers. Date bounds are inclusive local days.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub start: Option<Date>,
    pub end: Option<Date>,
    pub order_type: Option<OrderType>,
    pub payment_status: Option<PaymentStatus>,
}

impl ReportFilter {
    /// The window ending `today` and starting `days` days before it.
    #[must_use]
    pub fn trailing_days(today: Date, days: i64) -> Self {
        let start = today.checked_sub(Duration::days(days)).unwrap_or(Date::MIN);
        Self { start: Some(start), end: Some(today), ..Self::default() }
    }

    #[must_use]
    pub fn matches(&self, order: &Order, offset: UtcOffset) -> bool {
        if order.is_cancelled() {
            return false;
        }
        if self.start.is_some() || self.end.is_some() {
            let Some(day) = order.created_at.map(|at| local_date(at, offset)) else {
                return false;
            };
            if self.start.is_some_and(|start| day < start) || self.end.is_some_and(|end| day > end) {
                return false;
            }
        }
        if self.order_type.is_some() && order.order_type != self.order_type {
            return false;
        }
        if self.payment_status.is_some() && order.payment_status != self.payment_status {
            return false;
        }
        true
    }
}

// =============================================================================
// REPORT
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemSales {
    pub name: String,
    pub quantity: u64,
    pub revenue: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailySales {
    #[serde(serialize_with = "serialize_date")]
    pub date: Date,
    pub revenue: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HourlySales {
    pub hour: u8,
    pub revenue: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RevenueByType {
    pub dine_in: f64,
    pub takeaway: f64,
    pub delivery: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SalesReport {
    pub total_revenue: f64,
    pub total_orders: usize,
    pub average_order_value: f64,
    pub total_tax: f64,
    pub total_service_charge: f64,
    pub revenue_by_type: RevenueByType,
    pub paid_orders: usize,
    pub unpaid_orders: usize,
    pub top_items: Vec<ItemSales>,
    pub daily_sales: Vec<DailySales>,
    pub hourly_sales: Vec<HourlySales>,
    pub monthly_revenue: f64,
    pub previous_month_revenue: f64,
    /// `(current - previous) / previous`; zero when the previous month had no revenue.
    pub growth_rate: f64,
}

impl SalesReport {
    /// Aggregate `orders` under `filter`, with `now` anchoring the monthly comparison.
    #[must_use]
    pub fn build(orders: &[Order], filter: &ReportFilter, now: OffsetDateTime, offset: UtcOffset) -> Self {
        let included: Vec<&Order> = orders.iter().filter(|order| filter.matches(order, offset)).collect();

        let mut total_revenue = 0.0;
        let mut total_tax = 0.0;
        let mut total_service_charge = 0.0;
        let mut revenue_by_type = RevenueByType::default();
        let mut paid_orders = 0;
        let mut unpaid_orders = 0;
        let mut items: BTreeMap<String, ItemSales> = BTreeMap::new();
        let mut daily: BTreeMap<Date, f64> = BTreeMap::new();
        let mut hourly = [0.0_f64; 24];

        for order in &included {
            let totals = OrderTotals::resolve(order);
            total_revenue += totals.total;
            total_tax += totals.tax;
            total_service_charge += totals.service_charge;

            match order.order_type {
                Some(OrderType::DineIn) => revenue_by_type.dine_in += totals.total,
                Some(OrderType::Takeaway) => revenue_by_type.takeaway += totals.total,
                Some(OrderType::Delivery) => revenue_by_type.delivery += totals.total,
                None => {}
            }

            match order.payment_status {
                Some(PaymentStatus::Paid) => paid_orders += 1,
                Some(PaymentStatus::Unpaid) => unpaid_orders += 1,
                None => {}
            }

            for item in &order.items {
                let name = if item.name.trim().is_empty() { UNKNOWN_ITEM } else { item.name.as_str() };
                let entry = items
                    .entry(name.to_owned())
                    .or_insert_with(|| ItemSales { name: name.to_owned(), quantity: 0, revenue: 0.0 });
                entry.quantity += u64::from(item.qty);
                entry.revenue += item.price * f64::from(item.qty);
            }

            if let Some(at) = order.created_at {
                let local = at.to_offset(offset);
                *daily.entry(local.date()).or_insert(0.0) += totals.total;
                hourly[usize::from(local.hour())] += totals.total;
            }
        }

        let mut top_items: Vec<ItemSales> = items.into_values().collect();
        top_items.sort_by(|a, b| b.revenue.total_cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));
        top_items.truncate(TOP_ITEMS_LIMIT);

        let skip = daily.len().saturating_sub(DAILY_SERIES_DAYS);
        let daily_sales = daily
            .into_iter()
            .skip(skip)
            .map(|(date, revenue)| DailySales { date, revenue })
            .collect();

        let hourly_sales = (0_u8..24)
            .zip(hourly)
            .map(|(hour, revenue)| HourlySales { hour, revenue })
            .collect();

        let total_orders = included.len();
        #[allow(clippy::cast_precision_loss)]
        let average_order_value = if total_orders == 0 { 0.0 } else { total_revenue / total_orders as f64 };

        // An empty selection reports nothing, trend included.
        let (monthly_revenue, previous_month_revenue) =
            if included.is_empty() { (0.0, 0.0) } else { monthly_revenue(orders, now, offset) };

        Self {
            total_revenue,
            total_orders,
            average_order_value,
            total_tax,
            total_service_charge,
            revenue_by_type,
            paid_orders,
            unpaid_orders,
            top_items,
            daily_sales,
            hourly_sales,
            monthly_revenue,
            previous_month_revenue,
            growth_rate: growth_rate(monthly_revenue, previous_month_revenue),
        }
    }

    /// Growth expressed as a percentage.
    #[must_use]
    pub fn growth_percent(&self) -> f64 {
        self.growth_rate * 100.0
    }
}

impl fmt::Display for SalesReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Revenue:        {}", format_money(self.total_revenue))?;
        writeln!(f, "Total Orders:         {}", self.total_orders)?;
        writeln!(f, "Average Order Value:  {}", format_money(self.average_order_value))?;
        writeln!(f, "Total Tax Collected:  {}", format_money(self.total_tax))?;
        writeln!(f, "Total Service Charge: {}", format_money(self.total_service_charge))?;
        writeln!(f)?;
        writeln!(f, "Dine-In Revenue:      {}", format_money(self.revenue_by_type.dine_in))?;
        writeln!(f, "Takeaway Revenue:     {}", format_money(self.revenue_by_type.takeaway))?;
        writeln!(f, "Delivery Revenue:     {}", format_money(self.revenue_by_type.delivery))?;
        writeln!(f)?;
        writeln!(f, "Paid Orders:          {}", self.paid_orders)?;
        writeln!(f, "Unpaid Orders:        {}", self.unpaid_orders)?;
        writeln!(f)?;
        writeln!(f, "This Month:           {}", format_money(self.monthly_revenue))?;
        writeln!(f, "Previous Month:       {}", format_money(self.previous_month_revenue))?;
        writeln!(f, "Growth:               {:.1}%", self.growth_percent())?;
        if !self.top_items.is_empty() {
            writeln!(f)?;
            writeln!(f, "Top Selling Items:")?;
            for (rank, item) in self.top_items.iter().enumerate() {
                writeln!(f, "  {}. {} x{} {}", rank + 1, item.name, item.quantity, format_money(item.revenue))?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// MONTHLY GROWTH
// =============================================================================

/// Relative change from `previous` to `current`; zero when `previous` is not positive.
#[must_use]
pub fn growth_rate(current: f64, previous: f64) -> f64 {
    if previous > 0.0 { (current - previous) / previous } else { 0.0 }
}

fn previous_month(year: i32, month: Month) -> (i32, Month) {
    if month == Month::January { (year - 1, Month::December) } else { (year, month.previous()) }
}

fn monthly_revenue(orders: &[Order], now: OffsetDateTime, offset: UtcOffset) -> (f64, f64) {
    let today = now.to_offset(offset);
    let current = (today.year(), today.month());
    let previous = previous_month(current.0, current.1);

    let mut current_revenue = 0.0;
    let mut previous_revenue = 0.0;
    for order in orders.iter().filter(|order| !order.is_cancelled()) {
        let Some(at) = order.created_at else {
            continue;
        };
        let local = at.to_offset(offset);
        let key = (local.year(), local.month());
        if key == current {
            current_revenue += OrderTotals::resolve(order).total;
        } else if key == previous {
            previous_revenue += OrderTotals::resolve(order).total;
        }
    }
    (current_revenue, previous_revenue)
}

fn serialize_date<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(date)
}
