use super::*;
use crate::net::types::LineItem;
use time::macros::{date, datetime, offset};

fn line(name: &str) -> LineItem {
    LineItem { menu_id: None, name: name.to_owned(), price: 10.0, qty: 1 }
}

fn order(at: OffsetDateTime, items: &[&str]) -> Order {
    Order { items: items.iter().map(|name| line(name)).collect(), created_at: Some(at), ..Order::default() }
}

// =============================================================================
// Date
// =============================================================================

#[test]
fn date_filter_matches_same_day_any_time() {
    let filter = OrderFilter { date: Some(date!(2024-05-01)), ..OrderFilter::default() };
    assert!(filter.matches(&order(datetime!(2024-05-01 00:00 UTC), &[]), UtcOffset::UTC));
    assert!(filter.matches(&order(datetime!(2024-05-01 23:59:59 UTC), &[]), UtcOffset::UTC));
}

#[test]
fn date_filter_excludes_adjacent_days() {
    let at = datetime!(2024-05-01 12:00 UTC);
    let before = OrderFilter { date: Some(date!(2024-04-30)), ..OrderFilter::default() };
    let after = OrderFilter { date: Some(date!(2024-05-02)), ..OrderFilter::default() };
    assert!(!before.matches(&order(at, &[]), UtcOffset::UTC));
    assert!(!after.matches(&order(at, &[]), UtcOffset::UTC));
}

#[test]
fn date_filter_uses_local_calendar_day() {
    // 20:00 UTC is already the next day in Colombo (+05:30).
    let at = datetime!(2024-05-01 20:00 UTC);
    let filter = OrderFilter { date: Some(date!(2024-05-02)), ..OrderFilter::default() };
    assert!(filter.matches(&order(at, &[]), offset!(+5:30)));
    assert!(!filter.matches(&order(at, &[]), UtcOffset::UTC));
}

#[test]
fn date_filter_excludes_orders_without_timestamp() {
    let filter = OrderFilter { date: Some(date!(2024-05-01)), ..OrderFilter::default() };
    assert!(!filter.matches(&Order::default(), UtcOffset::UTC));
}

// =============================================================================
// Composition
// =============================================================================

#[test]
fn empty_filter_matches_everything() {
    let orders = vec![Order::default(), order(datetime!(2024-01-01 08:00 UTC), &["Tea"])];
    assert_eq!(OrderFilter::default().apply(&orders, UtcOffset::UTC).len(), 2);
}

#[test]
fn search_is_case_insensitive_over_any_item() {
    let filter = OrderFilter { search: Some("BIRY".to_owned()), ..OrderFilter::default() };
    let hit = order(datetime!(2024-01-01 08:00 UTC), &["Tea", "Chicken Biryani"]);
    let miss = order(datetime!(2024-01-01 08:00 UTC), &["Tea"]);
    assert!(filter.matches(&hit, UtcOffset::UTC));
    assert!(!filter.matches(&miss, UtcOffset::UTC));
}

#[test]
fn blank_search_imposes_nothing() {
    let filter = OrderFilter { search: Some("   ".to_owned()), ..OrderFilter::default() };
    assert!(filter.matches(&Order::default(), UtcOffset::UTC));
}

#[test]
fn filters_compose_with_and() {
    let mut paid_dine_in = order(datetime!(2024-05-01 09:00 UTC), &["Kottu"]);
    paid_dine_in.order_type = Some(OrderType::DineIn);
    paid_dine_in.payment_status = Some(PaymentStatus::Paid);
    paid_dine_in.status = Some(OrderStatus::Completed);

    let mut unpaid = paid_dine_in.clone();
    unpaid.payment_status = Some(PaymentStatus::Unpaid);

    let mut takeaway = paid_dine_in.clone();
    takeaway.order_type = Some(OrderType::Takeaway);

    let orders = vec![paid_dine_in, unpaid, takeaway];
    let filter = OrderFilter {
        date: Some(date!(2024-05-01)),
        order_type: Some(OrderType::DineIn),
        payment_status: Some(PaymentStatus::Paid),
        status: Some(OrderStatus::Completed),
        search: Some("kottu".to_owned()),
    };
    let visible = filter.apply(&orders, UtcOffset::UTC);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].payment_status, Some(PaymentStatus::Paid));
    assert_eq!(visible[0].order_type, Some(OrderType::DineIn));
}

#[test]
fn status_filter_rejects_orders_without_status() {
    let filter = OrderFilter { status: Some(OrderStatus::Pending), ..OrderFilter::default() };
    assert!(!filter.matches(&Order::default(), UtcOffset::UTC));
}

// =============================================================================
// Menu / users / tables
// =============================================================================

fn menu_item(name: &str, category: Option<&str>) -> MenuItem {
    MenuItem {
        id: name.to_lowercase(),
        name: name.to_owned(),
        price: 1.0,
        category: category.map(str::to_owned),
        description: None,
        image: None,
        available: true,
    }
}

#[test]
fn menu_filter_category_and_search() {
    let items = vec![
        menu_item("Chocolate Cake", Some("Dessert")),
        menu_item("Fruit Salad", Some("dessert")),
        menu_item("Iced Coffee", Some("drinks")),
        menu_item("Mystery", None),
    ];
    let desserts = MenuFilter { category: Some("dessert".to_owned()), search: None };
    assert_eq!(desserts.apply(&items).len(), 2);

    let cake = MenuFilter { category: Some("DESSERT".to_owned()), search: Some("cake".to_owned()) };
    let found = cake.apply(&items);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Chocolate Cake");

    assert_eq!(MenuFilter::default().apply(&items).len(), 4);
}

#[test]
fn user_filter_role_and_name() {
    let user = |name: &str, role: Role| User {
        id: name.to_owned(),
        name: name.to_owned(),
        email: format!("{name}@example.lk"),
        role,
        created_at: None,
        updated_at: None,
    };
    let users = vec![user("Amal", Role::Admin), user("Bimal", Role::Cashier), user("Kamal", Role::Cashier)];

    let cashiers = UserFilter { role: Some(Role::Cashier), search: None };
    assert_eq!(cashiers.apply(&users).len(), 2);

    let search = UserFilter { role: None, search: Some("MAL".to_owned()) };
    assert_eq!(search.apply(&users).len(), 3);

    let both = UserFilter { role: Some(Role::Cashier), search: Some("kam".to_owned()) };
    assert_eq!(both.apply(&users)[0].name, "Kamal");
}

#[test]
fn only_available_tables_are_offered() {
    let table = |id: &str, status: Option<TableStatus>| Table { id: id.to_owned(), number: 1, capacity: None, status };
    let tables = vec![
        table("a", Some(TableStatus::Available)),
        table("b", Some(TableStatus::Occupied)),
        table("c", Some(TableStatus::Reserved)),
        table("d", None),
    ];
    let offered = available_tables(&tables);
    assert_eq!(offered.len(), 1);
    assert_eq!(offered[0].id, "a");
}
