use super::*;
use time::macros::date;

#[test]
fn parse_item_reads_id_and_quantity() {
    assert_eq!(parse_item("m1=2"), Ok(("m1".to_owned(), 2)));
    assert_eq!(parse_item(" m1 = 3 "), Ok(("m1".to_owned(), 3)));
    assert!(parse_item("m1").is_err());
    assert!(parse_item("=2").is_err());
    assert!(parse_item("m1=-1").is_err());
}

#[test]
fn parse_date_is_iso_day() {
    assert_eq!(parse_date("2024-05-01"), Ok(date!(2024 - 05 - 01)));
    assert!(parse_date("01/05/2024").is_err());
}

#[test]
fn parse_order_type_accepts_names_and_picker_ids() {
    assert_eq!(parse_order_type("1"), Ok(OrderType::DineIn));
    assert_eq!(parse_order_type("2"), Ok(OrderType::Takeaway));
    assert_eq!(parse_order_type(" 3 "), Ok(OrderType::Delivery));
    assert_eq!(parse_order_type("Takeaway"), Ok(OrderType::Takeaway));
    assert!(parse_order_type("4").is_err());
    assert!(parse_order_type("drive-thru").is_err());
}

#[test]
fn order_create_accepts_type_id() {
    let cli = Cli::try_parse_from(["dineboard", "order", "create", "--type", "3", "--item", "m1=1"]).unwrap();
    let Command::Order(OrderCommand { command: OrderSubcommand::Create { order_type, .. } }) = cli.command else {
        panic!("expected order create");
    };
    assert_eq!(order_type, OrderType::Delivery);
}

#[test]
fn display_name_falls_back_to_email() {
    assert_eq!(display_name("", "a@x.lk"), "a@x.lk");
    assert_eq!(display_name("Amal", "a@x.lk"), "Amal");
}

#[test]
fn order_create_collects_repeated_items() {
    let cli = Cli::try_parse_from([
        "dineboard", "order", "create", "--type", "takeaway", "--item", "m1=2", "--item", "m2=1", "--print",
    ])
    .unwrap();
    let Command::Order(OrderCommand { command: OrderSubcommand::Create { order_type, items, print, .. } }) = cli.command
    else {
        panic!("expected order create");
    };
    assert_eq!(order_type, OrderType::Takeaway);
    assert_eq!(items, vec![("m1".to_owned(), 2), ("m2".to_owned(), 1)]);
    assert!(print);
}

#[test]
fn unknown_enum_values_are_rejected_by_parser() {
    assert!(Cli::try_parse_from(["dineboard", "order", "list", "--type", "drive-thru"]).is_err());
    assert!(Cli::try_parse_from(["dineboard", "user", "list", "--role", "chef"]).is_err());
}

#[test]
fn report_sales_flags() {
    let cli = Cli::try_parse_from([
        "dineboard", "--backend-url", "https://pos.example.lk/api", "report", "sales", "--from", "2024-05-01", "--json",
    ])
    .unwrap();
    assert_eq!(cli.backend_url.as_deref(), Some("https://pos.example.lk/api"));
    let Command::Report(ReportCommand { command: ReportSubcommand::Sales { from, to, json, .. } }) = cli.command else {
        panic!("expected report sales");
    };
    assert_eq!(from, Some(date!(2024 - 05 - 01)));
    assert_eq!(to, None);
    assert!(json);
}
