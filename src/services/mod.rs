pub mod bill;
pub mod draft;
pub mod filter;
pub mod report;
pub mod totals;
