//! Bill rendering and printing.
//!
//! ARCHITECTURE
//! ============
//! `render_bill` is pure: order in, HTML out, input untouched. `BillPrinter`
//! wraps it with the side effects: an optional pre-print hook that may
//! finalize (save) the order, a fresh [`PrintSurface`] per bill, and an
//! optional post-print hook.
//!
//! A pre-print hook returning `None` aborts without a notice; the hook has
//! already reported its own failure. A missing item list and an unavailable
//! surface are distinct errors so callers can tell the user which happened.

#[cfg(test)]
#[path = "bill_test.rs"]
mod tests;

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::{info, warn};
use uuid::Uuid;

use super::totals::{OrderTotals, format_amount, format_money};
use crate::net::types::{Order, OrderType};

/// Shown in place of an order reference before the order is saved.
pub const UNSAVED_ORDER_REF: &str = "NEW";
const ORDER_REF_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum BillError {
    #[error("No items to print")]
    NoItems,
    #[error("unable to open a print surface: {0}")]
    SurfaceUnavailable(String),
    #[error("failed to write bill: {0}")]
    Write(String),
    #[error("failed to start print job: {0}")]
    Print(String),
}

/// Restaurant details printed at the top of every bill.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Letterhead {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

impl Default for Letterhead {
    fn default() -> Self {
        Self {
            name: "RESTAURANT NAME".to_owned(),
            address: "123 Main Street, City".to_owned(),
            phone: "011-2345678".to_owned(),
            email: "info@restaurant.com".to_owned(),
        }
    }
}

/// Short reference for a bill: last six characters of the id, upper-cased.
#[must_use]
pub fn order_ref(id: Option<&str>) -> String {
    match id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => {
            let chars: Vec<char> = id.chars().collect();
            let start = chars.len().saturating_sub(ORDER_REF_LEN);
            chars[start..].iter().collect::<String>().to_uppercase()
        }
        None => UNSAVED_ORDER_REF.to_owned(),
    }
}

// =============================================================================
// RENDERING
// =============================================================================

fn esc(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn info_row(body: &mut String, label: &str, value: &str) {
    let _ = write!(
        body,
        "<div class=\"info-row\"><span><strong>{label}:</strong></span><span>{}</span></div>",
        esc(value)
    );
}

fn total_row(body: &mut String, class: &str, label: &str, value: f64) {
    let _ = write!(
        body,
        "<div class=\"{class}\"><span>{label}</span><span>{}</span></div>",
        format_money(value)
    );
}

fn format_timestamp(at: OffsetDateTime, offset: UtcOffset) -> String {
    let local = at.to_offset(offset);
    local
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_else(|_| local.to_string())
}

/// Render a printable HTML bill.
///
/// `printed_at` stands in for the creation time of orders that have none.
///
/// # Errors
///
/// Returns [`BillError::NoItems`] when the order has no line items.
pub fn render_bill(
    order: &Order,
    letterhead: &Letterhead,
    printed_at: OffsetDateTime,
    offset: UtcOffset,
) -> Result<String, BillError> {
    if order.items.is_empty() {
        return Err(BillError::NoItems);
    }

    let reference = order_ref(order.id.as_deref());
    let totals = OrderTotals::resolve(order);
    let when = format_timestamp(order.created_at.unwrap_or(printed_at), offset);
    let order_type = order
        .order_type
        .map_or_else(|| "N/A".to_owned(), |t| t.as_str().to_uppercase());

    let mut body = String::new();
    let _ = write!(
        body,
        "<div class=\"header\"><h1>{}</h1><p>{}</p><p>Tel: {}</p><p>Email: {}</p></div>",
        esc(&letterhead.name),
        esc(&letterhead.address),
        esc(&letterhead.phone),
        esc(&letterhead.email)
    );

    body.push_str("<div class=\"info-section\">");
    if reference != UNSAVED_ORDER_REF {
        info_row(&mut body, "Order #", &reference);
    }
    info_row(&mut body, "Date", &when);
    info_row(&mut body, "Order Type", &order_type);
    if let Some(name) = non_blank(order.customer_name.as_deref()) {
        info_row(&mut body, "Customer", name);
    }
    if let Some(phone) = non_blank(order.customer_phone.as_deref()) {
        info_row(&mut body, "Phone", phone);
    }
    body.push_str("</div>");

    body.push_str(
        "<table><thead><tr><th style=\"width: 50%\">Item</th><th class=\"text-center\">Qty</th>\
         <th class=\"text-right\">Price</th><th class=\"text-right\">Total</th></tr></thead><tbody>",
    );
    for item in &order.items {
        let _ = write!(
            body,
            "<tr><td>{}</td><td class=\"text-center\">{}</td><td class=\"text-right\">{}</td>\
             <td class=\"text-right\">{}</td></tr>",
            esc(&item.name),
            item.qty,
            format_amount(item.price),
            format_amount(item.price * f64::from(item.qty))
        );
    }
    body.push_str("</tbody></table>");

    body.push_str("<div class=\"totals\">");
    total_row(&mut body, "total-row", "Subtotal:", totals.subtotal);
    total_row(&mut body, "total-row", "Tax (13%):", totals.tax);
    if order.order_type == Some(OrderType::DineIn) {
        total_row(&mut body, "total-row", "Service Charge (10%):", totals.service_charge);
    }
    total_row(&mut body, "total-row grand-total", "GRAND TOTAL:", totals.total);
    body.push_str("</div>");

    if order.status.is_some() || order.payment_status.is_some() {
        body.push_str("<div class=\"status-section\">");
        if let Some(status) = order.status {
            info_row(&mut body, "Order Status", &status.as_str().to_uppercase());
        }
        if let Some(payment) = order.payment_status {
            info_row(&mut body, "Payment Status", &payment.as_str().to_uppercase());
        }
        body.push_str("</div>");
    }

    body.push_str(
        "<div class=\"footer\"><p>================================</p>\
         <p><strong>Thank you for your visit!</strong></p><p>Please come again</p>\
         <p>================================</p></div>",
    );

    Ok(html_shell(&format!("Bill - Order #{reference}"), &body))
}

fn html_shell(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8"/>
<title>{}</title>
<style>
body {{ font-family: 'Courier New', monospace; max-width: 400px; margin: 0 auto; padding: 20px; }}
.header {{ text-align: center; border-bottom: 2px dashed #000; padding-bottom: 10px; margin-bottom: 20px; }}
.header h1 {{ margin: 0; font-size: 24px; }}
.header p {{ margin: 5px 0; font-size: 12px; }}
.info-section {{ margin-bottom: 20px; font-size: 14px; }}
.info-row, .total-row {{ display: flex; justify-content: space-between; margin: 5px 0; font-size: 14px; }}
table {{ width: 100%; border-collapse: collapse; margin-bottom: 20px; }}
th {{ text-align: left; border-bottom: 1px solid #000; padding: 5px 0; font-size: 14px; }}
td {{ padding: 5px 0; font-size: 14px; }}
.text-right {{ text-align: right; }}
.text-center {{ text-align: center; }}
.totals {{ border-top: 1px solid #000; margin-top: 10px; padding-top: 10px; }}
.grand-total {{ font-weight: bold; font-size: 16px; border-top: 2px solid #000; border-bottom: 2px solid #000; padding: 10px 0; }}
.status-section {{ margin: 15px 0; padding: 10px; border: 1px solid #000; font-size: 14px; }}
.footer {{ text-align: center; margin-top: 30px; font-size: 12px; }}
@media print {{ body {{ margin: 0; padding: 10px; }} }}
</style>
</head>
<body>{}</body>
</html>"#,
        esc(title),
        body
    )
}

// =============================================================================
// SURFACES
// =============================================================================

/// Something that can host one rendered bill and send it to a printer.
pub trait PrintSurface: Send + Sync {
    /// Open a fresh window for a single document.
    ///
    /// # Errors
    ///
    /// Returns [`BillError::SurfaceUnavailable`] when the host refuses.
    fn open(&self, title: &str) -> Result<Box<dyn PrintWindow>, BillError>;
}

pub trait PrintWindow: Send {
    /// # Errors
    ///
    /// Returns [`BillError::Write`] if the document cannot be stored.
    fn write(&mut self, html: &str) -> Result<(), BillError>;

    /// Trigger printing of what was written.
    ///
    /// # Errors
    ///
    /// Returns [`BillError::Print`] if the print job cannot be started.
    fn print(&mut self) -> Result<(), BillError>;

    /// Where the document ended up, if it has a location.
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// Spools each bill to its own HTML file and optionally hands it to a print command.
#[derive(Clone, Debug)]
pub struct FileSurface {
    spool_dir: PathBuf,
    print_command: Option<String>,
}

impl FileSurface {
    #[must_use]
    pub fn new(spool_dir: PathBuf, print_command: Option<String>) -> Self {
        Self { spool_dir, print_command }
    }
}

impl PrintSurface for FileSurface {
    fn open(&self, title: &str) -> Result<Box<dyn PrintWindow>, BillError> {
        fs::create_dir_all(&self.spool_dir)
            .map_err(|e| BillError::SurfaceUnavailable(format!("{}: {e}", self.spool_dir.display())))?;

        let slug = title
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>()
            .join("-");
        let path = self.spool_dir.join(format!("{slug}-{}.html", Uuid::new_v4()));
        let file = File::create(&path).map_err(|e| BillError::SurfaceUnavailable(format!("{}: {e}", path.display())))?;

        Ok(Box::new(FileWindow { file, path, print_command: self.print_command.clone() }))
    }
}

struct FileWindow {
    file: File,
    path: PathBuf,
    print_command: Option<String>,
}

impl PrintWindow for FileWindow {
    fn write(&mut self, html: &str) -> Result<(), BillError> {
        self.file
            .write_all(html.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(|e| BillError::Write(e.to_string()))
    }

    fn print(&mut self) -> Result<(), BillError> {
        let Some(command) = self.print_command.as_deref() else {
            info!(path = %self.path.display(), "bill spooled; no print command configured");
            return Ok(());
        };
        let Some((program, args)) = split_print_command(command) else {
            return Err(BillError::Print("print command is blank".to_owned()));
        };
        // Not awaited: the print job runs on its own.
        Command::new(program)
            .args(args)
            .arg(&self.path)
            .spawn()
            .map_err(|e| BillError::Print(format!("{command}: {e}")))?;
        info!(path = %self.path.display(), %command, "bill sent to printer");
        Ok(())
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Split a configured print command such as `lp -d kitchen` into program and
/// leading arguments. The bill path is appended after them. No shell quoting.
#[must_use]
pub fn split_print_command(raw: &str) -> Option<(&str, Vec<&str>)> {
    let mut parts = raw.split_whitespace();
    let program = parts.next()?;
    Some((program, parts.collect()))
}

// =============================================================================
// PRINTING
// =============================================================================

/// Actions around a print.
#[async_trait::async_trait]
pub trait BillHooks: Send + Sync {
    /// Finalize the order before it is rendered, e.g. by saving it.
    /// `None` aborts the print silently.
    async fn before_print(&self, order: &Order) -> Option<Order> {
        Some(order.clone())
    }

    /// Runs once the print has been triggered.
    async fn after_print(&self, _order: &Order) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintOutcome {
    Printed { order_ref: String, location: Option<PathBuf> },
    /// The pre-print hook declined; nothing was rendered.
    Aborted,
}

pub struct BillPrinter<'a> {
    surface: &'a dyn PrintSurface,
    letterhead: &'a Letterhead,
    offset: UtcOffset,
}

impl<'a> BillPrinter<'a> {
    #[must_use]
    pub fn new(surface: &'a dyn PrintSurface, letterhead: &'a Letterhead, offset: UtcOffset) -> Self {
        Self { surface, letterhead, offset }
    }

    /// Render `order` and send it to a fresh print surface.
    ///
    /// # Errors
    ///
    /// Returns [`BillError::NoItems`] for an order without items, and
    /// [`BillError::SurfaceUnavailable`] when no surface can be opened. In
    /// both cases nothing is printed and the post-print hook does not run.
    pub async fn print(&self, order: &Order, hooks: Option<&dyn BillHooks>) -> Result<PrintOutcome, BillError> {
        let finalized = match hooks {
            Some(hooks) => match hooks.before_print(order).await {
                Some(finalized) => finalized,
                None => {
                    info!("bill print aborted by pre-print hook");
                    return Ok(PrintOutcome::Aborted);
                }
            },
            None => order.clone(),
        };

        let html = render_bill(&finalized, self.letterhead, OffsetDateTime::now_utc(), self.offset)?;
        let reference = order_ref(finalized.id.as_deref());

        let mut window = self.surface.open(&format!("Bill - Order #{reference}")).inspect_err(|e| {
            warn!(order_ref = %reference, error = %e, "print surface unavailable");
        })?;
        window.write(&html)?;
        window.print()?;
        let location = window.location().map(Path::to_path_buf);

        if let Some(hooks) = hooks {
            hooks.after_print(&finalized).await;
        }

        info!(order_ref = %reference, "bill printed");
        Ok(PrintOutcome::Printed { order_ref: reference, location })
    }
}
