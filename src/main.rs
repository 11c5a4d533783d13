use std::io::{self, BufRead};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::{error, info};

use dineboard::config::{AppConfig, ConfigError, parse_backend_url, resolve_utc_offset};
use dineboard::net::api::{ApiClient, ApiError};
use dineboard::net::types::{
    MenuUpdate, NewMenuItem, NewOrder, NewReservation, Order, OrderStatus, OrderType, PasswordChange, PaymentStatus,
    PaymentType, ProfileUpdate, RegisterUser, Role, UserUpdate, ValidationError,
};
use dineboard::services::bill::{BillError, BillHooks, BillPrinter, FileSurface, PrintOutcome};
use dineboard::services::draft::OrderDraft;
use dineboard::services::filter::{MenuFilter, OrderFilter, UserFilter, available_tables, local_date};
use dineboard::services::report::{DEFAULT_WINDOW_DAYS, ReportFilter, SalesReport};
use dineboard::services::totals::format_money;
use dineboard::session::{FileTokenStore, SessionContext, SessionError};

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Bill(#[from] BillError),
    #[error("invalid argument: {0}")]
    Argument(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("failed to start runtime: {0}")]
    Runtime(std::io::Error),
    #[error("failed to read token: {0}")]
    Stdin(std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "dineboard", about = "Restaurant POS admin client")]
struct Cli {
    /// Overrides `DINEBOARD_BACKEND_URL`.
    #[arg(long)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Session(SessionCommand),
    Menu(MenuCommand),
    Order(OrderCommand),
    Table(TableCommand),
    Reservation(ReservationCommand),
    User(UserCommand),
    Profile(ProfileCommand),
    Report(ReportCommand),
}

#[derive(Args, Debug)]
struct SessionCommand {
    #[command(subcommand)]
    command: SessionSubcommand,
}

#[derive(Subcommand, Debug)]
enum SessionSubcommand {
    /// Store a token issued by the backend. Read from stdin when `--token` is omitted.
    Login {
        #[arg(long, env = "DINEBOARD_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    Logout,
    Whoami,
}

#[derive(Args, Debug)]
struct MenuCommand {
    #[command(subcommand)]
    command: MenuSubcommand,
}

#[derive(Subcommand, Debug)]
enum MenuSubcommand {
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        unavailable: bool,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        available: Option<bool>,
    },
}

#[derive(Args, Debug)]
struct OrderCommand {
    #[command(subcommand)]
    command: OrderSubcommand,
}

#[derive(Subcommand, Debug)]
enum OrderSubcommand {
    List {
        /// Local calendar day, `YYYY-MM-DD`.
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,
        #[arg(long = "type", value_parser = parse_order_type)]
        order_type: Option<OrderType>,
        #[arg(long)]
        payment: Option<PaymentStatus>,
        #[arg(long)]
        status: Option<OrderStatus>,
        #[arg(long)]
        search: Option<String>,
    },
    Create {
        /// `dine-in`, `takeaway`, `delivery`, or the picker ids `1`, `2`, `3`.
        #[arg(long = "type", default_value = "dine-in", value_parser = parse_order_type)]
        order_type: OrderType,
        #[arg(long, default_value = "")]
        customer: String,
        #[arg(long, default_value = "")]
        phone: String,
        /// `MENU_ID=QTY`, repeatable.
        #[arg(long = "item", value_parser = parse_item)]
        items: Vec<(String, u32)>,
        #[arg(long)]
        status: Option<OrderStatus>,
        #[arg(long)]
        payment: Option<PaymentStatus>,
        #[arg(long)]
        payment_type: Option<PaymentType>,
        /// Save the order and print its bill.
        #[arg(long)]
        print: bool,
    },
    /// Print the bill of an existing order.
    Bill { id: String },
}

#[derive(Args, Debug)]
struct TableCommand {
    #[command(subcommand)]
    command: TableSubcommand,
}

#[derive(Subcommand, Debug)]
enum TableSubcommand {
    List {
        #[arg(long)]
        available: bool,
    },
}

#[derive(Args, Debug)]
struct ReservationCommand {
    #[command(subcommand)]
    command: ReservationSubcommand,
}

#[derive(Subcommand, Debug)]
enum ReservationSubcommand {
    List,
    Create {
        #[arg(long)]
        table: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        guests: Option<u32>,
        #[arg(long, default_value = "")]
        date: String,
        #[arg(long, default_value = "")]
        time: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
}

#[derive(Args, Debug)]
struct UserCommand {
    #[command(subcommand)]
    command: UserSubcommand,
}

#[derive(Subcommand, Debug)]
enum UserSubcommand {
    List {
        #[arg(long)]
        role: Option<Role>,
        #[arg(long)]
        search: Option<String>,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "DINEBOARD_NEW_USER_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "cashier")]
        role: Role,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<Role>,
    },
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Show,
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
}

#[derive(Args, Debug)]
struct ReportCommand {
    #[command(subcommand)]
    command: ReportSubcommand,
}

#[derive(Subcommand, Debug)]
enum ReportSubcommand {
    /// Sales summary. Defaults to the last 30 days.
    Sales {
        #[arg(long, value_parser = parse_date)]
        from: Option<Date>,
        #[arg(long, value_parser = parse_date)]
        to: Option<Date>,
        #[arg(long = "type", value_parser = parse_order_type)]
        order_type: Option<OrderType>,
        #[arg(long)]
        payment: Option<PaymentStatus>,
        #[arg(long)]
        json: bool,
    },
}

struct CliContext {
    config: AppConfig,
    offset: UtcOffset,
    session: SessionContext<FileTokenStore>,
}

impl CliContext {
    fn api(&self) -> Result<ApiClient, CliError> {
        Ok(ApiClient::from_config(&self.config, self.session.token().map(str::to_owned))?)
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = AppConfig::from_env()?;
    if let Some(url) = cli.backend_url.as_deref() {
        config.backend_url = parse_backend_url(Some(url))?;
    }
    // Resolved before the runtime spawns its worker threads.
    let offset = resolve_utc_offset(config.utc_offset);

    let store = FileTokenStore::new(config.session_file.clone());
    let session = SessionContext::restore(store, now_secs())?;
    let mut ctx = CliContext { config, offset, session };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(async {
        match cli.command {
            Command::Session(session) => run_session(&mut ctx, session),
            Command::Menu(menu) => run_menu(&ctx, menu).await,
            Command::Order(order) => run_order(&ctx, order).await,
            Command::Table(table) => run_table(&ctx, table).await,
            Command::Reservation(reservation) => run_reservation(&ctx, reservation).await,
            Command::User(user) => run_user(&ctx, user).await,
            Command::Profile(profile) => run_profile(&ctx, profile).await,
            Command::Report(report) => run_report(&ctx, report).await,
        }
    })
}

fn now_secs() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

// =============================================================================
// SESSION
// =============================================================================

fn run_session(ctx: &mut CliContext, session: SessionCommand) -> Result<(), CliError> {
    match session.command {
        SessionSubcommand::Login { token } => {
            let token = match token {
                Some(token) => token,
                None => read_token_line()?,
            };
            let signed_in = ctx.session.login(&token, now_secs())?;
            println!("signed in as {} ({})", display_name(&signed_in.name, &signed_in.email), signed_in.role.label());
            Ok(())
        }
        SessionSubcommand::Logout => {
            ctx.session.logout()?;
            println!("signed out");
            Ok(())
        }
        SessionSubcommand::Whoami => {
            match ctx.session.session() {
                Some(session) => print_json(session)?,
                None => println!("not signed in"),
            }
            Ok(())
        }
    }
}

fn read_token_line() -> Result<String, CliError> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).map_err(CliError::Stdin)?;
    Ok(line.trim().to_owned())
}

fn display_name<'a>(name: &'a str, email: &'a str) -> &'a str {
    if name.trim().is_empty() { email } else { name }
}

// =============================================================================
// MENU
// =============================================================================

async fn run_menu(ctx: &CliContext, menu: MenuCommand) -> Result<(), CliError> {
    let api = ctx.api()?;
    match menu.command {
        MenuSubcommand::List { category, search } => {
            let items = api.list_menu().await?;
            let filter = MenuFilter { category, search };
            print_json(&filter.apply(&items))
        }
        MenuSubcommand::Add { name, category, price, description, image, unavailable } => {
            let item = NewMenuItem { name, category, price, description, available: !unavailable, image };
            api.create_menu_item(&item).await?;
            info!(name = %item.name, "menu item added");
            println!("menu item added");
            Ok(())
        }
        MenuSubcommand::Update { id, name, category, price, description, image, available } => {
            let items = api.list_menu().await?;
            let current = items
                .iter()
                .find(|item| item.id == id)
                .ok_or_else(|| CliError::NotFound(format!("menu item {id}")))?;
            let mut update = MenuUpdate::from_item(current);
            if let Some(name) = name {
                update.name = name;
            }
            if let Some(category) = category {
                update.category = category;
            }
            if let Some(price) = price {
                update.price = price;
            }
            if let Some(description) = description {
                update.description = description;
            }
            if let Some(image) = image {
                update.image = image;
            }
            if let Some(available) = available {
                update.available = available;
            }
            api.update_menu_item(&id, &update).await?;
            println!("menu item updated");
            Ok(())
        }
    }
}

// =============================================================================
// ORDERS
// =============================================================================

/// Saves the draft right before its bill is rendered.
struct SaveBeforePrint<'a> {
    api: &'a ApiClient,
    request: NewOrder,
}

#[async_trait::async_trait]
impl BillHooks for SaveBeforePrint<'_> {
    async fn before_print(&self, _draft: &Order) -> Option<Order> {
        match self.api.create_order(&self.request).await {
            Ok(saved) => {
                info!(order_id = saved.id.as_deref().unwrap_or_default(), "order saved");
                Some(saved)
            }
            Err(e) => {
                error!(error = %e, "order save failed; bill not printed");
                eprintln!("error: {e}");
                None
            }
        }
    }
}

async fn run_order(ctx: &CliContext, order: OrderCommand) -> Result<(), CliError> {
    let api = ctx.api()?;
    match order.command {
        OrderSubcommand::List { date, order_type, payment, status, search } => {
            let orders = api.list_orders().await?;
            let filter = OrderFilter { date, order_type, payment_status: payment, status, search };
            print_json(&filter.apply(&orders, ctx.offset))
        }
        OrderSubcommand::Create { order_type, customer, phone, items, status, payment, payment_type, print } => {
            let mut draft = OrderDraft::new(order_type);
            draft.customer_name = customer;
            draft.phone = phone;
            draft.order_status = status;
            draft.payment_status = payment;
            draft.payment_type = payment_type;
            for (menu_id, quantity) in &items {
                draft.set_quantity(menu_id, draft.quantity(menu_id).saturating_add(*quantity));
            }
            let request = draft.to_request()?;

            if !print {
                let saved = api.create_order(&request).await?;
                return print_json(&saved);
            }

            let menu = api.list_menu().await?;
            info!(running_total = %format_money(draft.running_total(&menu)), "printing new order");
            let preview = draft.to_order(&menu);
            let hooks = SaveBeforePrint { api: &api, request };
            print_bill(ctx, &preview, Some(&hooks)).await
        }
        OrderSubcommand::Bill { id } => {
            let order = api.find_order(&id).await?;
            print_bill(ctx, &order, None).await
        }
    }
}

async fn print_bill(ctx: &CliContext, order: &Order, hooks: Option<&dyn BillHooks>) -> Result<(), CliError> {
    let surface = FileSurface::new(ctx.config.spool_dir.clone(), ctx.config.print_command.clone());
    let printer = BillPrinter::new(&surface, &ctx.config.letterhead, ctx.offset);
    match printer.print(order, hooks).await? {
        PrintOutcome::Printed { order_ref, location } => {
            match location {
                Some(path) => println!("bill #{order_ref} written to {}", path.display()),
                None => println!("bill #{order_ref} printed"),
            }
            Ok(())
        }
        PrintOutcome::Aborted => Ok(()),
    }
}

// =============================================================================
// TABLES & RESERVATIONS
// =============================================================================

async fn run_table(ctx: &CliContext, table: TableCommand) -> Result<(), CliError> {
    let api = ctx.api()?;
    match table.command {
        TableSubcommand::List { available } => {
            let tables = api.list_tables().await?;
            if available {
                print_json(&available_tables(&tables))
            } else {
                print_json(&tables)
            }
        }
    }
}

async fn run_reservation(ctx: &CliContext, reservation: ReservationCommand) -> Result<(), CliError> {
    let api = ctx.api()?;
    match reservation.command {
        ReservationSubcommand::List => print_json(&api.list_reservations().await?),
        ReservationSubcommand::Create { table, name, phone, guests, date, time, notes } => {
            let reservation = NewReservation {
                table_id: table,
                customer_name: name,
                customer_phone: phone,
                guests,
                date,
                time,
                notes,
            };
            api.create_reservation(&reservation).await?;
            println!("reservation created");
            Ok(())
        }
    }
}

// =============================================================================
// USERS & PROFILE
// =============================================================================

async fn run_user(ctx: &CliContext, user: UserCommand) -> Result<(), CliError> {
    let api = ctx.api()?;
    match user.command {
        UserSubcommand::List { role, search } => {
            let users = api.list_users().await?;
            let filter = UserFilter { role, search };
            print_json(&filter.apply(&users))
        }
        UserSubcommand::Register { name, email, password, role } => {
            let user = RegisterUser { name, email, password, role };
            api.register_user(&user).await?;
            println!("user registered");
            Ok(())
        }
        UserSubcommand::Update { id, name, email, role } => {
            let users = api.list_users().await?;
            let current = users
                .iter()
                .find(|user| user.id == id)
                .ok_or_else(|| CliError::NotFound(format!("user {id}")))?;
            let update = UserUpdate {
                name: name.unwrap_or_else(|| current.name.clone()),
                email: email.unwrap_or_else(|| current.email.clone()),
                role: role.unwrap_or(current.role),
            };
            api.update_user(&id, &update).await?;
            println!("user updated");
            Ok(())
        }
    }
}

async fn run_profile(ctx: &CliContext, profile: ProfileCommand) -> Result<(), CliError> {
    let api = ctx.api()?;
    match profile.command {
        ProfileSubcommand::Show => print_json(&api.fetch_profile().await?),
        ProfileSubcommand::Update { name, email } => {
            if name.is_none() && email.is_none() {
                return Err(CliError::Argument("nothing to update; pass --name or --email".to_owned()));
            }
            let current = api.fetch_profile().await?;
            let update = ProfileUpdate {
                name: name.unwrap_or(current.name),
                email: email.unwrap_or(current.email),
            };
            print_json(&api.update_profile(&update).await?)
        }
        ProfileSubcommand::Password { current, new, confirm } => {
            let change = PasswordChange::new(&current, &new, &confirm)?;
            api.change_password(&change).await?;
            println!("password changed");
            Ok(())
        }
    }
}

// =============================================================================
// REPORTS
// =============================================================================

async fn run_report(ctx: &CliContext, report: ReportCommand) -> Result<(), CliError> {
    let api = ctx.api()?;
    match report.command {
        ReportSubcommand::Sales { from, to, order_type, payment, json } => {
            let now = OffsetDateTime::now_utc();
            let today = local_date(now, ctx.offset);
            let window = if from.is_none() && to.is_none() {
                ReportFilter::trailing_days(today, DEFAULT_WINDOW_DAYS)
            } else {
                ReportFilter { start: from, end: to, ..ReportFilter::default() }
            };
            let filter = ReportFilter { order_type, payment_status: payment, ..window };

            let orders = api.list_orders().await?;
            let report = SalesReport::build(&orders, &filter, now, ctx.offset);
            if json {
                print_json(&report)
            } else {
                print!("{report}");
                Ok(())
            }
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

fn parse_date(raw: &str) -> Result<Date, String> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn parse_order_type(raw: &str) -> Result<OrderType, String> {
    match raw.trim().parse::<u8>() {
        Ok(id) => OrderType::from_type_id(id).ok_or_else(|| format!("unknown order type id: {id}")),
        Err(_) => raw.parse::<OrderType>().map_err(|e| e.to_string()),
    }
}

fn parse_item(raw: &str) -> Result<(String, u32), String> {
    let (menu_id, quantity) = raw.split_once('=').ok_or_else(|| format!("expected MENU_ID=QTY, got '{raw}'"))?;
    let menu_id = menu_id.trim();
    if menu_id.is_empty() {
        return Err(format!("missing menu id in '{raw}'"));
    }
    let quantity = quantity
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid quantity in '{raw}': {e}"))?;
    Ok((menu_id.to_owned(), quantity))
}
