use anyhow::{bail, Context};
use chrono::Local;
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use mealtimes::config::AppConfig;
use mealtimes::handlers::auth::TokenCodec;
use mealtimes::handlers::dashboard::{summarize_sales, OrderOverview};
use mealtimes::handlers::report::export_sales_report;
use mealtimes::handlers::session::{SessionManager, SessionState};
use mealtimes::handlers::stripe::{CardDetails, StripeTokenizer};
use mealtimes::handlers::subscription::SubscriptionFlow;
use mealtimes::handlers::token_store::FileTokenStore;
use mealtimes::middleware::session_expiry::SessionExpiryWatcher;
use mealtimes::routes::orders::OrdersApi;
use mealtimes::routes::payments::PaymentsApi;
use mealtimes::routes::subscription_plans::PlansApi;
use mealtimes::routes::ApiClient;
use rpassword::prompt_password;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

const EXPIRY_CHECK_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "mealtimes", version, about = "MealTimes command-line client")]
struct Cli {
    /// Base URL of the MealTimes API (overrides MEALTIMES_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Where the session token is kept (overrides MEALTIMES_TOKEN_FILE)
    #[arg(long, global = true)]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami {
        #[arg(long)]
        json: bool,
    },
    /// List subscription plans
    Plans,
    /// Subscribe your company to a plan. Uses the Stripe test card unless card
    /// details are given.
    Subscribe {
        plan_id: i64,
        #[arg(long)]
        card_number: Option<String>,
        #[arg(long)]
        exp_month: Option<u32>,
        #[arg(long)]
        exp_year: Option<i32>,
        #[arg(long)]
        cvc: Option<String>,
    },
    /// Overview of your meal orders
    Orders,
    /// Export the admin sales report as PDF
    Report {
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    env_logger::builder()
        .filter_level(if cfg!(debug_assertions) {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init()
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(token_file) = cli.token_file {
        config.token_file = token_file;
    }

    let api = Arc::new(ApiClient::new(config.api_url.clone(), config.request_timeout)?);
    let codec = match &config.jwt_secret {
        Some(secret) => TokenCodec::new().with_secret(secret.as_bytes()),
        None => TokenCodec::new(),
    };
    let session = Arc::new(SessionManager::new(
        Arc::new(FileTokenStore::new(config.token_file.clone())),
        api.clone(),
        codec,
    ));
    session.restore();

    let watcher = SessionExpiryWatcher::new(EXPIRY_CHECK_INTERVAL, config.expiry_warning_secs)
        .spawn(session.clone());
    let result = execute(cli.command, &config, api, session).await;
    watcher.abort();
    result
}

async fn execute(
    command: Command,
    config: &AppConfig,
    api: Arc<ApiClient>,
    session: Arc<SessionManager>,
) -> anyhow::Result<()> {
    match command {
        Command::Login { email, password } => {
            let email = match email {
                Some(email) => email,
                None => prompt_line("Email: ")?,
            };
            let password = match password {
                Some(password) => password,
                None => prompt_password("Password: ")?,
            };
            let profile = session.login(&email, &password).await?;
            println!("Signed in as {} ({})", profile.email, profile.role);
        }
        Command::Logout => {
            session.logout();
            println!("Signed out");
        }
        Command::Whoami { json } => match session.current() {
            SessionState::Authenticated(current) => {
                let profile = current.profile();
                if json {
                    println!("{}", serde_json::to_string_pretty(profile)?);
                } else {
                    println!("User #{} {} ({})", profile.user_id, profile.email, profile.role);
                    if let Some(company_id) = profile.company_id() {
                        println!("Company #{}", company_id);
                    }
                    if let Some(expires_at) = current.expires_at() {
                        println!("Session expires {}", expires_at.with_timezone(&Local));
                    }
                }
            }
            _ => println!("Not signed in"),
        },
        Command::Plans => {
            let bearer = session.bearer()?;
            for plan in api.subscription_plans(&bearer).await? {
                println!(
                    "#{:<3} {:<20} ${:>8.2}  {} days, up to {} employees, {} meal(s)/day{}",
                    plan.subscription_plan_id,
                    plan.plan_name,
                    plan.price,
                    plan.duration_in_days,
                    plan.max_employees,
                    plan.meal_limit_per_day,
                    if plan.is_customizable { ", customizable" } else { "" }
                );
            }
        }
        Command::Subscribe {
            plan_id,
            card_number,
            exp_month,
            exp_year,
            cvc,
        } => {
            let key = config.stripe_key()?.to_string();
            let tokenizer = StripeTokenizer::new(key, config.request_timeout)?;
            let mut flow = SubscriptionFlow::new(session, api.clone(), api, Arc::new(tokenizer));

            let mut card = CardDetails::test_card();
            if let Some(number) = card_number {
                card.number = number;
            } else {
                info!("No card given; using the Stripe test card");
            }
            if let Some(month) = exp_month {
                card.exp_month = month;
            }
            if let Some(year) = exp_year {
                card.exp_year = year;
            }
            if let Some(cvc) = cvc {
                card.cvc = cvc;
            }

            flow.load_plans().await?;
            let plan = flow.select(plan_id)?;
            println!("Subscribing to {} for ${:.2}", plan.plan_name, plan.price);
            let receipt = flow.confirm(&card).await?;
            println!(
                "Company #{} is now on the {} plan",
                receipt.company_id, receipt.plan.plan_name
            );
        }
        Command::Orders => {
            let bearer = session.bearer()?;
            let mut orders = api.my_orders(&bearer).await?;
            orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));

            let overview = OrderOverview::from_orders(&orders, Local::now().date_naive());
            println!("Total orders:   {}", overview.total_orders);
            println!("Pending orders: {}", overview.pending_orders);
            println!("Today's orders: {}", overview.todays_orders.len());
            for order in &overview.recent_orders {
                println!(
                    "#{:<6} {}  {} meal(s)  {:<12} {:<10} ${}",
                    order.order_id,
                    order.order_date.format("%Y-%m-%d %H:%M"),
                    order.meals.len(),
                    order.delivery_status,
                    order.payment_status.as_deref().unwrap_or("-"),
                    order.total()
                );
            }
        }
        Command::Report { out_dir } => {
            let bearer = session.bearer()?;
            let mut orders = api.all_orders(&bearer).await?;
            orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));

            let mut payments = match api.payments(&bearer).await {
                Ok(payments) => payments,
                Err(e) => {
                    warn!("Payments unavailable, report will omit them: {}", e);
                    Vec::new()
                }
            };
            payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));

            let now = Local::now();
            let summary = summarize_sales(&orders, now.naive_local());
            let out_dir = out_dir.unwrap_or_else(|| config.report_dir.clone());
            let path = export_sales_report(&summary, &orders, &payments, &now, &out_dir)?;
            println!("Report saved to {}", path.display());
        }
    }
    Ok(())
}

fn prompt_line(prompt: &str) -> anyhow::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let line = line.trim().to_string();
    if line.is_empty() {
        bail!("no input given");
    }
    Ok(line)
}
