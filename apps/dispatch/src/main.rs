use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use client_core::{
    config::normalize_api_base, load_settings, DispatchController, DispatchEvent,
    HttpDispatchApi, NotificationLevel, OrderLocation,
};
use shared::{
    domain::{DriverId, OrderId, VendorId},
    protocol::{CreateOrderRequest, CreateTripRequest, UpdateOrderDetailsRequest},
};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

mod console;
mod render;

#[derive(Parser, Debug)]
#[command(name = "dispatch", about = "Dispatch desk client")]
struct Cli {
    /// Base URL of the dispatch API. Overrides dispatch.toml and the environment.
    #[arg(long, global = true)]
    api_base: Option<String>,
    /// Bearer token for the dispatch API.
    #[arg(long, global = true)]
    token: Option<String>,
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Dispatch date (YYYY-MM-DD); defaults to today.
    #[arg(long, global = true)]
    date: Option<NaiveDate>,
    /// Print notifications and state changes as JSON lines.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show pending orders and planned trips for the date.
    Board,
    Drivers,
    Vendors,
    CreateOrder {
        #[arg(long)]
        vendor: i64,
        #[arg(long)]
        units: i32,
    },
    CreateTrip {
        #[arg(long)]
        route: String,
        #[arg(long)]
        driver: i64,
        #[arg(long)]
        loaded_weight: Option<f64>,
    },
    /// Record delivery details against an order.
    UpdateOrder {
        order: i64,
        #[arg(long)]
        delivered_units: Option<i32>,
        #[arg(long)]
        payment_amount: Option<f64>,
        #[arg(long)]
        weight: Option<f64>,
    },
    /// Apply a batch of moves, then confirm every trip they touched.
    Plan {
        /// ORDER=TRIP or ORDER=pending; may be repeated.
        #[arg(long = "move", value_name = "ORDER=DEST", value_parser = parse_move)]
        moves: Vec<(OrderId, OrderLocation)>,
    },
    /// Interactive line-oriented session.
    Console,
}

fn parse_move(raw: &str) -> Result<(OrderId, OrderLocation), String> {
    let (order, destination) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ORDER=DEST, got '{raw}'"))?;
    let order = order
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("invalid order id '{}'", order.trim()))?;
    Ok((OrderId(order), destination.parse()?))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings().context("failed to load dispatch settings")?;
    if let Some(api_base) = &cli.api_base {
        settings.api_base = normalize_api_base(api_base)?;
    }
    if let Some(token) = cli.token.clone() {
        settings.token = Some(token);
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        settings.request_timeout_secs = timeout_secs;
    }

    let api = HttpDispatchApi::from_settings(&settings)
        .context("failed to build dispatch API client")?;
    let controller = DispatchController::new(Arc::new(api));
    let printer = tokio::spawn(print_events(controller.subscribe_events(), cli.json));

    let date = cli
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let result = run(&controller, cli.command, date).await;

    drop(controller);
    let _ = printer.await;
    result
}

async fn run(controller: &Arc<DispatchController>, command: Command, date: NaiveDate) -> Result<()> {
    match command {
        Command::Board => {
            controller.load_board(date).await?;
            print_board(controller).await;
        }
        Command::Drivers => {
            for driver in controller.list_drivers().await? {
                println!("{}", render::driver_line(&driver));
            }
        }
        Command::Vendors => {
            for vendor in controller.list_vendors().await? {
                println!("{}", render::vendor_line(&vendor));
            }
        }
        Command::CreateOrder { vendor, units } => {
            let order = controller
                .create_order(CreateOrderRequest {
                    vendor_id: VendorId(vendor),
                    assigned_units: units,
                    order_date: date,
                })
                .await?;
            println!("created order {}", order.id);
        }
        Command::CreateTrip {
            route,
            driver,
            loaded_weight,
        } => {
            let trip = controller
                .create_trip(CreateTripRequest {
                    route_name: route,
                    driver_id: DriverId(driver),
                    trip_date: date,
                    loaded_weight,
                })
                .await?;
            println!("created trip {} ({})", trip.id, trip.route_name);
        }
        Command::UpdateOrder {
            order,
            delivered_units,
            payment_amount,
            weight,
        } => {
            let order = controller
                .update_order_details(
                    OrderId(order),
                    UpdateOrderDetailsRequest {
                        delivered_units,
                        payment_amount,
                        weight,
                    },
                )
                .await?;
            println!("updated order {}", order.id);
        }
        Command::Plan { moves } => {
            controller.load_board(date).await?;
            for (order_id, destination) in moves {
                controller
                    .move_order(order_id, destination)
                    .await
                    .with_context(|| format!("failed to move order {order_id} to {destination}"))?;
            }
            let confirmed = controller.confirm_all().await?;
            println!("confirmed {} trip(s)", confirmed.len());
            print_board(controller).await;
        }
        Command::Console => console::run(controller, date).await?,
    }
    Ok(())
}

async fn print_board(controller: &DispatchController) {
    match controller.board().await {
        Some(board) => print!("{}", render::board(&board)),
        None => println!("no board loaded"),
    }
}

async fn print_events(mut events: broadcast::Receiver<DispatchEvent>, json: bool) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(line) = render::event_line(&event, json) {
                    match &event {
                        DispatchEvent::Notification(n) if n.level == NotificationLevel::Error => {
                            eprintln!("{line}")
                        }
                        DispatchEvent::SessionExpired => eprintln!("{line}"),
                        _ => println!("{line}"),
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
