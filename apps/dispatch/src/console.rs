use anyhow::Result;
use chrono::NaiveDate;
use client_core::{ClientError, ClientResult, ConfirmOutcome, DispatchController, OrderLocation};
use shared::domain::{OrderId, TripId};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::render;

const HELP: &str = "\
commands:
  show                     print the board
  date YYYY-MM-DD          load another date
  move ORDER pending|TRIP  move an order
  confirm TRIP|all         send trip assignments to the server
  reload                   refetch the current date
  drivers | vendors        list the directory
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Show,
    Date(NaiveDate),
    Move {
        order_id: OrderId,
        destination: OrderLocation,
    },
    Confirm(TripId),
    ConfirmAll,
    Reload,
    Drivers,
    Vendors,
    Help,
    Quit,
}

/// Parses one console line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = parts.collect();

    let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("show" | "board", []) => ConsoleCommand::Show,
        ("date", [raw]) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(ConsoleCommand::Date)
            .map_err(|_| format!("invalid date '{raw}', expected YYYY-MM-DD"))?,
        ("move" | "mv", [order, destination]) => ConsoleCommand::Move {
            order_id: parse_id(order).map(OrderId)?,
            destination: destination.parse()?,
        },
        ("confirm", ["all"]) => ConsoleCommand::ConfirmAll,
        ("confirm", [trip]) => {
            ConsoleCommand::Confirm(parse_id(trip.trim_start_matches("trip:")).map(TripId)?)
        }
        ("reload", []) => ConsoleCommand::Reload,
        ("drivers", []) => ConsoleCommand::Drivers,
        ("vendors", []) => ConsoleCommand::Vendors,
        ("help" | "?", []) => ConsoleCommand::Help,
        ("quit" | "exit" | "q", []) => ConsoleCommand::Quit,
        (other, _) => return Err(format!("unrecognized command '{other}'; try 'help'")),
    };
    Ok(Some(command))
}

fn parse_id(raw: &str) -> Result<i64, String> {
    raw.trim_start_matches('#')
        .parse()
        .map_err(|_| format!("invalid id '{raw}'"))
}

pub async fn run(controller: &DispatchController, date: NaiveDate) -> Result<()> {
    if controller.load_board(date).await.is_ok() {
        print_board(controller).await;
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        if command == ConsoleCommand::Quit {
            break;
        }
        if let Err(err) = execute(controller, command).await {
            tracing::debug!("console command failed: {err}");
            if !reported_by_controller(&err) {
                eprintln!("{}", err.user_message());
            }
        }
    }
    Ok(())
}

/// Remote failures already reach the terminal through the event stream.
fn reported_by_controller(err: &ClientError) -> bool {
    matches!(
        err,
        ClientError::Unauthorized
            | ClientError::Transport(_)
            | ClientError::Server { .. }
            | ClientError::Decode(_)
    )
}

async fn execute(
    controller: &DispatchController,
    command: ConsoleCommand,
) -> ClientResult<()> {
    match command {
        ConsoleCommand::Show => print_board(controller).await,
        ConsoleCommand::Date(date) => {
            controller.load_board(date).await?;
            print_board(controller).await;
        }
        ConsoleCommand::Move {
            order_id,
            destination,
        } => {
            let outcome = controller.move_order(order_id, destination).await?;
            if outcome.is_noop() {
                println!("order {order_id} is already in {destination}");
            } else {
                println!("order {order_id}: {} -> {}", outcome.from, outcome.to);
            }
        }
        ConsoleCommand::Confirm(trip_id) => match controller.confirm_trip(trip_id).await? {
            ConfirmOutcome::Confirmed => {}
            ConfirmOutcome::NothingToConfirm => println!("trip {trip_id} has no changes"),
        },
        ConsoleCommand::ConfirmAll => {
            let confirmed = controller.confirm_all().await?;
            println!("confirmed {} trip(s)", confirmed.len());
        }
        ConsoleCommand::Reload => {
            controller.reload().await?;
            print_board(controller).await;
        }
        ConsoleCommand::Drivers => {
            for driver in controller.list_drivers().await? {
                println!("{}", render::driver_line(&driver));
            }
        }
        ConsoleCommand::Vendors => {
            for vendor in controller.list_vendors().await? {
                println!("{}", render::vendor_line(&vendor));
            }
        }
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

async fn print_board(controller: &DispatchController) {
    match controller.board().await {
        Some(board) => print!("{}", render::board(&board)),
        None => println!("no board loaded; use 'date YYYY-MM-DD'"),
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
