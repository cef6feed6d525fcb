//! Plain-text views of the board and the controller's events.

use std::fmt::Write;

use client_core::{DispatchBoard, DispatchEvent, NotificationLevel};
use serde_json::json;
use shared::{
    domain::{Driver, Vendor},
    protocol::Order,
};

pub fn board(board: &DispatchBoard) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Dispatch board for {}", board.date());

    let _ = writeln!(out, "Pending orders ({}):", board.pending_orders().len());
    if board.pending_orders().is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for order in board.pending_orders() {
        let _ = writeln!(out, "  {}", order_line(order));
    }

    for planned in board.trips() {
        let trip = &planned.trip;
        let units: i32 = trip.orders.iter().map(|order| order.assigned_units).sum();
        let _ = writeln!(
            out,
            "Trip {} {} / {} [{}] {} order(s), {} units",
            trip.id,
            trip.route_name,
            trip.driver.name,
            planned.state,
            trip.orders.len(),
            units
        );
        for order in &trip.orders {
            let _ = writeln!(out, "  {}", order_line(order));
        }
    }
    out
}

pub fn order_line(order: &Order) -> String {
    format!(
        "#{} {} x{}",
        order.id, order.vendor.name, order.assigned_units
    )
}

pub fn driver_line(driver: &Driver) -> String {
    match &driver.username {
        Some(username) => format!("{}\t{} ({username})", driver.id, driver.name),
        None => format!("{}\t{}", driver.id, driver.name),
    }
}

pub fn vendor_line(vendor: &Vendor) -> String {
    let mut line = format!("{}\t{}", vendor.id, vendor.name);
    if let Some(phone) = &vendor.phone_number {
        let _ = write!(line, "\t{phone}");
    }
    line
}

/// One terminal line per event, or `None` for events not worth showing.
pub fn event_line(event: &DispatchEvent, as_json: bool) -> Option<String> {
    if as_json {
        let value = match event {
            DispatchEvent::BoardLoaded { date } => {
                json!({"event": "board_loaded", "date": date.to_string()})
            }
            DispatchEvent::TripStateChanged { trip_id, state } => {
                json!({"event": "trip_state", "tripId": trip_id.0, "state": state.to_string()})
            }
            DispatchEvent::Notification(notification) => json!({
                "event": "notification",
                "level": level_label(notification.level),
                "message": notification.message,
            }),
            DispatchEvent::SessionExpired => json!({"event": "session_expired"}),
        };
        return Some(value.to_string());
    }

    match event {
        DispatchEvent::BoardLoaded { .. } | DispatchEvent::TripStateChanged { .. } => None,
        DispatchEvent::Notification(notification) => Some(format!(
            "[{}] {}",
            level_label(notification.level),
            notification.message
        )),
        DispatchEvent::SessionExpired => {
            Some("[error] session expired; sign in again and pass a fresh --token".to_string())
        }
    }
}

fn level_label(level: NotificationLevel) -> &'static str {
    match level {
        NotificationLevel::Success => "success",
        NotificationLevel::Error => "error",
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
