//! Local projection of the dispatch board for one date.
//!
//! Every order on the board lives in exactly one place: the pending pool or
//! the order list of exactly one trip. All mutators preserve that.

use std::{collections::HashSet, fmt, str::FromStr};

use chrono::NaiveDate;
use serde::Serialize;
use shared::{
    domain::{OrderId, TripId, TripRef},
    protocol::{DispatchData, Order, Trip},
};
use tracing::warn;

use crate::error::{ClientError, ClientResult};

/// Client-side sync state of a trip lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TripState {
    /// Matches the last server snapshot or confirmation.
    #[default]
    Clean,
    /// Order set changed locally and not yet confirmed.
    Dirty,
    /// Confirmation request in flight.
    Confirming,
}

impl TripState {
    pub fn has_unconfirmed_changes(self) -> bool {
        self != Self::Clean
    }
}

impl fmt::Display for TripState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Clean => "clean",
            Self::Dirty => "dirty",
            Self::Confirming => "confirming",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderLocation {
    Pending,
    Trip(TripId),
}

impl fmt::Display for OrderLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Trip(trip_id) => write!(f, "trip {trip_id}"),
        }
    }
}

impl FromStr for OrderLocation {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("pending") {
            return Ok(Self::Pending);
        }
        let id = raw
            .strip_prefix("trip:")
            .or_else(|| raw.strip_prefix("trip"))
            .unwrap_or(raw)
            .trim();
        id.parse::<i64>()
            .map(|id| Self::Trip(TripId(id)))
            .map_err(|_| format!("expected 'pending' or a trip id, got '{raw}'"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTrip {
    pub trip: Trip,
    pub state: TripState,
}

impl PlannedTrip {
    pub fn id(&self) -> TripId {
        self.trip.id
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.trip.orders.iter().any(|order| order.id == order_id)
    }
}

/// What a successful `move_order` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub order_id: OrderId,
    pub from: OrderLocation,
    pub to: OrderLocation,
    /// Trips whose order set changed, in the order they were touched.
    pub dirtied: Vec<TripId>,
}

impl MoveOutcome {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    /// Unassignment is the only move that goes to the server immediately.
    pub fn requires_unassign(&self) -> bool {
        !self.is_noop() && self.to == OrderLocation::Pending
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchBoard {
    date: NaiveDate,
    pending: Vec<Order>,
    trips: Vec<PlannedTrip>,
}

impl DispatchBoard {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            pending: Vec::new(),
            trips: Vec::new(),
        }
    }

    /// Builds a clean board from a server snapshot. Orders the snapshot lists
    /// more than once keep their first trip placement; later copies are
    /// dropped.
    pub fn from_snapshot(date: NaiveDate, data: DispatchData) -> Self {
        let mut seen_orders = HashSet::new();
        let mut seen_trips = HashSet::new();
        let mut dropped = 0usize;

        let mut trips = Vec::with_capacity(data.planned_trips.len());
        for mut trip in data.planned_trips {
            if !seen_trips.insert(trip.id) {
                warn!(trip_id = trip.id.0, "dropping duplicate trip from dispatch snapshot");
                dropped += trip.orders.len();
                continue;
            }
            let trip_ref = TripRef { id: trip.id };
            trip.orders.retain(|order| {
                let fresh = seen_orders.insert(order.id);
                if !fresh {
                    dropped += 1;
                }
                fresh
            });
            for order in &mut trip.orders {
                order.trip = Some(trip_ref);
            }
            trips.push(PlannedTrip {
                trip,
                state: TripState::Clean,
            });
        }

        let mut pending = Vec::with_capacity(data.pending_orders.len());
        for mut order in data.pending_orders {
            if !seen_orders.insert(order.id) {
                dropped += 1;
                continue;
            }
            order.trip = None;
            pending.push(order);
        }

        if dropped > 0 {
            warn!(
                %date,
                dropped,
                "dispatch snapshot listed orders in more than one place; kept first placement"
            );
        }

        Self {
            date,
            pending,
            trips,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn pending_orders(&self) -> &[Order] {
        &self.pending
    }

    pub fn trips(&self) -> &[PlannedTrip] {
        &self.trips
    }

    pub fn trip(&self, trip_id: TripId) -> Option<&PlannedTrip> {
        self.trips.iter().find(|trip| trip.id() == trip_id)
    }

    pub fn trip_state(&self, trip_id: TripId) -> Option<TripState> {
        self.trip(trip_id).map(|trip| trip.state)
    }

    pub fn locate(&self, order_id: OrderId) -> Option<OrderLocation> {
        if self.pending.iter().any(|order| order.id == order_id) {
            return Some(OrderLocation::Pending);
        }
        self.trips
            .iter()
            .find(|trip| trip.contains(order_id))
            .map(|trip| OrderLocation::Trip(trip.id()))
    }

    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.pending
            .iter()
            .chain(self.trips.iter().flat_map(|trip| trip.trip.orders.iter()))
            .find(|order| order.id == order_id)
    }

    pub fn order_count(&self) -> usize {
        self.pending.len()
            + self
                .trips
                .iter()
                .map(|trip| trip.trip.orders.len())
                .sum::<usize>()
    }

    /// Trips with local edits waiting for confirmation.
    pub fn dirty_trips(&self) -> Vec<TripId> {
        self.trips
            .iter()
            .filter(|trip| trip.state == TripState::Dirty)
            .map(PlannedTrip::id)
            .collect()
    }

    /// True when no order id appears twice across the pending pool and trips.
    pub fn is_consistent(&self) -> bool {
        let mut seen = HashSet::new();
        self.pending
            .iter()
            .chain(self.trips.iter().flat_map(|trip| trip.trip.orders.iter()))
            .all(|order| seen.insert(order.id))
    }

    /// Moves an order to `destination`. Validation happens before any
    /// mutation, so a rejected move leaves the board untouched. Moving an
    /// order to where it already is does nothing.
    pub fn move_order(
        &mut self,
        order_id: OrderId,
        destination: OrderLocation,
    ) -> ClientResult<MoveOutcome> {
        let from = self
            .locate(order_id)
            .ok_or(ClientError::UnknownOrder(order_id))?;
        if let OrderLocation::Trip(trip_id) = destination {
            if self.trip(trip_id).is_none() {
                return Err(ClientError::UnknownTrip(trip_id));
            }
        }

        let mut outcome = MoveOutcome {
            order_id,
            from,
            to: destination,
            dirtied: Vec::new(),
        };
        if outcome.is_noop() {
            return Ok(outcome);
        }

        let mut order = match from {
            OrderLocation::Pending => {
                let index = self
                    .pending
                    .iter()
                    .position(|order| order.id == order_id)
                    .ok_or(ClientError::UnknownOrder(order_id))?;
                self.pending.remove(index)
            }
            OrderLocation::Trip(source_id) => {
                let source = self
                    .trip_mut(source_id)
                    .ok_or(ClientError::UnknownTrip(source_id))?;
                let index = source
                    .trip
                    .orders
                    .iter()
                    .position(|order| order.id == order_id)
                    .ok_or(ClientError::UnknownOrder(order_id))?;
                source.state = TripState::Dirty;
                outcome.dirtied.push(source_id);
                source.trip.orders.remove(index)
            }
        };

        match destination {
            OrderLocation::Pending => {
                order.trip = None;
                self.pending.push(order);
            }
            OrderLocation::Trip(target_id) => {
                order.trip = Some(TripRef { id: target_id });
                let target = self
                    .trip_mut(target_id)
                    .ok_or(ClientError::UnknownTrip(target_id))?;
                target.trip.orders.push(order);
                target.state = TripState::Dirty;
                outcome.dirtied.push(target_id);
            }
        }

        debug_assert!(self.is_consistent());
        Ok(outcome)
    }

    /// Marks a dirty trip as confirming and returns its full order-id list.
    /// `None` means there is nothing to confirm (clean or already in flight).
    pub fn begin_confirm(&mut self, trip_id: TripId) -> ClientResult<Option<Vec<OrderId>>> {
        let trip = self
            .trip_mut(trip_id)
            .ok_or(ClientError::UnknownTrip(trip_id))?;
        if trip.state != TripState::Dirty {
            return Ok(None);
        }
        trip.state = TripState::Confirming;
        Ok(Some(trip.trip.order_ids()))
    }

    /// Settles an in-flight confirmation. A trip edited while the request was
    /// in flight stays dirty even when the request succeeded.
    pub fn finish_confirm(&mut self, trip_id: TripId, succeeded: bool) -> Option<TripState> {
        let trip = self.trip_mut(trip_id)?;
        trip.state = match (trip.state, succeeded) {
            (TripState::Confirming, true) => TripState::Clean,
            (TripState::Confirming, false) => TripState::Dirty,
            (other, _) => other,
        };
        Some(trip.state)
    }

    fn trip_mut(&mut self, trip_id: TripId) -> Option<&mut PlannedTrip> {
        self.trips.iter_mut().find(|trip| trip.id() == trip_id)
    }
}

#[cfg(test)]
#[path = "tests/board_tests.rs"]
mod tests;
