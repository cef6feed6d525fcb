//! Dispatch board state machine: optimistic local moves, eager unassign,
//! per-trip confirmation and last-request-wins board loads.

use std::sync::Arc;

use chrono::NaiveDate;
use shared::{
    domain::{Driver, OrderId, TripId, Vendor},
    protocol::{CreateOrderRequest, CreateTripRequest, Order, Trip, UpdateOrderDetailsRequest},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};

use crate::{
    api::DispatchApi,
    board::{DispatchBoard, MoveOutcome, OrderLocation, TripState},
    error::{ClientError, ClientResult},
};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    BoardLoaded { date: NaiveDate },
    TripStateChanged { trip_id: TripId, state: TripState },
    Notification(Notification),
    /// The server answered `401`; the caller should send the operator back
    /// to sign-in.
    SessionExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load started before this one finished; its result was dropped.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed,
    NothingToConfirm,
}

struct ControllerState {
    board: Option<DispatchBoard>,
    requested_date: Option<NaiveDate>,
    load_generation: u64,
    vendors: Vec<Vendor>,
    drivers: Vec<Driver>,
}

pub struct DispatchController {
    api: Arc<dyn DispatchApi>,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<DispatchEvent>,
}

impl DispatchController {
    pub fn new(api: Arc<dyn DispatchApi>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            api,
            inner: Mutex::new(ControllerState {
                board: None,
                requested_date: None,
                load_generation: 0,
                vendors: Vec::new(),
                drivers: Vec::new(),
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events.subscribe()
    }

    pub async fn board(&self) -> Option<DispatchBoard> {
        self.inner.lock().await.board.clone()
    }

    pub async fn vendors(&self) -> Vec<Vendor> {
        self.inner.lock().await.vendors.clone()
    }

    pub async fn drivers(&self) -> Vec<Driver> {
        self.inner.lock().await.drivers.clone()
    }

    /// Date of the most recent load request, applied or still in flight.
    pub async fn requested_date(&self) -> Option<NaiveDate> {
        self.inner.lock().await.requested_date
    }

    /// Replaces the whole board with the server's view of `date`. Only the
    /// most recently started load may apply its result.
    pub async fn load_board(&self, date: NaiveDate) -> ClientResult<LoadOutcome> {
        let generation = {
            let mut guard = self.inner.lock().await;
            guard.load_generation += 1;
            guard.requested_date = Some(date);
            guard.load_generation
        };

        let fetched = futures::try_join!(
            self.api.dispatch_data(date),
            self.api.list_vendors(),
            self.api.list_drivers(),
        );

        let mut guard = self.inner.lock().await;
        if guard.load_generation != generation {
            warn!(%date, generation, latest = guard.load_generation, "discarding stale board load");
            return Ok(LoadOutcome::Superseded);
        }

        match fetched {
            Ok((data, vendors, drivers)) => {
                let board = DispatchBoard::from_snapshot(date, data);
                info!(
                    %date,
                    pending = board.pending_orders().len(),
                    trips = board.trips().len(),
                    "dispatch board loaded"
                );
                guard.board = Some(board);
                guard.vendors = vendors;
                guard.drivers = drivers;
                drop(guard);
                self.emit(DispatchEvent::BoardLoaded { date });
                Ok(LoadOutcome::Applied)
            }
            Err(err) => {
                drop(guard);
                self.report_failure("Failed to load dispatch board", &err);
                Err(err)
            }
        }
    }

    /// Reloads the most recently requested date.
    pub async fn reload(&self) -> ClientResult<LoadOutcome> {
        let date = self
            .requested_date()
            .await
            .ok_or(ClientError::BoardNotLoaded)?;
        self.load_board(date).await
    }

    /// Moves an order on the board. Moves into a trip stay local until that
    /// trip is confirmed; moves to the pending pool unassign on the server
    /// right away and then refetch the board, whether or not the server
    /// accepted the change.
    pub async fn move_order(
        &self,
        order_id: OrderId,
        destination: OrderLocation,
    ) -> ClientResult<MoveOutcome> {
        let (outcome, states) = {
            let mut guard = self.inner.lock().await;
            let board = guard.board.as_mut().ok_or(ClientError::BoardNotLoaded)?;
            let outcome = board.move_order(order_id, destination)?;
            let states: Vec<(TripId, TripState)> = outcome
                .dirtied
                .iter()
                .filter_map(|trip_id| board.trip_state(*trip_id).map(|state| (*trip_id, state)))
                .collect();
            (outcome, states)
        };

        for (trip_id, state) in states {
            self.emit(DispatchEvent::TripStateChanged { trip_id, state });
        }

        if !outcome.requires_unassign() {
            return Ok(outcome);
        }

        match self.api.unassign_order(order_id).await {
            Ok(_) => {
                info!(order_id = order_id.0, from = %outcome.from, "order unassigned");
                self.refresh_after_mutation().await;
                Ok(outcome)
            }
            Err(err) => {
                self.report_failure("Failed to unassign order", &err);
                self.resync(&err).await;
                Err(err)
            }
        }
    }

    /// Sends a dirty trip's full order list to the server, then refetches the
    /// board. Clean trips and trips already confirming are left alone without
    /// a request.
    pub async fn confirm_trip(&self, trip_id: TripId) -> ClientResult<ConfirmOutcome> {
        let outcome = self.send_confirmation(trip_id).await?;
        if outcome == ConfirmOutcome::Confirmed {
            self.refresh_after_mutation().await;
        }
        Ok(outcome)
    }

    async fn send_confirmation(&self, trip_id: TripId) -> ClientResult<ConfirmOutcome> {
        let order_ids = {
            let mut guard = self.inner.lock().await;
            let board = guard.board.as_mut().ok_or(ClientError::BoardNotLoaded)?;
            match board.begin_confirm(trip_id)? {
                Some(order_ids) => order_ids,
                None => return Ok(ConfirmOutcome::NothingToConfirm),
            }
        };
        self.emit(DispatchEvent::TripStateChanged {
            trip_id,
            state: TripState::Confirming,
        });

        let count = order_ids.len();
        let result = self.api.assign_orders(trip_id, order_ids).await;

        let state = {
            let mut guard = self.inner.lock().await;
            guard
                .board
                .as_mut()
                .and_then(|board| board.finish_confirm(trip_id, result.is_ok()))
        };
        if let Some(state) = state {
            self.emit(DispatchEvent::TripStateChanged { trip_id, state });
        }

        match result {
            Ok(()) => {
                info!(trip_id = trip_id.0, orders = count, "trip confirmed");
                self.notify(Notification::success("Trip confirmed successfully!"));
                Ok(ConfirmOutcome::Confirmed)
            }
            Err(err) => {
                self.report_failure("Could not confirm trip", &err);
                self.resync(&err).await;
                Err(err)
            }
        }
    }

    /// Confirms every dirty trip in lane order, stopping at the first failure.
    /// The board is refetched once, after the last confirmation, so pending
    /// edits on later trips survive until they are sent.
    pub async fn confirm_all(&self) -> ClientResult<Vec<TripId>> {
        let dirty = match self.inner.lock().await.board.as_ref() {
            Some(board) => board.dirty_trips(),
            None => return Err(ClientError::BoardNotLoaded),
        };

        let mut confirmed = Vec::with_capacity(dirty.len());
        for trip_id in dirty {
            if self.send_confirmation(trip_id).await? == ConfirmOutcome::Confirmed {
                confirmed.push(trip_id);
            }
        }
        if !confirmed.is_empty() {
            self.refresh_after_mutation().await;
        }
        Ok(confirmed)
    }

    pub async fn create_order(&self, request: CreateOrderRequest) -> ClientResult<Order> {
        request.validate()?;
        match self.api.create_order(request).await {
            Ok(order) => {
                info!(order_id = order.id.0, "order created");
                self.notify(Notification::success("Order created successfully!"));
                self.refresh_after_mutation().await;
                Ok(order)
            }
            Err(err) => {
                self.report_failure("Could not create order", &err);
                Err(err)
            }
        }
    }

    pub async fn create_trip(&self, request: CreateTripRequest) -> ClientResult<Trip> {
        request.validate()?;
        match self.api.create_trip(request).await {
            Ok(trip) => {
                info!(trip_id = trip.id.0, route = %trip.route_name, "trip created");
                self.notify(Notification::success("Trip created successfully!"));
                self.refresh_after_mutation().await;
                Ok(trip)
            }
            Err(err) => {
                self.report_failure("Could not create trip", &err);
                Err(err)
            }
        }
    }

    pub async fn update_order_details(
        &self,
        order_id: OrderId,
        request: UpdateOrderDetailsRequest,
    ) -> ClientResult<Order> {
        request.validate()?;
        match self.api.update_order_details(order_id, request).await {
            Ok(order) => {
                info!(order_id = order.id.0, status = ?order.status, "order details updated");
                self.notify(Notification::success("Order details updated."));
                self.refresh_after_mutation().await;
                Ok(order)
            }
            Err(err) => {
                self.report_failure("Could not update order", &err);
                Err(err)
            }
        }
    }

    pub async fn list_drivers(&self) -> ClientResult<Vec<Driver>> {
        let drivers = self.api.list_drivers().await.inspect_err(|err| {
            self.report_failure("Failed to load drivers", err);
        })?;
        self.inner.lock().await.drivers = drivers.clone();
        Ok(drivers)
    }

    pub async fn list_vendors(&self) -> ClientResult<Vec<Vendor>> {
        let vendors = self.api.list_vendors().await.inspect_err(|err| {
            self.report_failure("Failed to load vendors", err);
        })?;
        self.inner.lock().await.vendors = vendors.clone();
        Ok(vendors)
    }

    /// Refetches the board once the server has accepted a change. The change
    /// already stands, so a failed reload is only reported; nothing is rolled
    /// back.
    async fn refresh_after_mutation(&self) {
        if self.requested_date().await.is_none() {
            return;
        }
        if let Err(err) = self.reload().await {
            warn!("board reload after accepted change failed: {err}");
        }
    }

    /// Brings the board back in line with the server after a failed remote
    /// mutation. Skipped when the session is gone, since the reload would be
    /// rejected too.
    async fn resync(&self, cause: &ClientError) {
        if cause.is_unauthorized() {
            return;
        }
        if let Err(err) = self.reload().await {
            warn!("board resync failed: {err}");
        }
    }

    fn report_failure(&self, context: &str, err: &ClientError) {
        if err.is_unauthorized() {
            warn!("{context}: session expired");
            self.emit(DispatchEvent::SessionExpired);
            return;
        }
        error!("{context}: {err}");
        self.notify(Notification::error(format!(
            "{context}: {}",
            err.user_message()
        )));
    }

    fn notify(&self, notification: Notification) {
        self.emit(DispatchEvent::Notification(notification));
    }

    fn emit(&self, event: DispatchEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
