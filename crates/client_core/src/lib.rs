//! Dispatch desk client: REST access to the dispatch API and the board
//! state machine that sits on top of it.

pub mod api;
pub mod board;
pub mod config;
pub mod controller;
pub mod error;

pub use api::{DispatchApi, HttpDispatchApi};
pub use board::{DispatchBoard, MoveOutcome, OrderLocation, PlannedTrip, TripState};
pub use config::{load_settings, Settings};
pub use controller::{
    ConfirmOutcome, DispatchController, DispatchEvent, LoadOutcome, Notification,
    NotificationLevel,
};
pub use error::{ClientError, ClientResult};
