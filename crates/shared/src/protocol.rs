use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{Driver, DriverId, OrderId, OrderStatus, TripId, TripRef, Vendor, VendorId},
    error::{ApiError, ErrorCode},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub vendor: Vendor,
    pub assigned_units: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip: Option<TripRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_units: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<f64>,
    #[serde(default)]
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: TripId,
    #[serde(default)]
    pub route_name: String,
    pub driver: Driver,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_weight: Option<f64>,
}

impl Trip {
    pub fn order_ids(&self) -> Vec<OrderId> {
        self.orders.iter().map(|order| order.id).collect()
    }
}

/// Response of `GET /api/dispatch?date=`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchData {
    #[serde(default)]
    pub pending_orders: Vec<Order>,
    #[serde(default)]
    pub planned_trips: Vec<Trip>,
}

/// Desired final assignment of a trip. Replaces whatever the server holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignOrdersRequest {
    pub trip_id: TripId,
    pub order_ids: Vec<OrderId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub vendor_id: VendorId,
    pub assigned_units: i32,
    pub order_date: NaiveDate,
}

impl CreateOrderRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.assigned_units <= 0 {
            return Err(ApiError::new(
                ErrorCode::Validation,
                "Units must be a positive number.",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripRequest {
    pub route_name: String,
    pub driver_id: DriverId,
    pub trip_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded_weight: Option<f64>,
}

impl CreateTripRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.route_name.trim().is_empty() {
            return Err(ApiError::new(
                ErrorCode::Validation,
                "Please enter a route name and select a driver.",
            ));
        }
        if let Some(weight) = self.loaded_weight {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ApiError::new(
                    ErrorCode::Validation,
                    "Loaded weight must be a non-negative number.",
                ));
            }
        }
        Ok(())
    }
}

/// Delivery details recorded against an order after the trip ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderDetailsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_units: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl UpdateOrderDetailsRequest {
    pub fn is_empty(&self) -> bool {
        self.delivered_units.is_none() && self.payment_amount.is_none() && self.weight.is_none()
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.is_empty() {
            return Err(ApiError::new(
                ErrorCode::Validation,
                "Nothing to update: provide delivered units, payment amount or weight.",
            ));
        }
        if matches!(self.delivered_units, Some(units) if units < 0) {
            return Err(ApiError::new(
                ErrorCode::Validation,
                "Delivered units cannot be negative.",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
