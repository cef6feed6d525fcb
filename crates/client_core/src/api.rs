//! HTTP boundary to the dispatch REST API.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Driver, OrderId, TripId, Vendor},
    error::ErrorCode,
    protocol::{
        AssignOrdersRequest, CreateOrderRequest, CreateTripRequest, DispatchData, Order, Trip,
        UpdateOrderDetailsRequest,
    },
};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
    config::Settings,
    error::{ClientError, ClientResult},
};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Remote collaborator consumed by the dispatch board.
#[async_trait]
pub trait DispatchApi: Send + Sync {
    async fn dispatch_data(&self, date: NaiveDate) -> ClientResult<DispatchData>;
    async fn unassign_order(&self, order_id: OrderId) -> ClientResult<Option<Order>>;
    async fn assign_orders(&self, trip_id: TripId, order_ids: Vec<OrderId>) -> ClientResult<()>;
    async fn create_order(&self, request: CreateOrderRequest) -> ClientResult<Order>;
    async fn update_order_details(
        &self,
        order_id: OrderId,
        request: UpdateOrderDetailsRequest,
    ) -> ClientResult<Order>;
    async fn create_trip(&self, request: CreateTripRequest) -> ClientResult<Trip>;
    async fn list_drivers(&self) -> ClientResult<Vec<Driver>>;
    async fn list_vendors(&self) -> ClientResult<Vec<Vendor>>;
}

pub struct HttpDispatchApi {
    http: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpDispatchApi {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self::with_client(Client::new(), base_url, token)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(token),
        }
    }

    pub fn from_settings(settings: &Settings) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self::with_client(
            http,
            settings.api_base.clone(),
            settings.token.clone(),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<Response> {
        let request = match self.token.read().await.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        self.check_status(response).await
    }

    async fn check_status(&self, response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(url = %response.url(), "dispatch api rejected credentials; clearing token");
            self.token.write().await.take();
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = if body.trim().is_empty() {
                "Request failed".to_string()
            } else {
                body
            };
            return Err(ClientError::Server {
                code: ErrorCode::from_status(status.as_u16()),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Decodes a JSON body, or `None` when the server answered with an empty
    /// or non-JSON body.
    async fn read_optional_json<T: DeserializeOwned>(response: Response) -> ClientResult<Option<T>> {
        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));
        let body = response.text().await?;
        if !is_json || body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl DispatchApi for HttpDispatchApi {
    async fn dispatch_data(&self, date: NaiveDate) -> ClientResult<DispatchData> {
        debug!(%date, "fetching dispatch board");
        let response = self
            .send(
                self.http
                    .get(self.url("/api/dispatch"))
                    .query(&[("date", date.format(DATE_FORMAT).to_string())]),
            )
            .await?;
        Self::read_json(response).await
    }

    async fn unassign_order(&self, order_id: OrderId) -> ClientResult<Option<Order>> {
        debug!(order_id = order_id.0, "unassigning order");
        let response = self
            .send(
                self.http
                    .put(self.url(&format!("/api/dispatch/orders/{}/unassign", order_id.0))),
            )
            .await?;
        Self::read_optional_json(response).await
    }

    async fn assign_orders(&self, trip_id: TripId, order_ids: Vec<OrderId>) -> ClientResult<()> {
        debug!(trip_id = trip_id.0, count = order_ids.len(), "assigning orders to trip");
        self.send(
            self.http
                .post(self.url("/api/dispatch/assign-orders"))
                .json(&AssignOrdersRequest { trip_id, order_ids }),
        )
        .await?;
        Ok(())
    }

    async fn create_order(&self, request: CreateOrderRequest) -> ClientResult<Order> {
        let response = self
            .send(self.http.post(self.url("/api/dispatch/orders")).json(&request))
            .await?;
        Self::read_json(response).await
    }

    async fn update_order_details(
        &self,
        order_id: OrderId,
        request: UpdateOrderDetailsRequest,
    ) -> ClientResult<Order> {
        let response = self
            .send(
                self.http
                    .put(self.url(&format!("/api/dispatch/orders/{}", order_id.0)))
                    .json(&request),
            )
            .await?;
        Self::read_json(response).await
    }

    async fn create_trip(&self, request: CreateTripRequest) -> ClientResult<Trip> {
        let response = self
            .send(self.http.post(self.url("/api/trips")).json(&request))
            .await?;
        Self::read_json(response).await
    }

    async fn list_drivers(&self) -> ClientResult<Vec<Driver>> {
        let response = self.send(self.http.get(self.url("/api/drivers"))).await?;
        Self::read_json(response).await
    }

    async fn list_vendors(&self) -> ClientResult<Vec<Vendor>> {
        let response = self.send(self.http.get(self.url("/api/vendors"))).await?;
        Self::read_json(response).await
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
