//! API client for the Kite order management REST API.
//!
//! Each method is one HTTP call: it attaches the session token, unwraps the
//! `{status, data}` envelope and returns `data`. Nothing is cached or retried.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::auth::SessionToken;
use crate::config::{Config, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::models::{
    LastPrice, MarginSegment, Margins, ModifyOrderParams, Order, OrderId, PlaceOrderParams,
    Positions, Profile, Quote, SegmentMargins, Variety,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the order management endpoints
pub const DEFAULT_API_ROOT: &str = "https://kite.zerodha.com/oms";

const KITE_VERSION_HEADER: &str = "X-Kite-Version";
const KITE_VERSION: &str = "3";

/// Query parameter naming an instrument (`EXCHANGE:TRADINGSYMBOL`)
const INSTRUMENT_PARAM: &str = "i";

/// Response envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: Option<String>,
    data: Option<T>,
    message: Option<String>,
    error_type: Option<String>,
}

/// API client for Kite.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct KiteClient {
    client: Client,
    root: String,
    token: SessionToken,
}

impl KiteClient {
    /// Create a client for the default API root
    pub fn new(token: SessionToken) -> Result<Self, ApiError> {
        Self::with_base_url(token, DEFAULT_API_ROOT)
    }

    pub fn with_base_url(token: SessionToken, root: impl Into<String>) -> Result<Self, ApiError> {
        Self::build(token, root.into(), Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn from_config(token: SessionToken, config: &Config) -> Result<Self, ApiError> {
        Self::build(
            token,
            config.api_root.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn build(token: SessionToken, root: String, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            root: root.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Create a new KiteClient with another token, sharing the connection pool.
    pub fn with_token(&self, token: SessionToken) -> Self {
        Self {
            client: self.client.clone(),
            root: self.root.clone(),
            token,
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    fn authorized(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.root, path))
            .header(header::AUTHORIZATION, self.token.authorization())
            .header(KITE_VERSION_HEADER, KITE_VERSION)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send the request and unwrap `data` from the envelope.
    async fn send<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T, ApiError> {
        debug!(path, "Sending request");

        let response = request.send().await?;
        let response = Self::check_response(response).await?;
        let body = response.text().await?;

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e))
        })?;

        if envelope.status.as_deref() == Some("error") {
            return Err(ApiError::from_envelope(envelope.error_type, envelope.message));
        }

        envelope
            .data
            .ok_or_else(|| ApiError::MissingData(path.to_string()))
    }

    fn instrument_query<I, S>(instruments: I) -> Vec<(&'static str, String)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        instruments
            .into_iter()
            .map(|i| (INSTRUMENT_PARAM, i.as_ref().to_string()))
            .collect()
    }

    // ===== Market Data =====

    /// Full quotes keyed by instrument (`"NSE:INFY"`)
    pub async fn quote<I, S>(&self, instruments: I) -> Result<HashMap<String, Quote>, ApiError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let path = "/quote";
        let request = self
            .authorized(Method::GET, path)
            .query(&Self::instrument_query(instruments));
        self.send(path, request).await
    }

    /// Last traded prices keyed by instrument
    pub async fn ltp<I, S>(&self, instruments: I) -> Result<HashMap<String, LastPrice>, ApiError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let path = "/quote/ltp";
        let request = self
            .authorized(Method::GET, path)
            .query(&Self::instrument_query(instruments));
        self.send(path, request).await
    }

    // ===== Account =====

    pub async fn profile(&self) -> Result<Profile, ApiError> {
        let path = "/user/profile";
        self.send(path, self.authorized(Method::GET, path)).await
    }

    /// Margins for all segments
    pub async fn margins(&self) -> Result<Margins, ApiError> {
        let path = "/user/margins";
        self.send(path, self.authorized(Method::GET, path)).await
    }

    pub async fn segment_margins(&self, segment: MarginSegment) -> Result<SegmentMargins, ApiError> {
        let path = format!("/user/margins/{}", segment);
        self.send(&path, self.authorized(Method::GET, &path)).await
    }

    pub async fn positions(&self) -> Result<Positions, ApiError> {
        let path = "/portfolio/positions";
        self.send(path, self.authorized(Method::GET, path)).await
    }

    // ===== Orders =====

    /// The day's order book
    pub async fn orders(&self) -> Result<Vec<Order>, ApiError> {
        let path = "/orders";
        self.send(path, self.authorized(Method::GET, path)).await
    }

    /// Every state transition of one order, oldest first
    pub async fn order_history(&self, order_id: &str) -> Result<Vec<Order>, ApiError> {
        let path = format!("/orders/{}", order_id);
        self.send(&path, self.authorized(Method::GET, &path)).await
    }

    /// Place an order, returning its order id
    pub async fn place_order(&self, params: &PlaceOrderParams) -> Result<String, ApiError> {
        let path = format!("/orders/{}", params.variety);
        let request = self.authorized(Method::POST, &path).form(params);
        let placed: OrderId = self.send(&path, request).await?;
        debug!(order_id = %placed.order_id, "Order placed");
        Ok(placed.order_id)
    }

    /// Modify a pending order, returning its order id
    pub async fn modify_order(&self, params: &ModifyOrderParams) -> Result<String, ApiError> {
        let path = format!("/orders/{}/{}", params.variety, params.order_id);
        let request = self.authorized(Method::PUT, &path).form(params);
        let modified: OrderId = self.send(&path, request).await?;
        Ok(modified.order_id)
    }

    /// Cancel a pending order, returning its order id.
    /// `parent_order_id` is needed for the legs of cover orders.
    pub async fn cancel_order(
        &self,
        variety: Variety,
        order_id: &str,
        parent_order_id: Option<&str>,
    ) -> Result<String, ApiError> {
        let path = format!("/orders/{}/{}", variety, order_id);
        let form: Vec<(&str, &str)> = parent_order_id
            .map(|parent| vec![("parent_order_id", parent)])
            .unwrap_or_default();
        let request = self.authorized(Method::DELETE, &path).form(&form);
        let cancelled: OrderId = self.send(&path, request).await?;
        Ok(cancelled.order_id)
    }
}
