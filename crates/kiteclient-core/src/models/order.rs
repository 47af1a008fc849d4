use serde::{Deserialize, Serialize};

use super::constants::{Exchange, OrderType, Product, TransactionType, Validity, Variety};

/// Form body for `POST /orders/{variety}`.
///
/// Unset optional fields are left out of the form entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceOrderParams {
    pub variety: Variety,
    pub exchange: Exchange,
    pub tradingsymbol: String,
    pub transaction_type: TransactionType,
    pub quantity: u32,
    pub product: Product,
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity: Option<Validity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclosed_quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squareoff: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stoploss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_stoploss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl PlaceOrderParams {
    /// Create an order with only the required fields set.
    pub fn new(
        variety: Variety,
        exchange: Exchange,
        tradingsymbol: impl Into<String>,
        transaction_type: TransactionType,
        quantity: u32,
        product: Product,
        order_type: OrderType,
    ) -> Self {
        Self {
            variety,
            exchange,
            tradingsymbol: tradingsymbol.into(),
            transaction_type,
            quantity,
            product,
            order_type,
            price: None,
            validity: None,
            disclosed_quantity: None,
            trigger_price: None,
            squareoff: None,
            stoploss: None,
            trailing_stoploss: None,
            tag: None,
        }
    }

    pub fn price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn validity(mut self, validity: Validity) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn disclosed_quantity(mut self, quantity: u32) -> Self {
        self.disclosed_quantity = Some(quantity);
        self
    }

    pub fn trigger_price(mut self, price: f64) -> Self {
        self.trigger_price = Some(price);
        self
    }

    pub fn squareoff(mut self, value: f64) -> Self {
        self.squareoff = Some(value);
        self
    }

    pub fn stoploss(mut self, value: f64) -> Self {
        self.stoploss = Some(value);
        self
    }

    pub fn trailing_stoploss(mut self, value: f64) -> Self {
        self.trailing_stoploss = Some(value);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Form body for `PUT /orders/{variety}/{order_id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModifyOrderParams {
    pub variety: Variety,
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_type: Option<OrderType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity: Option<Validity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclosed_quantity: Option<u32>,
}

impl ModifyOrderParams {
    pub fn new(variety: Variety, order_id: impl Into<String>) -> Self {
        Self {
            variety,
            order_id: order_id.into(),
            parent_order_id: None,
            quantity: None,
            price: None,
            order_type: None,
            trigger_price: None,
            validity: None,
            disclosed_quantity: None,
        }
    }

    pub fn parent_order_id(mut self, id: impl Into<String>) -> Self {
        self.parent_order_id = Some(id.into());
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = Some(order_type);
        self
    }

    pub fn trigger_price(mut self, price: f64) -> Self {
        self.trigger_price = Some(price);
        self
    }

    pub fn validity(mut self, validity: Validity) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn disclosed_quantity(mut self, quantity: u32) -> Self {
        self.disclosed_quantity = Some(quantity);
        self
    }
}

/// `data` payload of the place/modify/cancel endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderId {
    pub order_id: String,
}

/// A row of the order book or of an order's history.
///
/// Enum-like fields stay strings: the book can contain values
/// (e.g. newer products) this client never sends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    pub order_id: String,
    pub parent_order_id: Option<String>,
    pub exchange_order_id: Option<String>,
    pub status: String,
    pub status_message: Option<String>,
    pub order_timestamp: Option<String>,
    pub variety: Option<String>,
    pub exchange: Option<String>,
    pub tradingsymbol: Option<String>,
    pub instrument_token: Option<u64>,
    pub order_type: Option<String>,
    pub transaction_type: Option<String>,
    pub validity: Option<String>,
    pub product: Option<String>,
    pub quantity: u32,
    pub disclosed_quantity: u32,
    pub price: f64,
    pub trigger_price: f64,
    pub average_price: f64,
    pub filled_quantity: u32,
    pub pending_quantity: u32,
    pub cancelled_quantity: u32,
    pub tag: Option<String>,
}
