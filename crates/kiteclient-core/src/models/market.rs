//! Market data returned by the quote endpoints, keyed by instrument
//! (`"NSE:INFY"`) in the response map.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Quote {
    pub instrument_token: Option<u64>,
    pub timestamp: Option<String>,
    pub last_trade_time: Option<String>,
    pub last_price: f64,
    pub last_quantity: u64,
    pub average_price: f64,
    pub volume: u64,
    pub buy_quantity: u64,
    pub sell_quantity: u64,
    pub net_change: f64,
    pub oi: f64,
    pub lower_circuit_limit: f64,
    pub upper_circuit_limit: f64,
    pub ohlc: Ohlc,
    pub depth: Depth,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Five levels of market depth on each side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Depth {
    pub buy: Vec<DepthLevel>,
    pub sell: Vec<DepthLevel>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthLevel {
    pub price: f64,
    pub quantity: u64,
    pub orders: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LastPrice {
    pub instrument_token: Option<u64>,
    pub last_price: f64,
}
