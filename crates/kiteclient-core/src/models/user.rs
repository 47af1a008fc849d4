use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `data` payload of `GET /user/profile`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub user_id: String,
    pub user_name: Option<String>,
    pub user_shortname: Option<String>,
    pub user_type: Option<String>,
    pub email: Option<String>,
    pub broker: Option<String>,
    pub exchanges: Vec<String>,
    pub products: Vec<String>,
    pub order_types: Vec<String>,
}

/// Margins for every segment, keyed by segment name.
pub type Margins = HashMap<String, SegmentMargins>;

/// `data` payload of `GET /user/margins/{segment}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentMargins {
    pub enabled: bool,
    pub net: f64,
    pub available: AvailableMargin,
    /// Utilisation broken down by component (span, exposure, debits, ...).
    pub utilised: HashMap<String, f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailableMargin {
    pub adhoc_margin: f64,
    pub cash: f64,
    pub opening_balance: f64,
    pub live_balance: f64,
    pub collateral: f64,
    pub intraday_payin: f64,
}
