use serde::{Deserialize, Serialize};

/// `data` payload of `GET /portfolio/positions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Positions {
    pub net: Vec<Position>,
    pub day: Vec<Position>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    pub tradingsymbol: String,
    pub exchange: String,
    pub instrument_token: Option<u64>,
    pub product: String,
    pub quantity: i64,
    pub overnight_quantity: i64,
    pub multiplier: f64,
    pub average_price: f64,
    pub close_price: f64,
    pub last_price: f64,
    pub value: f64,
    pub pnl: f64,
    pub m2m: f64,
    pub unrealised: f64,
    pub realised: f64,
    pub buy_quantity: i64,
    pub buy_price: f64,
    pub sell_quantity: i64,
    pub sell_price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positions() {
        let json = r#"{"net":[{"tradingsymbol":"RELIANCE","exchange":"NSE","product":"MIS","quantity":-100,"pnl":250.5},{"tradingsymbol":"INFY","exchange":"NSE","product":"CNC","quantity":0,"pnl":-50.5}],"day":[]}"#;

        let positions: Positions = serde_json::from_str(json).unwrap();
        assert_eq!(positions.net.len(), 2);
        assert_eq!(positions.net[0].quantity, -100);
        assert_eq!(positions.net[1].pnl, -50.5);
        assert!(positions.day.is_empty());
    }
}
