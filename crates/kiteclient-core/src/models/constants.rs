//! Constant tables used by the order and margin endpoints.
//!
//! Each enum serializes to the exact string the API expects and parses
//! case-insensitively from user input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct ParseConstantError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The string sent on the wire.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseConstantError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| ParseConstantError {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

wire_enum! {
    /// Margin product an order is placed under.
    Product, "product" {
        Mis => "MIS",
        Cnc => "CNC",
        Nrml => "NRML",
        Co => "CO",
    }
}

wire_enum! {
    OrderType, "order type" {
        Market => "MARKET",
        Limit => "LIMIT",
        SlM => "SL-M",
        Sl => "SL",
    }
}

wire_enum! {
    /// Order variety, part of the order endpoint path.
    Variety, "variety" {
        Regular => "regular",
        Co => "co",
        Amo => "amo",
    }
}

wire_enum! {
    TransactionType, "transaction type" {
        Buy => "BUY",
        Sell => "SELL",
    }
}

wire_enum! {
    Validity, "validity" {
        Day => "DAY",
        Ioc => "IOC",
    }
}

wire_enum! {
    Exchange, "exchange" {
        Nse => "NSE",
        Bse => "BSE",
        Nfo => "NFO",
        Cds => "CDS",
        Bfo => "BFO",
        Mcx => "MCX",
    }
}

wire_enum! {
    /// Segment accepted by the margins endpoint.
    MarginSegment, "margin segment" {
        Equity => "equity",
        Commodity => "commodity",
    }
}
