//! Data models for Kite entities.
//!
//! This module contains:
//!
//! - Constant tables: `Product`, `OrderType`, `Variety`, `TransactionType`,
//!   `Validity`, `Exchange`, `MarginSegment`
//! - Order types: `PlaceOrderParams`, `ModifyOrderParams`, `Order`
//! - Market data: `Quote`, `LastPrice`, `Ohlc`, `Depth`
//! - Portfolio and account: `Positions`, `Profile`, `Margins`

pub mod constants;
pub mod market;
pub mod order;
pub mod portfolio;
pub mod user;

pub use constants::{
    Exchange, MarginSegment, OrderType, ParseConstantError, Product, TransactionType, Validity,
    Variety,
};
pub use market::{Depth, DepthLevel, LastPrice, Ohlc, Quote};
pub use order::{ModifyOrderParams, Order, OrderId, PlaceOrderParams};
pub use portfolio::{Position, Positions};
pub use user::{AvailableMargin, Margins, Profile, SegmentMargins};
