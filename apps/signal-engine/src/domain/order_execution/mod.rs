//! Order Execution Bounded Context
//!
//! Order intents sent to the broker and the fills reconciled from its reports.

pub mod value_objects;

pub use value_objects::{
    FillStatus, OrderFill, OrderIntent, OrderReport, OrderSide, OrderStatus, OrderType,
    TimeInForce,
};
