//! Order Execution Value Objects
//!
//! Immutable types describing what is sent to the broker and what comes back.

mod order_fill;
mod order_intent;
mod order_side;
mod order_status;
mod order_type;
mod time_in_force;

pub use order_fill::{FillStatus, OrderFill, OrderReport};
pub use order_intent::OrderIntent;
pub use order_side::OrderSide;
pub use order_status::OrderStatus;
pub use order_type::OrderType;
pub use time_in_force::TimeInForce;
