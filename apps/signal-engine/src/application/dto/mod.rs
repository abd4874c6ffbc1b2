//! Data Transfer Objects (DTOs)
//!
//! Inbound signals and the `{message, outcome}` responses of the entry points.

mod outcome;
mod signal;

pub use outcome::{Outcome, SignalOutcome};
pub use signal::{
    EquitySignal, OptionLegs, OptionsSignal, PairAction, PairedSignal, Signal, SignalAction,
    SignalParseError,
};
