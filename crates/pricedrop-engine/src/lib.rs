//! The discount state machine: periodic ticks and the emergency stop.
//!
//! Both entry points take their collaborators explicitly (a `PgPool` and any
//! [`PriceStore`](pricedrop_shopify::PriceStore)) so tests can drive them
//! against an in-memory catalog.

pub mod emergency;
pub mod error;
pub mod tick;
mod transition;

pub use emergency::{end_all, EmergencyStopReport};
pub use error::{EngineError, JobError};
pub use tick::{run_tick, TickOptions, TickSummary};
