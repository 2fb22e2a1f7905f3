//! Bridge middleware
//!
//! Provides the event sink used for logging.

pub mod logging;

pub use logging::{BridgeEvent, EventSink, LogSink};
