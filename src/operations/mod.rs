//! Operation façade
//!
//! The named operations exposed over HTTP, each backed by one session.

pub mod facade;
pub mod results;
pub mod search;

pub use facade::FtpBridge;
pub use results::{Operation, RenameProgress};
pub use search::GlobFilter;
