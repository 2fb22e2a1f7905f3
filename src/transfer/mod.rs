//! Transfer module
//!
//! Handles passive data connections and the byte streams carried over them.

pub mod data_channel;
pub mod file_ops;

pub use data_channel::{PassiveMode, connect_data, data_address};
pub use file_ops::{LocalFile, receive_bytes, receive_file, send_file};
