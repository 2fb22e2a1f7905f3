//! HTTP front end
//!
//! Accept loop, request parsing, the route table and JSON responses.

pub mod core;
pub mod request;
pub mod response;
pub mod routes;

pub use core::Server;
pub use request::{HttpRequest, Method, RequestError};
pub use response::HttpResponse;
pub use routes::{Route, handle_request};
