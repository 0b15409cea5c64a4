//! HTTP server for the item API.
//!
//! Accepts connections on a tokio listener, reads one request per
//! connection, dispatches it to the route registered for its method and
//! path, and writes back the handler's response with CORS headers applied.

mod response;
mod config;
mod cors;
mod error;
mod handler;
mod http_server;
mod tests;

// Re-export public items
pub use response::{HttpResponse, StatusCode};
pub use config::ServerConfig;
pub use cors::CorsPolicy;
pub use error::{Error, FieldError};
pub use handler::{HandlerFn, HandlerFuture, Route};
pub use http_server::HttpServer;
