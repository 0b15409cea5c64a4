//! A minimal HTTP API over an in-memory item collection.
//!
//! The crate carries its own small HTTP/1.x stack:
//!
//! - [`parser`] turns raw request bytes into an [`HttpRequest`]
//! - [`server`] accepts connections, routes requests and writes responses
//! - [`items`] holds the item model, the shared store and the route handlers
//!
//! # Examples
//!
//! ## Serving the item API
//!
//! ```no_run
//! use std::sync::Arc;
//! use httpserver_rust::{items, HttpServer, ItemStore, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), httpserver_rust::ServerError> {
//!     let server = HttpServer::new(ServerConfig::default());
//!     items::register_routes(&server, Arc::new(ItemStore::new())).await;
//!     server.start().await
//! }
//! ```
//!
//! ## Using the store directly
//!
//! ```
//! use httpserver_rust::{ItemStore, NewItem, Page};
//!
//! # tokio_test_block(async {
//! let store = ItemStore::new();
//! let widget = store.create(NewItem::new("widget", 9.99)).await.unwrap();
//! assert!(!widget.id.is_empty());
//!
//! let listed = store.list(Page::default()).await;
//! assert_eq!(listed, vec![widget]);
//! # });
//! # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```
//!
//! ## Parsing a request
//!
//! ```
//! use httpserver_rust::{parse_request, Method};
//!
//! let request = parse_request(b"GET /items?skip=1 HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
//! assert_eq!(request.method, Method::GET);
//! assert_eq!(request.path, "/items");
//! assert_eq!(request.get_query_param("skip").map(String::as_str), Some("1"));
//! ```

pub mod parser;

pub mod server;

pub mod items;

// Re-export commonly used items for convenience
pub use parser::{Error as ParserError, HttpRequest, HttpVersion, Method, parse_request};
pub use server::{Error as ServerError, FieldError, HttpResponse, HttpServer, ServerConfig, StatusCode};
pub use items::{Item, ItemStore, NewItem, Page};
