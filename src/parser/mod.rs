//! HTTP/1.x request parsing.
//!
//! Turns the raw bytes read from a connection into an [`HttpRequest`]:
//! request line, headers, query parameters and body.

mod request;
mod method;
mod version;
mod error;

// Re-export public items
pub use request::HttpRequest;
pub use method::Method;
pub use version::HttpVersion;
pub use error::Error;

pub use request::{find_header_end, parse_request, peek_content_length, peek_header};
