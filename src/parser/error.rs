//! Error types for the HTTP parser.

use thiserror::Error;

/// Errors that can occur during HTTP request parsing.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP method in the request is not supported.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The request target is missing or does not start with `/`.
    #[error("Invalid HTTP path: {0}")]
    InvalidPath(String),

    /// The request line does not have exactly three components.
    #[error("Malformed request line: {0}")]
    MalformedRequestLine(String),

    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    #[error("Required header is missing: {0}")]
    MissingHeader(String),

    /// The body is declared with a media type this parser cannot read.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// A header line has no `:` separator or an empty name.
    #[error("Invalid header format: {0}")]
    InvalidHeaderFormat(String),

    /// `Content-Length` is present but is not a non-negative integer.
    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// Fewer body bytes arrived than `Content-Length` declared.
    #[error("Incomplete body: expected {expected} bytes, received {received}")]
    IncompleteBody { expected: usize, received: usize },

    /// The request head is not valid UTF-8.
    #[error("Request head is not valid UTF-8")]
    InvalidUtf8,

    #[error("Empty request")]
    EmptyRequest,

    /// Error parsing a JSON body.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}
