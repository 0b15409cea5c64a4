//! HTTP request parsing and representation.

use std::collections::HashMap;
use std::str::FromStr;
use serde::de::DeserializeOwned;

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;

/// Represents an HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request path, without the query string
    pub path: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers
    pub headers: HashMap<String, String>,
    /// The request body
    pub body: Vec<u8>,
    /// Decoded query parameters. A repeated key keeps its last value.
    pub query_params: HashMap<String, String>,
}

impl HttpRequest {
    /// Create a new HTTP request with an empty body.
    ///
    /// `target` is the request target from the request line; anything after
    /// the first `?` is decoded into [`HttpRequest::query_params`].
    pub fn new(method: Method, target: &str, version: HttpVersion, headers: HashMap<String, String>) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };

        let query_params = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Self {
            method,
            path: path.to_string(),
            version,
            headers,
            body: Vec::new(),
            query_params,
        }
    }

    /// Create a new HTTP request with a body.
    pub fn with_body(method: Method, target: &str, version: HttpVersion, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        let mut request = Self::new(method, target, version, headers);
        request.body = body;
        request
    }

    /// Get a header value. Header names are matched case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&String> {
        find_header(&self.headers, name)
    }

    /// Check if a header exists.
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// The declared body length, if the request carries `Content-Length`.
    pub fn content_length(&self) -> Result<Option<usize>, Error> {
        content_length(&self.headers)
    }

    /// Parse the request body as JSON.
    ///
    /// A body without `Content-Type` is tried as JSON. A declared media type
    /// other than `application/json` or a `+json` subtype fails with
    /// [`Error::UnsupportedMediaType`].
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if let Some(content_type) = self.get_header("Content-Type") {
            if !is_json_media_type(content_type) {
                return Err(Error::UnsupportedMediaType(content_type.clone()));
            }
        }

        let json = serde_json::from_slice(&self.body)?;
        Ok(json)
    }

    /// Check if the request declares a JSON body.
    pub fn is_json(&self) -> bool {
        self.get_header("Content-Type")
            .is_some_and(|content_type| is_json_media_type(content_type))
    }

    /// Get a query parameter value.
    pub fn get_query_param(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }

    /// Check if a query parameter exists.
    pub fn has_query_param(&self, name: &str) -> bool {
        self.query_params.contains_key(name)
    }
}

fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a String> {
    headers.iter().find_map(|(k, v)| k.eq_ignore_ascii_case(name).then_some(v))
}

/// `application/json` or `<type>/<subtype>+json`, ignoring case and parameters.
fn is_json_media_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match essence.split_once('/') {
        Some((_, "json")) => essence == "application/json",
        Some((kind, subtype)) => !kind.is_empty() && subtype.len() > "+json".len() && subtype.ends_with("+json"),
        None => false,
    }
}

fn content_length(headers: &HashMap<String, String>) -> Result<Option<usize>, Error> {
    find_header(headers, "Content-Length")
        .map(|value| {
            value
                .parse::<usize>()
                .map_err(|_| Error::InvalidContentLength(value.clone()))
        })
        .transpose()
}

/// Locate the end of the header block.
///
/// Returns the offset of the first body byte, i.e. just past the blank line
/// (`\r\n\r\n` or a bare `\n\n`), or `None` if the head is not complete yet.
pub fn find_header_end(input: &[u8]) -> Option<usize> {
    let crlf = input.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4);
    let lf = input.windows(2).position(|w| w == b"\n\n").map(|i| i + 2);

    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Read a header value from a request head without parsing the rest of it.
///
/// Works on a partial head too: only complete lines are looked at, and bytes
/// after the first invalid UTF-8 sequence are ignored.
pub fn peek_header<'a>(head: &'a [u8], name: &str) -> Option<&'a str> {
    let head = &head[..find_header_end(head).unwrap_or(head.len())];
    let head = match std::str::from_utf8(head) {
        Ok(head) => head,
        Err(e) => std::str::from_utf8(&head[..e.valid_up_to()]).ok()?,
    };
    // The last line may still be arriving
    let complete = head.rfind('\n').map_or("", |end| &head[..end]);

    complete.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

/// Read `Content-Length` from a request head without parsing the rest of it.
///
/// Returns `None` when the header is absent or unparsable; [`parse_request`]
/// reports the latter.
pub fn peek_content_length(head: &[u8]) -> Option<usize> {
    peek_header(head, "Content-Length")?.parse().ok()
}

/// Parse an HTTP request from a byte slice.
///
/// The slice must hold the full head and, when `Content-Length` is declared,
/// at least that many body bytes. Bytes beyond the declared length are
/// ignored.
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    if input.is_empty() {
        return Err(Error::EmptyRequest);
    }

    let head_end = find_header_end(input).unwrap_or(input.len());
    let head = std::str::from_utf8(&input[..head_end]).map_err(|_| Error::InvalidUtf8)?;
    let mut lines = head.lines();

    let request_line = match lines.next() {
        Some(line) if !line.trim().is_empty() => line,
        _ => return Err(Error::EmptyRequest),
    };

    // Method, target and version
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let method = Method::from_str(parts[0])?;

    let target = parts[1];
    if !target.starts_with('/') && target != "*" {
        return Err(Error::InvalidPath(target.to_string()));
    }

    let version = HttpVersion::from_str(parts[2])?;

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::InvalidHeaderFormat(line.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidHeaderFormat(line.to_string()));
        }

        headers.insert(name.to_string(), value.trim().to_string());
    }

    if version.requires_host() && find_header(&headers, "Host").is_none() {
        return Err(Error::MissingHeader("Host".to_string()));
    }

    let remaining = &input[head_end..];
    let body = match content_length(&headers)? {
        Some(expected) if remaining.len() < expected => {
            return Err(Error::IncompleteBody { expected, received: remaining.len() });
        }
        Some(expected) => remaining[..expected].to_vec(),
        None => remaining.to_vec(),
    };

    Ok(HttpRequest::with_body(method, target, version, headers, body))
}
