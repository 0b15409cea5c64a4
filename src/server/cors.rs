//! Cross-origin resource sharing.
//!
//! The API allows every origin, method and header. When credentials are
//! allowed the wildcard origin is not usable, so the request's `Origin` is
//! echoed back instead.

use crate::parser::{HttpRequest, Method};
use crate::server::response::{HttpResponse, StatusCode};

/// Permissive CORS policy applied to every response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    /// Send `Access-Control-Allow-Credentials: true`.
    pub allow_credentials: bool,
    /// Seconds a browser may cache a preflight answer.
    pub max_age: u32,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_credentials: true,
            max_age: 600,
        }
    }
}

impl CorsPolicy {
    /// An `OPTIONS` request carrying `Origin` and `Access-Control-Request-Method`.
    pub fn is_preflight(&self, request: &HttpRequest) -> bool {
        request.method == Method::OPTIONS
            && request.has_header("Origin")
            && request.has_header("Access-Control-Request-Method")
    }

    /// Answer a preflight request directly, without routing it.
    pub fn preflight_response(&self, request: &HttpRequest) -> HttpResponse {
        let methods = Method::ALL
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        let mut response = HttpResponse::new(StatusCode::Ok)
            .with_content_type("text/plain; charset=utf-8")
            .with_body_string("OK")
            .with_header("Access-Control-Allow-Methods", methods)
            .with_header("Access-Control-Max-Age", self.max_age.to_string());

        if let Some(requested) = request.get_header("Access-Control-Request-Headers") {
            response = response.with_header("Access-Control-Allow-Headers", requested.clone());
        }

        self.apply(request.get_header("Origin").map(String::as_str), response)
    }

    /// Add the allow-origin headers for a request that sent `origin`.
    ///
    /// Same-origin requests (no `Origin` header) are returned untouched.
    pub fn apply(&self, origin: Option<&str>, response: HttpResponse) -> HttpResponse {
        let Some(origin) = origin else {
            return response;
        };

        if self.allow_credentials {
            response
                .with_header("Access-Control-Allow-Origin", origin)
                .with_header("Access-Control-Allow-Credentials", "true")
                .with_header("Vary", "Origin")
        } else {
            response.with_header("Access-Control-Allow-Origin", "*")
        }
    }
}
