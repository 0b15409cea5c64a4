//! `skip`/`limit` pagination for `GET /items`.

use std::ops::Range;

use crate::parser::HttpRequest;
use crate::server::{Error, FieldError};

pub const DEFAULT_LIMIT: i64 = 10;

/// A window over the store, as requested by the client.
///
/// Values are kept as given; [`Page::bounds`] clamps them. A negative `skip`
/// counts as 0 and a negative `limit` selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn int_param(request: &HttpRequest, name: &str, default: i64, errors: &mut Vec<FieldError>) -> i64 {
    match request.get_query_param(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            errors.push(FieldError::new(
                &["query", name],
                "Input should be a valid integer, unable to parse string as an integer",
                "int_parsing",
            ));
            default
        }),
    }
}

impl Page {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }

    /// Read `skip` and `limit` from the query string, defaulting to 0 and 10.
    pub fn from_query(request: &HttpRequest) -> Result<Page, Error> {
        let mut errors = Vec::new();
        let skip = int_param(request, "skip", 0, &mut errors);
        let limit = int_param(request, "limit", DEFAULT_LIMIT, &mut errors);

        if errors.is_empty() {
            Ok(Page { skip, limit })
        } else {
            Err(Error::Validation(errors))
        }
    }

    /// The index range this page selects in a sequence of `len` items.
    ///
    /// Always within `0..len`, holding `min(limit, max(0, len - skip))`
    /// indices once negatives are clamped to 0.
    pub fn bounds(&self, len: usize) -> Range<usize> {
        let skip = usize::try_from(self.skip.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit.max(0)).unwrap_or(usize::MAX);

        let start = skip.min(len);
        let end = start.saturating_add(limit).min(len);
        start..end
    }
}
