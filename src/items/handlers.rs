//! Request handlers for the item routes.

use std::sync::Arc;

use log::debug;

use crate::items::model::{NewItem, RootStatus};
use crate::items::page::Page;
use crate::items::store::ItemStore;
use crate::parser::{Error as ParserError, HttpRequest};
use crate::server::{Error, HttpResponse, StatusCode};

/// `GET /`: fixed welcome message, whatever the store holds.
pub async fn root_status(_request: HttpRequest) -> Result<HttpResponse, Error> {
    HttpResponse::new(StatusCode::Ok).with_json(&RootStatus::default())
}

/// `GET /items?skip=&limit=`
pub async fn list_items(store: Arc<ItemStore>, request: HttpRequest) -> Result<HttpResponse, Error> {
    let page = Page::from_query(&request)?;
    let items = store.list(page).await;
    debug!("Listing {count} items (skip={skip}, limit={limit})", count = items.len(), skip = page.skip, limit = page.limit);

    HttpResponse::new(StatusCode::Ok).with_json(&items)
}

/// `POST /items`: store the item in the JSON body and echo it back.
pub async fn create_item(store: Arc<ItemStore>, request: HttpRequest) -> Result<HttpResponse, Error> {
    let new: NewItem = request.json().map_err(body_error)?;
    let item = store.create(new).await?;

    HttpResponse::new(StatusCode::Ok).with_json(&item)
}

/// Report an unreadable body as a validation failure on `body`.
fn body_error(e: ParserError) -> Error {
    let kind = match e {
        ParserError::UnsupportedMediaType(_) => "content_type",
        ParserError::JsonError(ref json) if json.is_data() => "model_type",
        _ => "json_invalid",
    };
    Error::invalid(&["body"], e.to_string(), kind)
}
