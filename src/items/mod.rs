//! The item API: an in-memory, append-only collection of [`Item`]s served
//! over three routes.
//!
//! | Method | Path     | Handler                    |
//! |--------|----------|----------------------------|
//! | GET    | `/`      | [`handlers::root_status`]  |
//! | GET    | `/items` | [`handlers::list_items`]   |
//! | POST   | `/items` | [`handlers::create_item`]  |

mod model;
mod page;
mod store;
pub mod handlers;

pub use model::{Item, NewItem, RootStatus, NAME_MAX_CHARS, WELCOME_MESSAGE};
pub use page::{Page, DEFAULT_LIMIT};
pub use store::ItemStore;

use std::sync::Arc;

use crate::parser::Method;
use crate::server::HttpServer;

/// Register the item routes on `server`, all sharing `store`.
pub async fn register_routes(server: &HttpServer, store: Arc<ItemStore>) {
    server.add_route("/", vec![Method::GET], handlers::root_status).await;

    let list_store = store.clone();
    server
        .add_route("/items", vec![Method::GET], move |req| {
            handlers::list_items(list_store.clone(), req)
        })
        .await;

    server
        .add_route("/items", vec![Method::POST], move |req| {
            handlers::create_item(store.clone(), req)
        })
        .await;
}
