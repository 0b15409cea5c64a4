//! The shared, append-only item store.

use log::debug;
use tokio::sync::RwLock;

use crate::items::model::{Item, NewItem};
use crate::items::page::Page;
use crate::server::{Error, FieldError};

/// Items in insertion order.
///
/// Created empty at startup and shared between handlers through an `Arc`.
/// Lookups for id collisions and the append happen under one write guard,
/// so concurrent creations never lose an item or duplicate an id.
#[derive(Debug, Default)]
pub struct ItemStore {
    items: RwLock<Vec<Item>>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `new`, build the item and append it.
    ///
    /// Fails with [`Error::Validation`] and leaves the store untouched when
    /// the payload is invalid or its `id` is already taken.
    pub async fn create(&self, new: NewItem) -> Result<Item, Error> {
        let item = Item::from_new(new).map_err(Error::Validation)?;

        let mut items = self.items.write().await;
        if items.iter().any(|existing| existing.id == item.id) {
            return Err(Error::Validation(vec![FieldError::new(
                &["body", "id"],
                format!("An item with id {} already exists", item.id),
                "duplicate_id",
            )]));
        }

        items.push(item.clone());
        debug!("Stored item {id} ({count} total)", id = item.id, count = items.len());

        Ok(item)
    }

    /// Copy out the items selected by `page`, in insertion order.
    pub async fn list(&self, page: Page) -> Vec<Item> {
        let items = self.items.read().await;
        items[page.bounds(items.len())].to_vec()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}
