//! Item records and the payload they are created from.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::server::FieldError;

pub const WELCOME_MESSAGE: &str = "Welcome to HttpServerRust API";

/// Longest accepted item name, counted in characters.
pub const NAME_MAX_CHARS: usize = 100;

/// Body of `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootStatus {
    pub message: &'static str,
    pub status: &'static str,
}

impl Default for RootStatus {
    fn default() -> Self {
        Self {
            message: WELCOME_MESSAGE,
            status: "active",
        }
    }
}

/// A stored item.
///
/// Only [`Item::from_new`] builds items for the store, so every stored item
/// has a non-empty name of at most [`NAME_MAX_CHARS`] characters and a
/// positive price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /items`.
///
/// `name` and `price` are optional here only so that a missing field is
/// reported as a validation error alongside the others.
///
/// `price` may also arrive as a numeric string (`"9.99"`), and `created_at`
/// may omit its offset, in which case it is read as UTC.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewItem {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lax_price")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lax_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LaxNumber {
    Number(f64),
    Text(String),
}

fn lax_price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<LaxNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(LaxNumber::Number(price)) => Ok(Some(price)),
        Some(LaxNumber::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("price is not a number: {text:?}"))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LaxTimestamp {
    Zoned(DateTime<Utc>),
    Naive(NaiveDateTime),
}

fn lax_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(Option::<LaxTimestamp>::deserialize(deserializer)?.map(|timestamp| match timestamp {
        LaxTimestamp::Zoned(at) => at,
        LaxTimestamp::Naive(at) => at.and_utc(),
    }))
}

impl NewItem {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: Some(name.into()),
            price: Some(price),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

fn check_name(name: Option<String>, errors: &mut Vec<FieldError>) -> Option<String> {
    let Some(name) = name else {
        errors.push(FieldError::new(&["body", "name"], "Field required", "missing"));
        return None;
    };

    let chars = name.chars().count();
    if chars == 0 {
        errors.push(FieldError::new(
            &["body", "name"],
            "String should have at least 1 character",
            "string_too_short",
        ));
        return None;
    }
    if chars > NAME_MAX_CHARS {
        errors.push(FieldError::new(
            &["body", "name"],
            format!("String should have at most {NAME_MAX_CHARS} characters"),
            "string_too_long",
        ));
        return None;
    }

    Some(name)
}

fn check_price(price: Option<f64>, errors: &mut Vec<FieldError>) -> Option<f64> {
    match price {
        None => {
            errors.push(FieldError::new(&["body", "price"], "Field required", "missing"));
            None
        }
        Some(price) if price > 0.0 && price.is_finite() => Some(price),
        Some(_) => {
            errors.push(FieldError::new(
                &["body", "price"],
                "Input should be greater than 0",
                "greater_than",
            ));
            None
        }
    }
}

impl Item {
    /// Validate `new` and build the item it describes.
    ///
    /// A fresh UUID v4 is generated when no id was supplied, and `created_at`
    /// is stamped with the current time when absent. Every failed check is
    /// reported, not just the first.
    pub fn from_new(new: NewItem) -> Result<Item, Vec<FieldError>> {
        let mut errors = Vec::new();

        if new.id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            errors.push(FieldError::new(&["body", "id"], "Id must not be empty", "string_too_short"));
        }
        let name = check_name(new.name, &mut errors);
        let price = check_price(new.price, &mut errors);

        match (name, price) {
            (Some(name), Some(price)) if errors.is_empty() => Ok(Item {
                id: new.id.unwrap_or_else(generate_id),
                name,
                description: new.description,
                price,
                created_at: new.created_at.unwrap_or_else(Utc::now),
            }),
            _ => Err(errors),
        }
    }
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
