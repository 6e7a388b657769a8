use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Store-assigned book identifier.
pub type BookId = u32;

/// Cover color. Names are case-sensitive on the wire and in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    Red,
    Green,
    Blue,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "Red",
            Color::Green => "Green",
            Color::Blue => "Blue",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A color name outside {Red, Green, Blue}; carries the rejected value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color: {0}")]
pub struct UnknownColor(pub String);

impl FromStr for Color {
    type Err = UnknownColor;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Red" => Ok(Color::Red),
            "Green" => Ok(Color::Green),
            "Blue" => Ok(Color::Blue),
            other => Err(UnknownColor(other.to_string())),
        }
    }
}

/// A persisted book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub author: String,
    pub title: String,
    pub pages: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl Book {
    /// Apply the present fields of `changes` onto this book.
    ///
    /// Empty strings, zero pages and an absent color count as "not present",
    /// so a merge can never clear a field back to its zero value.
    pub fn merge(&mut self, changes: BookFields) {
        if !changes.author.is_empty() {
            self.author = changes.author;
        }
        if !changes.title.is_empty() {
            self.title = changes.title;
        }
        if changes.pages != 0 {
            self.pages = changes.pages;
        }
        if changes.color.is_some() {
            self.color = changes.color;
        }
    }
}

/// Validated book fields, without an id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFields {
    pub author: String,
    pub title: String,
    pub pages: i64,
    pub color: Option<Color>,
}

impl BookFields {
    pub fn into_book(self, id: BookId) -> Book {
        Book {
            id,
            author: self.author,
            title: self.title,
            pages: self.pages,
            color: self.color,
        }
    }
}

/// Request body for create and update.
///
/// Every field may be omitted. `color` stays a raw string here so an
/// unrecognised value is reported by validation, naming the value, instead
/// of failing JSON decoding. Unknown fields, `id` included, are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookPayload {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pages: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl BookPayload {
    pub fn validate(self) -> Result<BookFields, UnknownColor> {
        let color = self.color.as_deref().map(str::parse::<Color>).transpose()?;

        Ok(BookFields {
            author: self.author,
            title: self.title,
            pages: self.pages,
            color,
        })
    }
}
