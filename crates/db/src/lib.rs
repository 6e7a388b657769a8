//! SQLite connection pool and migration runner for SHELF.

mod database;
mod migrations;

pub use database::Database;
pub use migrations::Migration;

use serde::{Deserialize, Serialize};

/// Connection settings for the relational store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_url")]
    pub url: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseSettings {
    fn default_url() -> String {
        "sqlite://books.db".to_string()
    }

    fn default_max_connections() -> u32 {
        5
    }

    /// Settings pointing at a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }

    /// Whether the URL refers to an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            max_connections: Self::default_max_connections(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_is_local_books_file() {
        let settings = DatabaseSettings::default();
        assert_eq!(settings.url, "sqlite://books.db");
        assert!(!settings.is_in_memory());
    }

    #[test]
    fn in_memory_settings_are_detected() {
        assert!(DatabaseSettings::in_memory().is_in_memory());
        let shared = DatabaseSettings {
            url: "sqlite://file:books?mode=memory&cache=shared".to_string(),
            max_connections: 4,
        };
        assert!(shared.is_in_memory());
    }
}
