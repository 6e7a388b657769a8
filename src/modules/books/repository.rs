//! Book persistence.
//!
//! The repository is a one-to-one adapter over the `books` table. It does not
//! apply business rules and does not interpret store errors beyond telling a
//! missing row apart from everything else.

use async_trait::async_trait;
use shelf_db::Migration;
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;

use super::models::{Book, BookFields, BookId, Color};

/// Schema owned by the books module.
pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_create_books",
        up: r#"
            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author TEXT NOT NULL DEFAULT '',
                title TEXT NOT NULL DEFAULT '',
                pages INTEGER NOT NULL DEFAULT 0,
                color TEXT
            );
            "#,
    }]
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("book {0} not found")]
    NotFound(BookId),

    #[error("database operation failed")]
    Database(#[from] sqlx::Error),

    /// A stored row cannot be represented as a [`Book`].
    #[error("book {id} is corrupt: {message}")]
    Corrupt { id: i64, message: String },
}

/// CRUD primitives over the record store.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Insert a new book; the returned record carries the store-assigned id.
    async fn create(&self, fields: &BookFields) -> Result<Book, RepositoryError>;

    async fn get_by_id(&self, id: BookId) -> Result<Book, RepositoryError>;

    /// All books ordered by id; empty when the table is empty.
    async fn get_all(&self) -> Result<Vec<Book>, RepositoryError>;

    /// Overwrite the full row keyed by `book.id`. Callers confirm existence first.
    async fn update(&self, book: &Book) -> Result<(), RepositoryError>;

    /// Remove the row if present. Deleting an absent id is not an error here.
    async fn delete(&self, id: BookId) -> Result<(), RepositoryError>;
}

#[derive(Debug, FromRow)]
struct BookRow {
    id: i64,
    author: String,
    title: String,
    pages: i64,
    color: Option<String>,
}

impl TryFrom<BookRow> for Book {
    type Error = RepositoryError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let id = BookId::try_from(row.id).map_err(|_| RepositoryError::Corrupt {
            id: row.id,
            message: "id out of range".to_string(),
        })?;

        let color = row
            .color
            .as_deref()
            .map(str::parse::<Color>)
            .transpose()
            .map_err(|err| RepositoryError::Corrupt {
                id: row.id,
                message: err.to_string(),
            })?;

        Ok(Book {
            id,
            author: row.author,
            title: row.title,
            pages: row.pages,
            color,
        })
    }
}

/// [`BookRepository`] backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteBookRepository {
    pool: SqlitePool,
}

impl SqliteBookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn create(&self, fields: &BookFields) -> Result<Book, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO books (author, title, pages, color)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&fields.author)
        .bind(&fields.title)
        .bind(fields.pages)
        .bind(fields.color.map(|color| color.as_str()))
        .execute(&mut *tx)
        .await?;

        // The row is only kept when its id is representable as a BookId.
        let row_id = result.last_insert_rowid();
        let Ok(id) = BookId::try_from(row_id) else {
            tx.rollback().await?;
            return Err(RepositoryError::Corrupt {
                id: row_id,
                message: "assigned id out of range".to_string(),
            });
        };

        tx.commit().await?;
        Ok(fields.clone().into_book(id))
    }

    async fn get_by_id(&self, id: BookId) -> Result<Book, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(
            "SELECT id, author, title, pages, color FROM books WHERE id = ?",
        )
        .bind(i64::from(id))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Book::try_from(row),
            None => Err(RepositoryError::NotFound(id)),
        }
    }

    async fn get_all(&self) -> Result<Vec<Book>, RepositoryError> {
        let rows = sqlx::query_as::<_, BookRow>(
            "SELECT id, author, title, pages, color FROM books ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Book::try_from).collect()
    }

    async fn update(&self, book: &Book) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO books (id, author, title, pages, color)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                author = excluded.author,
                title = excluded.title,
                pages = excluded.pages,
                color = excluded.color
            "#,
        )
        .bind(i64::from(book.id))
        .bind(&book.author)
        .bind(&book.title)
        .bind(book.pages)
        .bind(book.color.map(|color| color.as_str()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: BookId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(i64::from(id))
            .execute(&self.pool)
            .await?;

        tracing::debug!(book_id = id, rows = result.rows_affected(), "book rows deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_db::Database;

    async fn repository() -> SqliteBookRepository {
        let db = Database::in_memory().await.unwrap();
        db.apply_migrations(&[("books".to_string(), migrations().remove(0))])
            .await
            .unwrap();
        SqliteBookRepository::new(db.pool().clone())
    }

    fn fields(title: &str, pages: i64, color: Option<Color>) -> BookFields {
        BookFields {
            author: "Test Author".to_string(),
            title: title.to_string(),
            pages,
            color,
        }
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids() {
        let repo = repository().await;

        let first = repo.create(&fields("One", 100, None)).await.unwrap();
        let second = repo.create(&fields("Two", 200, Some(Color::Green))).await.unwrap();

        assert!(first.id > 0);
        assert!(second.id > first.id);
        assert_eq!(second.color, Some(Color::Green));
    }

    #[tokio::test]
    async fn get_by_id_returns_stored_book() {
        let repo = repository().await;
        let created = repo
            .create(&fields("Dune", 412, Some(Color::Red)))
            .await
            .unwrap();

        let fetched = repo.get_by_id(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn get_by_id_reports_missing_row() {
        let repo = repository().await;

        let err = repo.get_by_id(999).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(999)));
    }

    #[tokio::test]
    async fn get_all_on_empty_table_is_empty() {
        let repo = repository().await;
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_all_returns_books_in_id_order() {
        let repo = repository().await;
        for (title, pages) in [("Book 1", 100), ("Book 2", 200), ("Book 3", 300)] {
            repo.create(&fields(title, pages, None)).await.unwrap();
        }

        let titles: Vec<String> = repo
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|book| book.title)
            .collect();
        assert_eq!(titles, vec!["Book 1", "Book 2", "Book 3"]);
    }

    #[tokio::test]
    async fn update_overwrites_whole_row() {
        let repo = repository().await;
        let mut book = repo
            .create(&fields("Original", 100, Some(Color::Red)))
            .await
            .unwrap();

        book.title = "Updated".to_string();
        book.pages = 0;
        book.color = None;
        repo.update(&book).await.unwrap();

        assert_eq!(repo.get_by_id(book.id).await.unwrap(), book);
    }

    #[tokio::test]
    async fn delete_removes_row_and_ignores_missing_ids() {
        let repo = repository().await;
        let book = repo.create(&fields("Doomed", 10, None)).await.unwrap();

        repo.delete(book.id).await.unwrap();
        assert!(matches!(
            repo.get_by_id(book.id).await,
            Err(RepositoryError::NotFound(_))
        ));

        repo.delete(book.id).await.unwrap();
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let repo = repository().await;
        let first = repo.create(&fields("First", 1, None)).await.unwrap();
        repo.delete(first.id).await.unwrap();

        let second = repo.create(&fields("Second", 2, None)).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn unknown_stored_color_is_reported_as_corrupt() {
        let repo = repository().await;
        sqlx::query("INSERT INTO books (author, title, pages, color) VALUES ('a', 't', 1, 'Purple')")
            .execute(&repo.pool)
            .await
            .unwrap();

        let err = repo.get_all().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn create_past_id_range_keeps_no_row() {
        let repo = repository().await;
        sqlx::query("INSERT INTO books (id, author, title, pages) VALUES (?, 'a', 'last', 1)")
            .bind(i64::from(BookId::MAX))
            .execute(&repo.pool)
            .await
            .unwrap();

        let err = repo.create(&fields("Overflow", 1, None)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Corrupt { .. }));

        let books = repo.get_all().await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, BookId::MAX);
    }
}
