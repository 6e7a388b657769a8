//! Book business rules: color validation, partial-update merge and error
//! classification.
//!
//! This is the only layer that decides whether a failure means "book not
//! found", "invalid input" or "store failure".

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::models::{Book, BookId, BookPayload, UnknownColor};
use super::repository::{BookRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum BookError {
    #[error("book not found")]
    NotFound,

    #[error(transparent)]
    InvalidColor(#[from] UnknownColor),

    #[error("{context}")]
    Store {
        context: &'static str,
        #[source]
        source: RepositoryError,
    },
}

impl BookError {
    fn store(context: &'static str) -> impl FnOnce(RepositoryError) -> Self {
        move |source| BookError::Store { context, source }
    }

    /// Classify a lookup failure: a missing row is `NotFound`, anything else a
    /// store failure.
    fn lookup(context: &'static str) -> impl FnOnce(RepositoryError) -> Self {
        move |source| match source {
            RepositoryError::NotFound(_) => BookError::NotFound,
            source => BookError::Store { context, source },
        }
    }
}

#[async_trait]
pub trait BookService: Send + Sync {
    async fn create_book(&self, payload: BookPayload) -> Result<Book, BookError>;

    async fn get_book_by_id(&self, id: BookId) -> Result<Book, BookError>;

    async fn get_all_books(&self) -> Result<Vec<Book>, BookError>;

    /// Merge the present fields of `patch` onto the stored book.
    async fn update_book(&self, id: BookId, patch: BookPayload) -> Result<Book, BookError>;

    async fn delete_book(&self, id: BookId) -> Result<(), BookError>;
}

/// Default [`BookService`] over any [`BookRepository`].
pub struct BookManager {
    repository: Arc<dyn BookRepository>,
}

impl BookManager {
    pub fn new(repository: Arc<dyn BookRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl BookService for BookManager {
    async fn create_book(&self, payload: BookPayload) -> Result<Book, BookError> {
        tracing::info!(title = %payload.title, author = %payload.author, "creating book");

        let fields = payload.validate().inspect_err(|err| {
            tracing::warn!(color = %err.0, "rejected book with invalid color");
        })?;

        let book = self
            .repository
            .create(&fields)
            .await
            .map_err(BookError::store("failed to create book"))
            .inspect_err(|err| tracing::error!(error = ?err, "failed to create book"))?;

        tracing::info!(book_id = book.id, "book created");
        Ok(book)
    }

    async fn get_book_by_id(&self, id: BookId) -> Result<Book, BookError> {
        tracing::info!(book_id = id, "retrieving book");

        let book = self
            .repository
            .get_by_id(id)
            .await
            .map_err(BookError::lookup("failed to retrieve book"))
            .inspect_err(|err| tracing::warn!(book_id = id, error = %err, "book lookup failed"))?;

        tracing::info!(book_id = id, title = %book.title, "book retrieved");
        Ok(book)
    }

    async fn get_all_books(&self) -> Result<Vec<Book>, BookError> {
        tracing::info!("retrieving all books");

        let books = self
            .repository
            .get_all()
            .await
            .map_err(BookError::store("failed to retrieve books"))
            .inspect_err(|err| tracing::error!(error = ?err, "failed to retrieve books"))?;

        tracing::info!(count = books.len(), "books retrieved");
        Ok(books)
    }

    async fn update_book(&self, id: BookId, patch: BookPayload) -> Result<Book, BookError> {
        tracing::info!(book_id = id, "updating book");

        let mut book = self
            .repository
            .get_by_id(id)
            .await
            .map_err(BookError::lookup("failed to retrieve book for update"))
            .inspect_err(|err| tracing::warn!(book_id = id, error = %err, "book update lookup failed"))?;

        let changes = patch.validate().inspect_err(|err| {
            tracing::warn!(book_id = id, color = %err.0, "rejected update with invalid color");
        })?;

        book.merge(changes);

        self.repository
            .update(&book)
            .await
            .map_err(BookError::store("failed to update book"))
            .inspect_err(|err| tracing::error!(book_id = id, error = ?err, "failed to update book"))?;

        tracing::info!(book_id = id, title = %book.title, "book updated");
        Ok(book)
    }

    async fn delete_book(&self, id: BookId) -> Result<(), BookError> {
        tracing::info!(book_id = id, "deleting book");

        self.repository
            .get_by_id(id)
            .await
            .map_err(BookError::lookup("failed to retrieve book for deletion"))
            .inspect_err(|err| tracing::warn!(book_id = id, error = %err, "book delete lookup failed"))?;

        self.repository
            .delete(id)
            .await
            .map_err(BookError::store("failed to delete book"))
            .inspect_err(|err| tracing::error!(book_id = id, error = ?err, "failed to delete book"))?;

        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }
}
