//! HTTP boundary for books: decode, call the service, map the outcome.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use shelf_http::error::AppError;

use super::models::{Book, BookId, BookPayload};
use super::service::{BookError, BookService};

pub type SharedBookService = Arc<dyn BookService>;

const INVALID_ID: &str = "invalid book ID";

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::NotFound => AppError::not_found(err.to_string()),
            BookError::InvalidColor(_) => AppError::validation(err.to_string()),
            BookError::Store { .. } => AppError::Internal(anyhow::Error::new(err)),
        }
    }
}

/// Routes relative to the module mount point.
pub fn router(service: SharedBookService) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(service)
}

/// Plain decimal digits only; `u32::from_str` alone would accept a leading `+`.
fn book_id(path: Result<Path<String>, PathRejection>) -> Result<BookId, AppError> {
    let Ok(Path(raw)) = path else {
        return Err(AppError::bad_request(INVALID_ID));
    };
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::bad_request(INVALID_ID));
    }
    raw.parse::<BookId>()
        .map_err(|_| AppError::bad_request(INVALID_ID))
}

/// Decode the body as JSON regardless of the `Content-Type` header.
fn payload(body: &Bytes) -> Result<BookPayload, AppError> {
    serde_json::from_slice(body).map_err(|err| AppError::bad_request(err.to_string()))
}

async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn create_book(
    State(service): State<SharedBookService>,
    body: Bytes,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let payload = payload(&body)?;
    let book = service.create_book(payload).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn list_books(
    State(service): State<SharedBookService>,
) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(service.get_all_books().await?))
}

async fn get_book(
    State(service): State<SharedBookService>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let id = book_id(id)?;
    Ok(Json(service.get_book_by_id(id).await?))
}

async fn update_book(
    State(service): State<SharedBookService>,
    id: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> Result<Json<Book>, AppError> {
    let id = book_id(id)?;
    let patch = payload(&body)?;
    Ok(Json(service.update_book(id, patch).await?))
}

async fn delete_book(
    State(service): State<SharedBookService>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<MessageBody>, AppError> {
    let id = book_id(id)?;
    service.delete_book(id).await?;
    Ok(Json(MessageBody {
        message: "book deleted successfully".to_string(),
    }))
}
