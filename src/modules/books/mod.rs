pub mod models;
pub mod repository;
pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use once_cell::sync::OnceCell;
use serde_json::{json, Value};
use shelf_kernel::{InitCtx, Migration, Module};

use repository::SqliteBookRepository;
use service::{BookManager, BookService};

/// Books feature: SQLite repository, service and HTTP handlers under `/books`.
pub struct BooksModule {
    service: OnceCell<Arc<dyn BookService>>,
}

impl BooksModule {
    pub fn new() -> Self {
        Self {
            service: OnceCell::new(),
        }
    }

    /// Module with a prebuilt service; `init` leaves it in place.
    pub fn with_service(service: Arc<dyn BookService>) -> Self {
        Self {
            service: OnceCell::with_value(service),
        }
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if self.service.get().is_some() {
            tracing::debug!(module = self.name(), "service already provided");
            return Ok(());
        }

        let repository = Arc::new(SqliteBookRepository::new(ctx.db.pool().clone()));
        let service: Arc<dyn BookService> = Arc::new(BookManager::new(repository));
        // A concurrent init losing the race keeps the first service.
        let _ = self.service.set(service);

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        match self.service.get() {
            Some(service) => routes::router(service.clone()),
            None => {
                tracing::warn!(module = self.name(), "routes requested before init");
                Router::new()
            }
        }
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        repository::migrations()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    })
}

fn book_request() -> Value {
    json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/BookInput" }
            }
        }
    })
}

fn id_parameter() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int32", "minimum": 0 }
    })
}

fn openapi_fragment() -> Value {
    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "All books ordered by id",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        },
                        "500": error_response("Store failure")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": book_request(),
                    "responses": {
                        "201": book_response("Created book with its assigned id"),
                        "400": error_response("Malformed body or invalid color"),
                        "500": error_response("Store failure")
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        }
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book by id",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": book_response("The book"),
                        "400": error_response("Invalid book ID"),
                        "404": error_response("Book not found"),
                        "500": error_response("Store failure")
                    }
                },
                "put": {
                    "summary": "Partially update a book",
                    "description": "Empty strings, zero pages and a missing color leave the stored value unchanged.",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "requestBody": book_request(),
                    "responses": {
                        "200": book_response("The merged book"),
                        "400": error_response("Invalid id, malformed body or invalid color"),
                        "404": error_response("Book not found"),
                        "500": error_response("Store failure")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": {
                            "description": "Book deleted",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": { "message": { "type": "string" } },
                                        "required": ["message"]
                                    }
                                }
                            }
                        },
                        "400": error_response("Invalid book ID"),
                        "404": error_response("Book not found"),
                        "500": error_response("Store failure")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Color": {
                    "type": "string",
                    "enum": ["Red", "Green", "Blue"]
                },
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int32", "minimum": 0 },
                        "author": { "type": "string" },
                        "title": { "type": "string" },
                        "pages": { "type": "integer", "format": "int64" },
                        "color": { "$ref": "#/components/schemas/Color" }
                    },
                    "required": ["id", "author", "title", "pages"]
                },
                "BookInput": {
                    "type": "object",
                    "description": "Every field is optional; unknown fields are ignored.",
                    "properties": {
                        "author": { "type": "string" },
                        "title": { "type": "string" },
                        "pages": { "type": "integer", "format": "int64" },
                        "color": { "$ref": "#/components/schemas/Color" }
                    }
                }
            }
        }
    })
}

pub fn create_module() -> Arc<dyn Module> {
    Arc::new(BooksModule::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_kernel::settings::Settings;
    use shelf_kernel::Database;

    #[test]
    fn migrations_create_books_table() {
        let migrations = BooksModule::new().migrations();
        assert_eq!(migrations.len(), 1);
        assert!(migrations[0].up.contains("CREATE TABLE IF NOT EXISTS books"));
    }

    #[test]
    fn openapi_documents_every_book_route() {
        let doc = BooksModule::new().openapi().unwrap();
        for (path, method) in [
            ("/", "get"),
            ("/", "post"),
            ("/{id}", "get"),
            ("/{id}", "put"),
            ("/{id}", "delete"),
        ] {
            assert!(doc["paths"][path][method].is_object(), "{method} {path}");
        }
        assert!(doc["components"]["schemas"]["Book"].is_object());
    }

    #[tokio::test]
    async fn init_builds_service_from_database() {
        let module = BooksModule::new();
        assert!(module.service.get().is_none());

        let settings = Settings::default();
        let db = Database::in_memory().await.unwrap();
        module.init(&InitCtx { settings: &settings, db: &db }).await.unwrap();

        assert!(module.service.get().is_some());
    }

    #[tokio::test]
    async fn injected_service_survives_init_and_backs_routes() {
        use axum::body::{to_bytes, Body};
        use axum::http::{Request, StatusCode};
        use repository::BookRepository;
        use tower::ServiceExt;

        let settings = Settings::default();
        let db = Database::in_memory().await.unwrap();
        db.apply_migrations(&[("books".to_string(), repository::migrations().remove(0))])
            .await
            .unwrap();
        let repository = Arc::new(SqliteBookRepository::new(db.pool().clone()));
        repository
            .create(&models::BookFields {
                title: "Dune".to_string(),
                ..models::BookFields::default()
            })
            .await
            .unwrap();

        let service: Arc<dyn BookService> = Arc::new(BookManager::new(repository));
        let module = BooksModule::with_service(service.clone());
        module.init(&InitCtx { settings: &settings, db: &db }).await.unwrap();
        assert!(Arc::ptr_eq(module.service.get().unwrap(), &service));

        let response = module
            .routes()
            .oneshot(Request::builder().uri("/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let book: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(book["title"], "Dune");
    }

    #[tokio::test]
    async fn routes_before_init_are_empty() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        let response = BooksModule::new()
            .routes()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
