//! Router builder for the SHELF HTTP server

use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use uuid::{NoContext, Timestamp, Uuid};

use shelf_kernel::ModuleRegistry;

use crate::error::ErrorBody;

/// Builder for constructing the main HTTP router
pub struct RouterBuilder {
    router: Router,
    openapi: serde_json::Value,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            openapi: base_openapi(),
        }
    }

    /// Add a top-level route
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Nest a module's router under `/{module_name}`
    pub fn mount_module(mut self, module_name: &str, module_router: Router) -> Self {
        self.router = self
            .router
            .nest(&mount_path(module_name), module_router);
        self
    }

    /// Merge a module's OpenAPI fragment, prefixing its paths with the mount point
    pub fn document_module(mut self, module_name: &str, fragment: &serde_json::Value) -> Self {
        if let Some(paths) = fragment.get("paths").and_then(|p| p.as_object()) {
            for (path, path_item) in paths {
                let prefixed = if path == "/" {
                    mount_path(module_name)
                } else {
                    format!("{}{}", mount_path(module_name), path)
                };
                self.openapi["paths"][prefixed] = path_item.clone();
            }
        }

        if let Some(schemas) = fragment
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(|s| s.as_object())
        {
            for (schema_name, schema_def) in schemas {
                self.openapi["components"]["schemas"][schema_name] = schema_def.clone();
            }
        }

        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.router = self.router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        );
        self
    }

    /// Add CORS middleware
    pub fn with_cors(mut self) -> Self {
        self.router = self.router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
        self
    }

    /// Stamp each request with a v7 `x-request-id` and echo it on the response
    pub fn with_request_id(mut self) -> Self {
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.router = self
            .router
            .layer(TimeoutLayer::new(Duration::from_millis(timeout_ms)))
            .layer(axum::middleware::map_response(timeout_as_error_body));
        self
    }

    /// Merge every module's fragment and serve the result as JSON and Swagger UI
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        for module in registry.modules() {
            if let Some(fragment) = module.openapi() {
                self = self.document_module(module.name(), &fragment);
            }
        }

        let document = self.openapi.clone();

        // Swagger UI needs a typed document; fall back to a bare one if the
        // merged JSON does not deserialize.
        let openapi_obj: utoipa::openapi::OpenApi = serde_json::from_value(document.clone())
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "merged OpenAPI document is not valid; serving a bare document");
                utoipa::openapi::OpenApiBuilder::new()
                    .info(
                        utoipa::openapi::InfoBuilder::new()
                            .title("SHELF Books API")
                            .version("1.0.0")
                            .build(),
                    )
                    .build()
            });

        self.router = self.router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi_obj),
        );

        self.router = self.router.route(
            "/docs/openapi.json",
            get(move || async move { axum::Json(document) }),
        );

        self
    }

    /// The merged OpenAPI document collected so far
    pub fn openapi(&self) -> &serde_json::Value {
        &self.openapi
    }

    pub fn build(self) -> Router {
        self.router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `TimeoutLayer` answers 408 with an empty body; give it the `{"error": ...}` shape.
async fn timeout_as_error_body(response: Response) -> Response {
    if response.status() != StatusCode::REQUEST_TIMEOUT {
        return response;
    }

    tracing::warn!(status_code = 408, "request timed out");
    (
        StatusCode::REQUEST_TIMEOUT,
        Json(ErrorBody {
            error: "request timed out".to_string(),
        }),
    )
        .into_response()
}

fn mount_path(module_name: &str) -> String {
    format!("/{}", module_name)
}

fn base_openapi() -> serde_json::Value {
    serde_json::json!({
        "openapi": "3.1.0",
        "info": {
            "title": "SHELF Books API",
            "version": "1.0.0",
            "description": "CRUD service for book records"
        },
        "paths": {
            "/healthz": {
                "get": {
                    "summary": "Health check",
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": {
                                "text/plain": { "schema": { "type": "string" } }
                            }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "ErrorResponse": {
                    "type": "object",
                    "properties": {
                        "error": { "type": "string" }
                    },
                    "required": ["error"]
                }
            }
        }
    })
}

/// Request ID generator producing time-ordered UUIDs
#[derive(Clone, Copy)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let request_id = Uuid::new_v7(Timestamp::now(NoContext))
            .to_string()
            .parse::<HeaderValue>()
            .ok()?;
        Some(RequestId::new(request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, body::to_bytes};
    use tower::ServiceExt;

    async fn send_get(router: Router, uri: &str) -> axum::response::Response {
        router
            .oneshot(
                axum::http::Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn module_routes_are_nested_under_module_name() {
        let module_router = Router::new()
            .route("/", get_handler("index"))
            .route("/{id}", get_handler("item"));

        let router = RouterBuilder::new()
            .mount_module("books", module_router)
            .build();

        let response = send_get(router.clone(), "/books").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"index");

        let response = send_get(router, "/books/7").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"item");
    }

    #[tokio::test]
    async fn request_id_is_echoed_on_response() {
        let router = RouterBuilder::new()
            .route("/ping", axum::routing::get(|| async { "pong" }))
            .with_request_id()
            .build();

        let response = send_get(router, "/ping").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn middleware_chain_still_serves_routes() {
        let router = RouterBuilder::new()
            .route("/health", axum::routing::get(|| async { "ok" }))
            .with_tracing()
            .with_cors()
            .with_request_id()
            .with_timeout(5000)
            .build();

        let response = send_get(router, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn module_fragments_are_prefixed() {
        let fragment = serde_json::json!({
            "paths": {
                "/": { "get": { "summary": "List" } },
                "/{id}": { "get": { "summary": "Get" } }
            },
            "components": { "schemas": { "Book": { "type": "object" } } }
        });

        let builder = RouterBuilder::new().document_module("books", &fragment);
        let doc = builder.openapi();

        assert_eq!(doc["paths"]["/books"]["get"]["summary"], "List");
        assert_eq!(doc["paths"]["/books/{id}"]["get"]["summary"], "Get");
        assert!(doc["paths"]["/healthz"].is_object());
        assert!(doc["components"]["schemas"]["Book"].is_object());
        assert!(doc["components"]["schemas"]["ErrorResponse"].is_object());
    }

    #[tokio::test]
    async fn timed_out_request_gets_json_error_body() {
        let router = RouterBuilder::new()
            .route(
                "/slow",
                axum::routing::get(|| async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    "late"
                }),
            )
            .with_timeout(10)
            .build();

        let response = send_get(router, "/slow").await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "request timed out" }));
    }

    fn get_handler(body: &'static str) -> axum::routing::MethodRouter {
        axum::routing::get(move || async move { body })
    }
}
