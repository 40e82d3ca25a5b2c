//! Router assembly.

use std::any::Any;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Extension},
    handler::HandlerWithoutStateExt,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::handlers::{self, AppState, STATIC_ROUTE};
use crate::openapi::ApiDoc;
use crate::storage::Storage;

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

pub fn build_router(config: AppConfig, storage: Arc<dyn Storage>) -> Router {
    let body_limit = usize::try_from(config.upload.max_file_size.saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);
    let static_files =
        ServeDir::new(&config.upload_dir).not_found_service(not_found.into_service());
    let cors_layer = create_cors_layer(&config.cors_origins);
    let enable_delete = config.enable_delete;

    let state = Arc::new(AppState {
        storage,
        config: Arc::new(config),
    });

    let mut api = Router::new()
        .route(
            "/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/files", get(handlers::list_files));

    if enable_delete {
        api = api.route("/files/{filename}", delete(handlers::delete_file));
    }

    Router::new()
        .nest("/api", api)
        .nest_service(STATIC_ROUTE, static_files)
        .merge(Scalar::with_url("/ui", ApiDoc::openapi()))
        .route("/", get(|| async { Redirect::temporary("/ui") }))
        .route("/api-docs", get(openapi_json))
        .route("/doc", get(openapi_json))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer)
                .layer(Extension(state)),
        )
}

fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    if parsed.is_empty() {
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers(cors::Any)
            .allow_origin(cors::Any)
    } else {
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([CONTENT_TYPE])
            .allow_origin(parsed)
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %detail, "request handler panicked");

    ApiError::Internal.into_response()
}
