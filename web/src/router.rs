use crate::{
    controller::{health_check_controller, index_controller},
    sse::handler,
    AppState,
};
use axum::{
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method},
    routing::get,
    Router,
};
use log::*;
use service::config::Config;
use tower_http::cors::{AllowOrigin, CorsLayer};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Number Stream API"
        ),
        paths(
            index_controller::index,
            health_check_controller::health_check,
            handler::stream_handler,
        ),
        tags(
            (name = "number_stream", description = "Server-Sent Events stream of increasing numbers")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.service_state.config);

    Router::new()
        .merge(index_routes())
        .merge(health_routes())
        .merge(stream_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
        .layer(cors)
}

fn index_routes() -> Router {
    Router::new().route("/", get(index_controller::index))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn stream_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/stream", get(handler::stream_handler))
        .with_state(app_state)
}

/// Builds the CORS policy. Origins that are not valid header values are
/// skipped with a warning.
fn cors_layer(config: &Config) -> CorsLayer {
    let allow_origin = if config.allows_any_origin() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allow_origin
            .iter()
            .filter_map(|origin| match origin.trim().parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Ignoring invalid CORS origin {origin:?}: {e}");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(handler::LAST_EVENT_ID),
        ])
}
