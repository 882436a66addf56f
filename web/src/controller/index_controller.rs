use axum::http::StatusCode;
use axum::response::IntoResponse;

pub(crate) const USAGE: &str = "/stream streams numbers via SSE. params: intervalMs,start,limit";

/// GET a one-line description of the stream endpoint
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Usage of the stream endpoint", body = String),
    )
)]
pub async fn index() -> impl IntoResponse {
    (StatusCode::OK, USAGE)
}
