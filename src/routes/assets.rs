use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use rust_embed::Embed;

use crate::state::AppState;
use crate::uploads::{PROFILE_DIR, RECIPE_DIR};

#[derive(Embed)]
#[folder = "assets/"]
struct Assets;

pub async fn serve(Path(path): Path<String>) -> Response {
    match Assets::get(&path) {
        Some(file) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
                ],
                file.data.to_vec(),
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve an uploaded image from the data directory. Missing files fall back
/// to an embedded placeholder so seeded defaults always render.
pub async fn media(
    State(state): State<AppState>,
    Path((folder, file)): Path<(String, String)>,
) -> Response {
    if folder != PROFILE_DIR && folder != RECIPE_DIR {
        return StatusCode::NOT_FOUND.into_response();
    }
    // Stored names are generated hex; anything that could escape the
    // uploads directory is rejected outright.
    if file.contains('/') || file.contains('\\') || file.contains("..") {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = state.config.uploads_path().join(&folder).join(&file);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&file).first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                bytes,
            )
                .into_response()
        }
        Err(_) => placeholder(),
    }
}

fn placeholder() -> Response {
    match Assets::get("img/placeholder.svg") {
        Some(file) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/svg+xml".to_string())],
            file.data.to_vec(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
