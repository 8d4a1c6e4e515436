use crate::error::Result;
use crate::model::{CreateUrlRequest, UrlCreatedResponse, UrlResponse};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::header::ACCEPT;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use keymint_core::Error;
use tracing::info;

pub async fn create_url_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateUrlRequest>,
) -> Result<Response> {
    if request.url.is_empty() {
        return Err(Error::Invalid("expected url".to_string()).into());
    }

    let record = state.assign.assign_url(&request.url).await?;
    info!(short_key = %record.short_key, "assigned inventory slot");

    let body = UrlCreatedResponse {
        url: record.short_key.to_url(&state.base_url),
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn get_url_handler(
    Path(short_key): Path<String>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Response> {
    info!(short_key = %short_key, "fetching url");

    // Length validation happens inside the repository; malformed keys
    // come back as `Invalid` and render as 400.
    let record = state.lookup.find(&short_key).await?;

    let url = record
        .url
        .ok_or_else(|| Error::NotFound(format!("short key '{short_key}' is unassigned")))?;

    if wants_json(&headers) {
        return Ok(Json(UrlResponse { success: true, url }).into_response());
    }

    Ok(Redirect::temporary(&url).into_response())
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("application/json"))
}
