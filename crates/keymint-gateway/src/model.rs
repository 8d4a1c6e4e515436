use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUrlRequest {
    pub url: String,
}

/// Body returned after an inventory slot is assigned.
#[derive(Debug, Clone, Serialize)]
pub struct UrlCreatedResponse {
    pub url: String,
}

/// JSON lookup response for clients that ask for it via `Accept`.
#[derive(Debug, Clone, Serialize)]
pub struct UrlResponse {
    pub success: bool,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
