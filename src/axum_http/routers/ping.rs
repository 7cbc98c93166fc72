use axum::{Json, Router, response::IntoResponse, routing::get};
use serde_json::json;

pub fn routes() -> Router {
    Router::new().route("/ping", get(ping))
}

pub async fn ping() -> impl IntoResponse {
    Json(json!({ "status": "OK" }))
}
