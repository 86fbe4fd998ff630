use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::User;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(register))
        .route("/users/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
struct RegisterRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 8, max = 128))]
    password: String,
    #[validate(length(min = 1, max = 255))]
    full_name: String,
}

// POST /api/users
async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    req.validate()?;
    let email = req.email.trim().to_lowercase();
    let user = User::create(&state.db, &email, &req.password, req.full_name.trim()).await?;
    info!("User registered: #{} {}", user.user_id, user.email);
    Ok((StatusCode::CREATED, Json(user)))
}

// GET /api/users/me (Basic Auth)
async fn me(user: AuthUser) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "user_id": user.user_id,
        "email": user.email,
        "full_name": user.full_name,
        "is_staff": user.is_staff,
    }))
}
