use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;
use tracing::{debug, error};

use crate::models::User;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub full_name: String,
    pub is_staff: bool,
}

/// Пользователь с правами персонала (`is_staff`), для админских маршрутов.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

// Разбирает `Authorization: Basic base64(email:password)`
pub fn parse_basic(auth_header: &str) -> Option<(String, String)> {
    let encoded = auth_header.strip_prefix("Basic ")?;
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (email, password) = credentials.split_once(':')?;
    if email.is_empty() {
        return None;
    }
    Some((email.to_string(), password.to_string()))
}

// Basic Auth extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let (email, password) = parse_basic(auth_header).ok_or(StatusCode::UNAUTHORIZED)?;

        let user = User::find_by_email(&email, &state.db)
            .await
            .map_err(|e| {
                error!("User lookup failed: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        if !user.verify_password(&password).await {
            debug!("Wrong password for {}", email);
            return Err(StatusCode::UNAUTHORIZED);
        }

        // Обновляем last_logged_in
        sqlx::query("UPDATE users SET last_logged_in = NOW() WHERE user_id = $1")
            .bind(user.user_id)
            .execute(&state.db.pool)
            .await
            .ok(); // Игнорируем ошибку обновления

        Ok(AuthUser {
            user_id: user.user_id,
            email: user.email,
            full_name: user.full_name,
            is_staff: user.is_staff,
        })
    }
}

impl FromRequestParts<Arc<crate::AppState>> for AdminUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            return Err(StatusCode::FORBIDDEN);
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(raw: &str) -> String {
        format!("Basic {}", general_purpose::STANDARD.encode(raw))
    }

    #[test]
    fn parses_credentials() {
        assert_eq!(
            parse_basic(&basic("anna@example.com:s3cr:et")),
            Some(("anna@example.com".to_string(), "s3cr:et".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_headers() {
        assert_eq!(parse_basic("Bearer abc"), None);
        assert_eq!(parse_basic("Basic !!!"), None);
        assert_eq!(parse_basic(&basic("no-colon")), None);
        assert_eq!(parse_basic(&basic(":password")), None);
    }
}
