use serde::Serialize;
use sqlx::FromRow;
use chrono::{DateTime, Utc};

use crate::error::{map_unique_violation, BookingError};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub user_id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub registered_at: DateTime<Utc>,
}

impl User {
    // Найти активного пользователя по email
    pub async fn find_by_email(email: &str, db: &crate::database::Database) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT user_id, email, password_hash, full_name, is_staff, is_active, registered_at
             FROM users
             WHERE email = $1 AND is_active = true"
        )
        .bind(email)
        .fetch_optional(&db.pool)
        .await
    }

    pub async fn create(
        db: &crate::database::Database,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<User, BookingError> {
        let password = password.to_string();
        // bcrypt намеренно медленный, не держим на нём реактор
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| BookingError::Internal(format!("hash task failed: {e}")))?
            .map_err(|e| BookingError::Internal(format!("bcrypt: {e}")))?;

        sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash, full_name)
             VALUES ($1, $2, $3)
             RETURNING user_id, email, password_hash, full_name, is_staff, is_active, registered_at"
        )
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .fetch_one(&db.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("user {email}")))
    }

    // Проверить пароль по bcrypt-хешу
    pub async fn verify_password(&self, password: &str) -> bool {
        let password = password.to_string();
        let hash = self.password_hash.clone();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
            .await
            .unwrap_or(false)
    }
}
