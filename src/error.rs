use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::BookingStatus;

/// Ошибки домена бронирования. Все, кроме `Database` и `Internal`,
/// адресованы пользователю и исправляются повторным запросом.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid seat layout: {0}")]
    InvalidLayout(String),

    #[error("invalid seat selection: {0}")]
    InvalidSeatSelection(String),

    #[error("seats already booked: {seat_ids:?}")]
    SeatAlreadyBooked { seat_ids: Vec<i64> },

    #[error("booking {0} is already cancelled")]
    AlreadyCancelled(i64),

    #[error("booking {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: i64,
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("invalid travel date: {0}")]
    InvalidTravelDate(String),

    #[error("bus {0} has booked seats, seat regeneration refused")]
    SeatsInUse(i64),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, BookingError>;

impl BookingError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidLayout(_)
            | Self::InvalidSeatSelection(_)
            | Self::InvalidTravelDate(_)
            | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::SeatAlreadyBooked { .. }
            | Self::AlreadyCancelled(_)
            | Self::InvalidTransition { .. }
            | Self::SeatsInUse(_)
            | Self::Duplicate(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            Self::Database(_) | Self::Internal(_) => {
                tracing::error!("Internal Server Error: {}", self);
                json!({ "error": "Internal Server Error" })
            }
            Self::SeatAlreadyBooked { seat_ids } => json!({
                "error": self.to_string(),
                "seat_ids": seat_ids,
            }),
            Self::Validation(errors) => json!({
                "error": "validation failed",
                "fields": errors,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Переводит нарушение уникального индекса (SQLSTATE 23505) в `Duplicate`.
pub(crate) fn map_unique_violation(err: sqlx::Error, what: &str) -> BookingError {
    let is_unique = err
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505");

    if is_unique {
        BookingError::Duplicate(what.to_string())
    } else {
        BookingError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_errors_are_not_server_errors() {
        assert_eq!(
            BookingError::InvalidLayout("rows".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BookingError::InvalidSeatSelection("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BookingError::SeatAlreadyBooked { seat_ids: vec![3] }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            BookingError::AlreadyCancelled(1).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            BookingError::not_found("booking 7").status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn internal_errors_map_to_500() {
        let err = BookingError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn non_unique_database_errors_pass_through() {
        let err = map_unique_violation(sqlx::Error::RowNotFound, "location");
        assert!(matches!(err, BookingError::Database(_)));
    }
}
