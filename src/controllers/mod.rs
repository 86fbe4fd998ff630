#[cfg(feature = "admin")]
pub mod admin;
pub mod bookings;
pub mod catalog;
pub mod trips;
pub mod users;

use axum::Router;
use rust_decimal::Decimal;
use std::sync::Arc;
use validator::ValidationError;

use crate::config::Config;

pub fn routes(config: &Config) -> Router<Arc<crate::AppState>> {
    let router = Router::new()
        .merge(catalog::routes())
        .merge(trips::routes())
        .merge(users::routes())
        .merge(bookings::routes());

    #[cfg(feature = "admin")]
    let router = if config.features.enable_admin {
        tracing::info!("Admin API enabled at /api/admin");
        router.nest("/admin", admin::routes())
    } else {
        router
    };

    #[cfg(not(feature = "admin"))]
    let _ = config;

    router
}

/* ---------- общие валидаторы DTO ---------- */

pub(crate) fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        return Err(ValidationError::new("non_negative"));
    }
    Ok(())
}

pub(crate) fn weekdays(days: &Vec<u8>) -> Result<(), ValidationError> {
    if days.iter().any(|d| *d > 6) {
        return Err(ValidationError::new("weekday_range"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validators() {
        assert!(non_negative(&Decimal::ZERO).is_ok());
        assert!(non_negative(&Decimal::new(-1, 2)).is_err());
        assert!(weekdays(&vec![0, 6]).is_ok());
        assert!(weekdays(&vec![7]).is_err());
    }
}
