use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::BookingError;

/// Статус брони. `Cancelled` терминален.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    /// Статусы, места которых входят в множество занятых на рейс и дату.
    pub const HOLDING: [BookingStatus; 2] = [Self::Pending, Self::Confirmed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn holds_seats(&self) -> bool {
        Self::HOLDING.contains(self)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Confirmed, Self::Cancelled)
        )
    }
}

impl FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "Cancelled" => Ok(Self::Cancelled),
            other => Err(BookingError::Internal(format!("unknown booking status '{other}'"))),
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub scheduled_trip_id: i64,
    pub booking_date: NaiveDate,
    pub travel_date: NaiveDate,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

/// Строка брони: одно место и цена, по которой оно продано. Не изменяется.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingSeat {
    pub id: i64,
    pub booking_id: i64,
    pub seat_id: i64,
    pub seat_number: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub seats: Vec<BookingSeat>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: i64,
    pub scheduled_trip_id: i64,
    pub booking_date: NaiveDate,
    pub travel_date: NaiveDate,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub seats: Vec<NewBookingSeat>,
}

#[derive(Debug, Clone)]
pub struct NewBookingSeat {
    pub seat_id: i64,
    pub seat_number: String,
    pub price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_is_terminal() {
        for next in [BookingStatus::Pending, BookingStatus::Confirmed, BookingStatus::Cancelled] {
            assert!(!BookingStatus::Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn allowed_transitions() {
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Confirmed));
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Cancelled));
        assert!(BookingStatus::Confirmed.can_transition_to(BookingStatus::Cancelled));
        assert!(!BookingStatus::Confirmed.can_transition_to(BookingStatus::Pending));
    }

    #[test]
    fn only_live_bookings_hold_seats() {
        assert!(BookingStatus::Pending.holds_seats());
        assert!(BookingStatus::Confirmed.holds_seats());
        assert!(!BookingStatus::Cancelled.holds_seats());
    }
}
