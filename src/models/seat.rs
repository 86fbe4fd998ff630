use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::BookingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeatType {
    Window,
    Aisle,
    Middle,
}

impl SeatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Window => "Window",
            Self::Aisle => "Aisle",
            Self::Middle => "Middle",
        }
    }
}

impl FromStr for SeatType {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Window" => Ok(Self::Window),
            "Aisle" => Ok(Self::Aisle),
            "Middle" => Ok(Self::Middle),
            other => Err(BookingError::Internal(format!("unknown seat type '{other}'"))),
        }
    }
}

/// Место в конкретном автобусе. Номер (`1A`, `3C`) уникален в пределах автобуса.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: i64,
    pub bus_id: i64,
    pub seat_number: String,
    pub row: i32,
    pub column: i32,
    pub seat_type: SeatType,
    pub is_active: bool,
}

/// Место, сгенерированное по схеме салона, но ещё не сохранённое.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSeat {
    pub seat_number: String,
    pub row: i32,
    pub column: i32,
    pub seat_type: SeatType,
}
