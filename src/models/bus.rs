use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::BookingError;

/// Класс автобуса. Определяет ценовой коэффициент рейса.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusType {
    #[serde(rename = "AC")]
    Ac,
    #[serde(rename = "Non-AC")]
    NonAc,
    #[serde(rename = "Sleeper")]
    Sleeper,
    #[serde(rename = "Semi-sleeper")]
    SemiSleeper,
}

impl BusType {
    pub const ALL: [BusType; 4] = [Self::Ac, Self::NonAc, Self::Sleeper, Self::SemiSleeper];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ac => "AC",
            Self::NonAc => "Non-AC",
            Self::Sleeper => "Sleeper",
            Self::SemiSleeper => "Semi-sleeper",
        }
    }

    pub fn price_multiplier(&self) -> Decimal {
        crate::services::pricing::multiplier(*self)
    }
}

impl FromStr for BusType {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| BookingError::InvalidInput(format!("unknown bus type '{s}'")))
    }
}

impl std::fmt::Display for BusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Компактное описание салона: число рядов и мест слева/справа от прохода.
///
/// Сериализуется как `{"rows": 10, "cols_per_side": [2, 2]}`. Нулевое значение
/// (`Default`) означает "схема ещё не задана"; генератор мест его отвергает.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatLayout {
    pub rows: u32,
    pub cols_per_side: (u32, u32),
}

impl SeatLayout {
    /// Буквы мест идут от A до Z, поэтому в ряду не больше 26 мест.
    pub const MAX_COLUMNS: u32 = 26;

    /// Верхняя граница рядов; длиннее салонов не бывает.
    pub const MAX_ROWS: u32 = 100;

    pub fn new(rows: u32, left: u32, right: u32) -> Result<Self, BookingError> {
        let layout = Self {
            rows,
            cols_per_side: (left, right),
        };
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<(), BookingError> {
        if self.rows == 0 {
            return Err(BookingError::InvalidLayout("rows must be at least 1".into()));
        }
        if self.rows > Self::MAX_ROWS {
            return Err(BookingError::InvalidLayout(format!(
                "{} rows exceed the limit of {}",
                self.rows,
                Self::MAX_ROWS
            )));
        }
        let columns = self.left() as u64 + self.right() as u64;
        if columns == 0 {
            return Err(BookingError::InvalidLayout(
                "at least one column per row is required".into(),
            ));
        }
        if columns > Self::MAX_COLUMNS as u64 {
            return Err(BookingError::InvalidLayout(format!(
                "{columns} columns per row exceed the A-Z seat letters"
            )));
        }
        Ok(())
    }

    pub fn left(&self) -> u32 {
        self.cols_per_side.0
    }

    pub fn right(&self) -> u32 {
        self.cols_per_side.1
    }

    pub fn columns(&self) -> u32 {
        self.left().saturating_add(self.right())
    }

    /// Число мест; для непроверенной схемы насыщается, а не переполняется.
    pub fn capacity(&self) -> u32 {
        self.rows.saturating_mul(self.columns())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub id: i64,
    pub name: String,
    pub bus_type: BusType,
    pub total_seats: i32,
    pub seat_layout: SeatLayout,
}

#[derive(Debug, Clone)]
pub struct NewBus {
    pub name: String,
    pub bus_type: BusType,
    pub total_seats: i32,
    pub seat_layout: SeatLayout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_type_round_trips_through_its_label() {
        for t in BusType::ALL {
            assert_eq!(t.as_str().parse::<BusType>().unwrap(), t);
        }
        assert!("Double-decker".parse::<BusType>().is_err());
    }

    #[test]
    fn layout_serializes_as_compact_descriptor() {
        let layout = SeatLayout::new(10, 2, 1).unwrap();
        let json = serde_json::to_value(layout).unwrap();
        assert_eq!(json, serde_json::json!({"rows": 10, "cols_per_side": [2, 1]}));

        let back: SeatLayout = serde_json::from_value(json).unwrap();
        assert_eq!(back.capacity(), 30);
    }

    #[test]
    fn degenerate_layouts_are_rejected() {
        assert!(matches!(SeatLayout::new(0, 2, 2), Err(BookingError::InvalidLayout(_))));
        assert!(matches!(SeatLayout::new(5, 0, 0), Err(BookingError::InvalidLayout(_))));
        assert!(matches!(SeatLayout::new(5, 20, 7), Err(BookingError::InvalidLayout(_))));
        assert!(SeatLayout::new(1, 0, 3).is_ok());
        assert!(SeatLayout::default().validate().is_err());
    }

    #[test]
    fn row_count_is_bounded() {
        assert!(SeatLayout::new(SeatLayout::MAX_ROWS, 13, 13).is_ok());
        assert!(matches!(
            SeatLayout::new(SeatLayout::MAX_ROWS + 1, 2, 2),
            Err(BookingError::InvalidLayout(_))
        ));
        assert!(matches!(
            SeatLayout::new(u32::MAX, 13, 13),
            Err(BookingError::InvalidLayout(_))
        ));
    }

    #[test]
    fn capacity_of_unchecked_layout_saturates() {
        let huge = SeatLayout {
            rows: u32::MAX,
            cols_per_side: (u32::MAX, u32::MAX),
        };
        assert_eq!(huge.capacity(), u32::MAX);
    }
}
