//! Генерация мест по схеме салона.
//!
//! Схема `{rows: R, cols_per_side: [L, Rt]}` разворачивается в `R * (L + Rt)` мест.
//! Колонки нумеруются сквозь проход: слева `1..=L`, справа `L+1..=L+Rt`;
//! буква места это номер колонки в алфавите (`1 -> A`), номер места `"{ряд}{буква}"`.
//!
//! Тип места:
//! - слева: первая колонка у окна, последняя у прохода, остальные посередине;
//! - справа: последняя колонка у окна, первая у прохода, остальные посередине.
//!
//! Условие "у окна" проверяется первым, поэтому единственное место на стороне
//! всегда `Window`.

use tracing::{info, warn};

use crate::error::{BookingError, Result};
use crate::models::{Bus, NewSeat, Seat, SeatLayout, SeatType};
use crate::store::BookingStore;

fn seat_letter(column: u32) -> char {
    // column в 1..=26 гарантирован SeatLayout::validate
    char::from(b'A' + (column - 1) as u8)
}

fn new_seat(row: u32, column: u32, seat_type: SeatType) -> NewSeat {
    NewSeat {
        seat_number: format!("{}{}", row, seat_letter(column)),
        row: row as i32,
        column: column as i32,
        seat_type,
    }
}

/// Разворачивает схему в упорядоченный (по ряду, затем по колонке) список мест.
pub fn generate_seats(layout: &SeatLayout) -> Result<Vec<NewSeat>> {
    layout.validate()?;

    let (left, right) = layout.cols_per_side;
    let mut seats = Vec::with_capacity(layout.capacity() as usize);

    for row in 1..=layout.rows {
        for col in 1..=left {
            let seat_type = if col == 1 {
                SeatType::Window
            } else if col == left {
                SeatType::Aisle
            } else {
                SeatType::Middle
            };
            seats.push(new_seat(row, col, seat_type));
        }

        for k in 1..=right {
            let seat_type = if k == right {
                SeatType::Window
            } else if k == 1 {
                SeatType::Aisle
            } else {
                SeatType::Middle
            };
            seats.push(new_seat(row, left + k, seat_type));
        }
    }

    Ok(seats)
}

pub fn generate_for_bus(bus: &Bus) -> Result<Vec<NewSeat>> {
    generate_seats(&bus.seat_layout)
}

/// Пересоздаёт места автобуса по его схеме.
///
/// Отказывает (`SeatsInUse`), если на места автобуса уже есть брони: иначе строки
/// броней ссылались бы на удалённые места.
pub async fn regenerate_seats<S: BookingStore>(store: &S, bus_id: i64) -> Result<Vec<Seat>> {
    let bus = store
        .get_bus(bus_id)
        .await?
        .ok_or_else(|| BookingError::not_found(format!("bus {bus_id}")))?;

    let seats = generate_for_bus(&bus).inspect_err(|e| {
        warn!("Bus {} ({}): {}", bus.id, bus.name, e);
    })?;

    let created = store.replace_seats(bus.id, &seats).await.inspect_err(|e| {
        warn!("Bus {} ({}): seat regeneration failed: {}", bus.id, bus.name, e);
    })?;

    info!(
        "Generated {} seats for bus {} ({}), layout {}x{:?}",
        created.len(),
        bus.id,
        bus.name,
        bus.seat_layout.rows,
        bus.seat_layout.cols_per_side
    );
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(rows: u32, left: u32, right: u32) -> SeatLayout {
        SeatLayout {
            rows,
            cols_per_side: (left, right),
        }
    }

    fn labels(seats: &[NewSeat]) -> Vec<&str> {
        seats.iter().map(|s| s.seat_number.as_str()).collect()
    }

    fn types(seats: &[NewSeat]) -> Vec<SeatType> {
        seats.iter().map(|s| s.seat_type).collect()
    }

    #[test]
    fn two_plus_two_row() {
        let seats = generate_seats(&layout(1, 2, 2)).unwrap();
        assert_eq!(labels(&seats), ["1A", "1B", "1C", "1D"]);
        assert_eq!(
            types(&seats),
            [SeatType::Window, SeatType::Aisle, SeatType::Aisle, SeatType::Window]
        );
        assert_eq!(
            seats.iter().map(|s| s.column).collect::<Vec<_>>(),
            [1, 2, 3, 4]
        );
    }

    #[test]
    fn three_columns_have_a_middle_seat() {
        let seats = generate_seats(&layout(1, 3, 3)).unwrap();
        assert_eq!(labels(&seats), ["1A", "1B", "1C", "1D", "1E", "1F"]);
        assert_eq!(
            types(&seats),
            [
                SeatType::Window,
                SeatType::Middle,
                SeatType::Aisle,
                SeatType::Aisle,
                SeatType::Middle,
                SeatType::Window,
            ]
        );
    }

    #[test]
    fn single_seat_side_is_window() {
        let seats = generate_seats(&layout(2, 1, 2)).unwrap();
        assert_eq!(labels(&seats), ["1A", "1B", "1C", "2A", "2B", "2C"]);
        assert_eq!(seats[0].seat_type, SeatType::Window);
        assert_eq!(seats[1].seat_type, SeatType::Aisle);
        assert_eq!(seats[2].seat_type, SeatType::Window);

        let seats = generate_seats(&layout(1, 2, 1)).unwrap();
        assert_eq!(
            types(&seats),
            [SeatType::Window, SeatType::Aisle, SeatType::Window]
        );
    }

    #[test]
    fn one_sided_layout() {
        let seats = generate_seats(&layout(3, 0, 2)).unwrap();
        assert_eq!(labels(&seats), ["1A", "1B", "2A", "2B", "3A", "3B"]);
        assert_eq!(seats[0].seat_type, SeatType::Aisle);
        assert_eq!(seats[1].seat_type, SeatType::Window);
    }

    #[test]
    fn rows_are_numbered_from_one() {
        let seats = generate_seats(&layout(12, 2, 2)).unwrap();
        assert_eq!(seats.len(), 48);
        assert_eq!(seats.last().map(|s| s.seat_number.as_str()), Some("12D"));
        assert!(seats.iter().all(|s| (1..=12).contains(&s.row)));
    }

    #[test]
    fn degenerate_layouts_fail() {
        assert!(matches!(
            generate_seats(&layout(0, 2, 2)),
            Err(BookingError::InvalidLayout(_))
        ));
        assert!(matches!(
            generate_seats(&layout(10, 0, 0)),
            Err(BookingError::InvalidLayout(_))
        ));
    }

    #[test]
    fn twenty_six_columns_end_at_z() {
        let seats = generate_seats(&layout(1, 13, 13)).unwrap();
        assert_eq!(seats.last().map(|s| s.seat_number.as_str()), Some("1Z"));
    }
}
