use bus_booking::models::{SeatLayout, SeatType};
use bus_booking::services::layout::generate_seats;
use proptest::prelude::*;
use std::collections::HashSet;

fn layouts() -> impl Strategy<Value = SeatLayout> {
    (1u32..=30, 0u32..=13, 0u32..=13)
        .prop_filter("at least one column", |(_, l, r)| l + r > 0)
        .prop_map(|(rows, left, right)| SeatLayout {
            rows,
            cols_per_side: (left, right),
        })
}

proptest! {
    #[test]
    fn seat_count_matches_layout(layout in layouts()) {
        let seats = generate_seats(&layout).unwrap();
        let (left, right) = layout.cols_per_side;
        prop_assert_eq!(seats.len() as u32, layout.rows * (left + right));
    }

    #[test]
    fn labels_and_positions_are_unique(layout in layouts()) {
        let seats = generate_seats(&layout).unwrap();
        let labels: HashSet<&str> = seats.iter().map(|s| s.seat_number.as_str()).collect();
        let positions: HashSet<(i32, i32)> = seats.iter().map(|s| (s.row, s.column)).collect();
        prop_assert_eq!(labels.len(), seats.len());
        prop_assert_eq!(positions.len(), seats.len());
    }

    #[test]
    fn every_row_has_a_window_per_nonempty_side(layout in layouts()) {
        let seats = generate_seats(&layout).unwrap();
        let (left, right) = layout.cols_per_side;
        let sides = u32::from(left > 0) + u32::from(right > 0);
        for row in 1..=layout.rows as i32 {
            let windows = seats
                .iter()
                .filter(|s| s.row == row && s.seat_type == SeatType::Window)
                .count() as u32;
            prop_assert_eq!(windows, sides);
        }
    }

    #[test]
    fn label_is_row_then_column_letter(layout in layouts()) {
        for seat in generate_seats(&layout).unwrap() {
            let letter = char::from(b'A' + (seat.column - 1) as u8);
            prop_assert_eq!(seat.seat_number, format!("{}{}", seat.row, letter));
        }
    }
}
