//! Цена места: базовая цена маршрута, умноженная на коэффициент класса автобуса.
//! Все места рейса стоят одинаково.

use rust_decimal::Decimal;

use crate::models::BusType;

pub fn multiplier(bus_type: BusType) -> Decimal {
    match bus_type {
        BusType::NonAc => Decimal::ONE,
        BusType::Ac => Decimal::new(13, 1),
        BusType::SemiSleeper => Decimal::new(15, 1),
        BusType::Sleeper => Decimal::new(18, 1),
    }
}

/// Коэффициент по внешней метке класса. Неизвестная метка даёт 1.0.
pub fn multiplier_for(label: &str) -> Decimal {
    label
        .parse::<BusType>()
        .map_or(Decimal::ONE, multiplier)
}

/// Цена одного места, округлённая до копеек.
pub fn price_per_seat(base_price: Decimal, bus_type: BusType) -> Decimal {
    (base_price * bus_type.price_multiplier()).round_dp(2)
}

pub fn total_price(price_per_seat: Decimal, seat_count: usize) -> Decimal {
    price_per_seat * Decimal::from(seat_count)
}
