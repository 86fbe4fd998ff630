//! Проверка доступности мест и оформление брони.
//!
//! Порядок `confirm_booking`:
//! 1. проверяются рейс и дата поездки;
//! 2. в транзакции рейса места запроса разрешаются в активные места автобуса,
//!    читая таблицу мест напрямую, а не кеш;
//! 3. там же читается множество занятых мест на дату, при пересечении бронь
//!    отклоняется, иначе вставляется бронь и по строке на место;
//! 4. commit. Пока транзакция открыта, параллельная бронь того же рейса ждёт.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::{info, warn};

use crate::error::{BookingError, Result};
use crate::models::{
    Booking, BookingDetails, BookingStatus, NewBooking, NewBookingSeat, Seat, TripDetails,
};
use crate::services::pricing;
use crate::store::{BookingStore, TripTransaction};

/// Запрос на бронь: кто, какой рейс, на какую дату и какие места.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub user_id: i64,
    pub trip_id: i64,
    pub travel_date: NaiveDate,
    pub seat_ids: Vec<i64>,
}

/// Расчёт брони без сохранения (страница оформления).
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub trip_id: i64,
    pub travel_date: NaiveDate,
    pub seats: Vec<Seat>,
    pub price_per_seat: Decimal,
    pub total_price: Decimal,
}

struct Prepared {
    trip: TripDetails,
    price_per_seat: Decimal,
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Проверяет дату поездки: не в прошлом и в день, когда рейс ходит.
pub fn check_travel_date(trip: &TripDetails, travel_date: NaiveDate, today: NaiveDate) -> Result<()> {
    if travel_date < today {
        return Err(BookingError::InvalidTravelDate(format!(
            "{travel_date} is in the past"
        )));
    }
    if !trip.trip.runs_on(travel_date) {
        return Err(BookingError::InvalidTravelDate(format!(
            "trip {} does not run on {}",
            trip.trip.id,
            travel_date.format("%A %Y-%m-%d")
        )));
    }
    Ok(())
}

/// Разрешает запрошенные id в места автобуса.
///
/// Каждое id должно указывать на активное место этого автобуса, и число найденных
/// мест должно совпасть с числом id (повтор id тоже ошибка).
pub fn resolve_seats(bus_seats: &[Seat], requested: &[i64]) -> Result<Vec<Seat>> {
    if requested.is_empty() {
        return Err(BookingError::InvalidSeatSelection("no seats requested".into()));
    }

    let wanted: HashSet<i64> = requested.iter().copied().collect();
    let selected: Vec<Seat> = bus_seats
        .iter()
        .filter(|s| s.is_active && wanted.contains(&s.id))
        .cloned()
        .collect();

    if selected.len() != requested.len() {
        let found: HashSet<i64> = selected.iter().map(|s| s.id).collect();
        let unknown: BTreeSet<i64> = requested
            .iter()
            .copied()
            .filter(|id| !found.contains(id))
            .collect();
        let reason = if unknown.is_empty() {
            "duplicate seat ids in request".to_string()
        } else {
            format!("seats {unknown:?} are not active seats of this bus")
        };
        return Err(BookingError::InvalidSeatSelection(reason));
    }

    Ok(selected)
}

/// Места запроса, уже занятые другими бронями, по возрастанию id.
pub fn find_conflicts(booked: &HashSet<i64>, seats: &[Seat]) -> Vec<i64> {
    let mut taken: Vec<i64> = seats
        .iter()
        .map(|s| s.id)
        .filter(|id| booked.contains(id))
        .collect();
    taken.sort_unstable();
    taken
}

async fn prepare<S: BookingStore>(store: &S, req: &BookingRequest, today: NaiveDate) -> Result<Prepared> {
    if req.seat_ids.is_empty() {
        return Err(BookingError::InvalidSeatSelection("no seats requested".into()));
    }

    let trip = store
        .get_trip(req.trip_id)
        .await?
        .ok_or_else(|| BookingError::not_found(format!("trip {}", req.trip_id)))?;

    check_travel_date(&trip, req.travel_date, today)?;

    let price_per_seat = pricing::price_per_seat(trip.route.base_price, trip.bus.bus_type);
    Ok(Prepared {
        trip,
        price_per_seat,
    })
}

/// Считает стоимость и проверяет доступность, ничего не сохраняя.
pub async fn quote_booking<S: BookingStore>(store: &S, req: &BookingRequest) -> Result<Quote> {
    let prepared = prepare(store, req, today()).await?;

    // Расчёт допускает кешированный список мест; бронь перепроверит в транзакции
    let bus_seats = store.seats_for_bus(prepared.trip.bus.id).await?;
    let seats = resolve_seats(&bus_seats, &req.seat_ids)?;

    let booked = store.booked_seat_ids(req.trip_id, req.travel_date).await?;
    let conflicts = find_conflicts(&booked, &seats);
    if !conflicts.is_empty() {
        return Err(BookingError::SeatAlreadyBooked { seat_ids: conflicts });
    }

    Ok(Quote {
        trip_id: prepared.trip.trip.id,
        travel_date: req.travel_date,
        total_price: pricing::total_price(prepared.price_per_seat, seats.len()),
        price_per_seat: prepared.price_per_seat,
        seats,
    })
}

/// Оформляет бронь в статусе `Confirmed` с ценой на каждое место.
///
/// Либо сохраняются бронь и все её строки, либо ничего.
pub async fn confirm_booking<S: BookingStore>(store: &S, req: &BookingRequest) -> Result<BookingDetails> {
    let today = today();
    let prepared = prepare(store, req, today).await?;

    let mut tx = store.begin_trip(req.trip_id).await?;

    let active = tx.active_seats(prepared.trip.bus.id, &req.seat_ids).await?;
    let seats = resolve_seats(&active, &req.seat_ids)?;

    let booked = tx.booked_seat_ids(req.travel_date).await?;
    let conflicts = find_conflicts(&booked, &seats);
    if !conflicts.is_empty() {
        warn!(
            "User {}: seats {:?} of trip {} on {} already booked",
            req.user_id, conflicts, req.trip_id, req.travel_date
        );
        // tx откатывается при drop
        return Err(BookingError::SeatAlreadyBooked { seat_ids: conflicts });
    }

    let new_booking = NewBooking {
        user_id: req.user_id,
        scheduled_trip_id: req.trip_id,
        booking_date: today,
        travel_date: req.travel_date,
        total_price: pricing::total_price(prepared.price_per_seat, seats.len()),
        status: BookingStatus::Confirmed,
        seats: seats
            .iter()
            .map(|seat| NewBookingSeat {
                seat_id: seat.id,
                seat_number: seat.seat_number.clone(),
                price: prepared.price_per_seat,
            })
            .collect(),
    };

    let details = tx.insert_booking(&new_booking).await?;
    tx.commit().await?;

    info!(
        "Booking #{} confirmed: user {}, trip {} ({}), {} on {}, seats {:?}, total {}",
        details.booking.id,
        req.user_id,
        req.trip_id,
        prepared.trip.route,
        prepared.trip.bus.name,
        req.travel_date,
        details.seats.iter().map(|s| s.seat_number.as_str()).collect::<Vec<_>>(),
        details.booking.total_price
    );
    Ok(details)
}

async fn load_owned<S: BookingStore>(store: &S, booking_id: i64, user_id: i64) -> Result<BookingDetails> {
    // Чужая бронь неотличима от несуществующей
    store
        .get_booking(booking_id)
        .await?
        .filter(|d| d.booking.user_id == user_id)
        .ok_or_else(|| BookingError::not_found(format!("booking {booking_id}")))
}

pub async fn booking_details<S: BookingStore>(store: &S, booking_id: i64, user_id: i64) -> Result<BookingDetails> {
    load_owned(store, booking_id, user_id).await
}

pub async fn user_bookings<S: BookingStore>(store: &S, user_id: i64) -> Result<Vec<Booking>> {
    store.bookings_for_user(user_id).await
}

/// Отменяет бронь пользователя. Строки брони остаются как история цены,
/// а места снова считаются свободными на этот рейс и дату.
pub async fn cancel_booking<S: BookingStore>(store: &S, booking_id: i64, user_id: i64) -> Result<Booking> {
    let details = load_owned(store, booking_id, user_id).await?;
    let mut booking = details.booking;

    if booking.status == BookingStatus::Cancelled {
        return Err(BookingError::AlreadyCancelled(booking_id));
    }

    let updated = store
        .transition_booking(booking_id, &BookingStatus::HOLDING, BookingStatus::Cancelled)
        .await?;
    if !updated {
        // параллельная отмена успела раньше
        return Err(BookingError::AlreadyCancelled(booking_id));
    }

    info!("Booking #{} cancelled by user {}", booking_id, user_id);
    booking.status = BookingStatus::Cancelled;
    Ok(booking)
}

/// Переход `Pending -> Confirmed` для внешних участников, откладывающих подтверждение.
pub async fn confirm_pending<S: BookingStore>(store: &S, booking_id: i64) -> Result<Booking> {
    let mut booking = store
        .get_booking(booking_id)
        .await?
        .ok_or_else(|| BookingError::not_found(format!("booking {booking_id}")))?
        .booking;

    let next = BookingStatus::Confirmed;
    let transition_error = |from| BookingError::InvalidTransition {
        id: booking_id,
        from,
        to: next,
    };

    if !booking.status.can_transition_to(next) {
        return Err(transition_error(booking.status));
    }
    if !store
        .transition_booking(booking_id, &[BookingStatus::Pending], next)
        .await?
    {
        let current = store
            .get_booking(booking_id)
            .await?
            .map(|d| d.booking.status)
            .unwrap_or(booking.status);
        return Err(transition_error(current));
    }

    info!("Booking #{} moved Pending -> Confirmed", booking_id);
    booking.status = next;
    Ok(booking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeatType;

    fn seat(id: i64, is_active: bool) -> Seat {
        Seat {
            id,
            bus_id: 1,
            seat_number: format!("1{}", char::from(b'A' + id as u8)),
            row: 1,
            column: id as i32,
            seat_type: SeatType::Window,
            is_active,
        }
    }

    #[test]
    fn resolves_exact_selection() {
        let seats = vec![seat(1, true), seat(2, true), seat(3, true)];
        let selected = resolve_seats(&seats, &[3, 1]).unwrap();
        assert_eq!(selected.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn rejects_empty_unknown_inactive_and_duplicate() {
        let seats = vec![seat(1, true), seat(2, false)];
        for requested in [vec![], vec![9], vec![2], vec![1, 1]] {
            assert!(
                matches!(
                    resolve_seats(&seats, &requested),
                    Err(BookingError::InvalidSeatSelection(_))
                ),
                "{requested:?} must be rejected"
            );
        }
    }

    #[test]
    fn conflicts_are_sorted_and_limited_to_request() {
        let booked: HashSet<i64> = [5, 3, 8].into_iter().collect();
        let requested = vec![seat(5, true), seat(4, true), seat(3, true)];
        assert_eq!(find_conflicts(&booked, &requested), vec![3, 5]);
        assert!(find_conflicts(&HashSet::new(), &requested).is_empty());
    }
}
