//! Справочники (пункты, маршруты, автобусы, рейсы) и схема мест рейса на дату.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::error::{BookingError, Result};
use crate::models::{
    Bus, Location, NewBus, NewRoute, NewTrip, Route, RouteFilter, ScheduledTrip, Seat, SeatLayout,
    SeatType, TripDetails,
};
use crate::services::pricing;
use crate::store::BookingStore;

/// Рейс в выдаче по маршруту вместе с ценой места.
#[derive(Debug, Clone, Serialize)]
pub struct TripOffer {
    pub trip: ScheduledTrip,
    pub bus: Bus,
    pub price_per_seat: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeatCell {
    pub seat_id: i64,
    pub seat_number: String,
    pub seat_type: SeatType,
    pub is_booked: bool,
}

/// Ряд схемы: ячейки слева и справа от прохода в порядке колонок.
/// `None`: в этой позиции нет активного места.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeatRow {
    pub row: u32,
    pub left: Vec<Option<SeatCell>>,
    pub right: Vec<Option<SeatCell>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatMap {
    pub trip: TripDetails,
    pub travel_date: NaiveDate,
    pub price_per_seat: Decimal,
    pub rows: Vec<SeatRow>,
}

impl SeatMap {
    pub fn cells(&self) -> impl Iterator<Item = &SeatCell> {
        self.rows
            .iter()
            .flat_map(|r| r.left.iter().chain(r.right.iter()))
            .flatten()
    }

    pub fn free_seats(&self) -> usize {
        self.cells().filter(|c| !c.is_booked).count()
    }
}

/* ---------- справочники ---------- */

pub async fn create_location<S: BookingStore>(store: &S, name: &str, code: &str) -> Result<Location> {
    let name = name.trim();
    let code = code.trim().to_uppercase();
    if name.is_empty() || code.is_empty() {
        return Err(BookingError::InvalidInput("location name and code are required".into()));
    }
    let location = store.create_location(name, &code).await?;
    info!("Location created: {}", location);
    Ok(location)
}

pub async fn create_route<S: BookingStore>(store: &S, route: NewRoute) -> Result<Route> {
    if route.origin_id == route.destination_id {
        return Err(BookingError::InvalidInput(
            "origin and destination must differ".into(),
        ));
    }
    if route.distance.is_sign_negative() || route.base_price.is_sign_negative() {
        return Err(BookingError::InvalidInput(
            "distance and base price must be non-negative".into(),
        ));
    }
    for id in [route.origin_id, route.destination_id] {
        if store.get_location(id).await?.is_none() {
            return Err(BookingError::not_found(format!("location {id}")));
        }
    }
    let route = store
        .create_route(&NewRoute {
            base_price: route.base_price.round_dp(2),
            distance: route.distance.round_dp(2),
            ..route
        })
        .await?;
    info!("Route created: #{} {}", route.id, route);
    Ok(route)
}

pub async fn create_bus<S: BookingStore>(store: &S, bus: NewBus) -> Result<Bus> {
    if bus.name.trim().is_empty() {
        return Err(BookingError::InvalidInput("bus name is required".into()));
    }
    if bus.total_seats < 0 {
        return Err(BookingError::InvalidInput("total_seats must be non-negative".into()));
    }
    // Нулевая схема допустима: места зададут позже
    if bus.seat_layout != SeatLayout::default() {
        bus.seat_layout.validate()?;
    }
    let bus = store.create_bus(&bus).await?;
    info!("Bus created: #{} {} ({})", bus.id, bus.name, bus.bus_type);
    Ok(bus)
}

pub async fn create_trip<S: BookingStore>(store: &S, trip: NewTrip) -> Result<ScheduledTrip> {
    if let Some(day) = trip.available_days.iter().find(|d| **d > 6) {
        return Err(BookingError::InvalidInput(format!(
            "weekday {day} is out of range 0..=6"
        )));
    }
    if store.get_route(trip.route_id).await?.is_none() {
        return Err(BookingError::not_found(format!("route {}", trip.route_id)));
    }
    if store.get_bus(trip.bus_id).await?.is_none() {
        return Err(BookingError::not_found(format!("bus {}", trip.bus_id)));
    }

    let mut days = trip.available_days.clone();
    days.sort_unstable();
    days.dedup();

    let trip = store
        .create_trip(&NewTrip {
            available_days: days,
            ..trip
        })
        .await?;
    info!(
        "Trip created: #{} route {} bus {} at {}",
        trip.id, trip.route_id, trip.bus_id, trip.departure_time
    );
    Ok(trip)
}

pub async fn list_routes<S: BookingStore>(store: &S, filter: &RouteFilter) -> Result<Vec<Route>> {
    store.list_routes(filter).await
}

/// Рейсы маршрута с ценой; с датой только те, что ходят в этот день недели.
pub async fn trips_for_route<S: BookingStore>(
    store: &S,
    route_id: i64,
    travel_date: Option<NaiveDate>,
) -> Result<Vec<TripOffer>> {
    if store.get_route(route_id).await?.is_none() {
        return Err(BookingError::not_found(format!("route {route_id}")));
    }

    let offers = store
        .trips_for_route(route_id)
        .await?
        .into_iter()
        .filter(|d| travel_date.map_or(true, |date| d.trip.runs_on(date)))
        .map(|d| TripOffer {
            price_per_seat: pricing::price_per_seat(d.route.base_price, d.bus.bus_type),
            trip: d.trip,
            bus: d.bus,
        })
        .collect();
    Ok(offers)
}

/* ---------- схема мест ---------- */

/// Раскладывает места по рядам схемы салона и помечает занятые.
pub fn build_rows(trip: &TripDetails, seats: &[Seat], booked: &HashSet<i64>) -> Vec<SeatRow> {
    let by_position: HashMap<(i32, i32), &Seat> = seats
        .iter()
        .filter(|s| s.is_active)
        .map(|s| ((s.row, s.column), s))
        .collect();

    let layout = trip.bus.seat_layout;
    // Схема из хранилища могла не пройти проверку: рисуем только существующие места
    if layout.validate().is_err() {
        return Vec::new();
    }
    let (left, right) = layout.cols_per_side;
    let cell = |row: u32, col: u32| {
        by_position
            .get(&(row as i32, col as i32))
            .map(|seat| SeatCell {
                seat_id: seat.id,
                seat_number: seat.seat_number.clone(),
                seat_type: seat.seat_type,
                is_booked: booked.contains(&seat.id),
            })
    };

    (1..=layout.rows)
        .map(|row| SeatRow {
            row,
            left: (1..=left).map(|col| cell(row, col)).collect(),
            right: (left + 1..=left + right).map(|col| cell(row, col)).collect(),
        })
        .collect()
}

pub async fn seat_map<S: BookingStore>(store: &S, trip_id: i64, travel_date: NaiveDate) -> Result<SeatMap> {
    let trip = store
        .get_trip(trip_id)
        .await?
        .ok_or_else(|| BookingError::not_found(format!("trip {trip_id}")))?;

    let (seats, booked) = futures::try_join!(
        store.seats_for_bus(trip.bus.id),
        store.booked_seat_ids(trip_id, travel_date),
    )?;

    let rows = build_rows(&trip, &seats, &booked);
    Ok(SeatMap {
        price_per_seat: pricing::price_per_seat(trip.route.base_price, trip.bus.bus_type),
        trip,
        travel_date,
        rows,
    })
}
