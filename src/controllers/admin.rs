//! Управление справочниками и местами. Только для персонала (`is_staff`).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use super::{non_negative, weekdays};
use crate::error::{BookingError, Result};
use crate::middleware::AdminUser;
use crate::models::{
    Booking, BookingStatus, Bus, BusType, Location, NewBus, NewRoute, NewTrip, Route, ScheduledTrip, Seat,
    SeatLayout,
};
use crate::services::{allocator, catalog, layout};
use crate::store::BookingStore;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/locations", post(create_location))
        .route("/routes", post(create_route))
        .route("/buses", get(list_buses).post(create_bus))
        .route("/buses/{id}/seats", post(generate_seats))
        .route("/seats/{id}", patch(update_seat))
        .route("/trips", post(create_trip))
        .route("/bookings", get(list_bookings))
        .route("/bookings/{id}/confirm", post(confirm_booking))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateLocationRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(length(min = 1, max = 10))]
    code: String,
}

// POST /api/admin/locations
async fn create_location(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(req): Json<CreateLocationRequest>,
) -> Result<(StatusCode, Json<Location>)> {
    req.validate()?;
    let location = catalog::create_location(&state.store, &req.name, &req.code).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateRouteRequest {
    origin_id: i64,
    destination_id: i64,
    #[validate(custom(function = "non_negative"))]
    distance: Decimal,
    #[validate(custom(function = "non_negative"))]
    base_price: Decimal,
}

// POST /api/admin/routes
async fn create_route(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(req): Json<CreateRouteRequest>,
) -> Result<(StatusCode, Json<Route>)> {
    req.validate()?;
    let route = catalog::create_route(
        &state.store,
        NewRoute {
            origin_id: req.origin_id,
            destination_id: req.destination_id,
            distance: req.distance,
            base_price: req.base_price,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(route)))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateBusRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    bus_type: BusType,
    seat_layout: SeatLayout,
    /// Сразу сгенерировать места по схеме
    #[serde(default)]
    generate_seats: bool,
}

// POST /api/admin/buses
async fn create_bus(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(req): Json<CreateBusRequest>,
) -> Result<(StatusCode, Json<Bus>)> {
    req.validate()?;

    let bus = catalog::create_bus(
        &state.store,
        NewBus {
            name: req.name,
            bus_type: req.bus_type,
            total_seats: 0,
            seat_layout: req.seat_layout,
        },
    )
    .await?;

    if !req.generate_seats {
        return Ok((StatusCode::CREATED, Json(bus)));
    }

    layout::regenerate_seats(&state.store, bus.id).await?;
    let bus = state
        .store
        .get_bus(bus.id)
        .await?
        .ok_or_else(|| BookingError::not_found(format!("bus {}", bus.id)))?;
    Ok((StatusCode::CREATED, Json(bus)))
}

// GET /api/admin/buses
async fn list_buses(State(state): State<Arc<AppState>>, _admin: AdminUser) -> Result<Json<Vec<Bus>>> {
    Ok(Json(state.store.list_buses().await?))
}

// POST /api/admin/buses/{id}/seats
async fn generate_seats(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(bus_id): Path<i64>,
) -> Result<(StatusCode, Json<Vec<Seat>>)> {
    let seats = layout::regenerate_seats(&state.store, bus_id).await?;
    info!("Seats of bus {} regenerated by {}", bus_id, admin.email);
    Ok((StatusCode::CREATED, Json(seats)))
}

#[derive(Debug, Deserialize)]
struct UpdateSeatRequest {
    is_active: bool,
}

// PATCH /api/admin/seats/{id}
async fn update_seat(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(seat_id): Path<i64>,
    Json(req): Json<UpdateSeatRequest>,
) -> Result<Json<Seat>> {
    let seat = state
        .store
        .set_seat_active(seat_id, req.is_active)
        .await?
        .ok_or_else(|| BookingError::not_found(format!("seat {seat_id}")))?;
    info!("Seat {} ({}) active = {}", seat.id, seat.seat_number, seat.is_active);
    Ok(Json(seat))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateTripRequest {
    route_id: i64,
    bus_id: i64,
    departure_time: NaiveTime,
    arrival_time: NaiveTime,
    #[validate(custom(function = "weekdays"))]
    available_days: Vec<u8>,
}

// POST /api/admin/trips
async fn create_trip(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(req): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<ScheduledTrip>)> {
    req.validate()?;
    let trip = catalog::create_trip(
        &state.store,
        NewTrip {
            route_id: req.route_id,
            bus_id: req.bus_id,
            departure_time: req.departure_time,
            arrival_time: req.arrival_time,
            available_days: req.available_days,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

#[derive(Debug, Deserialize)]
struct BookingsQuery {
    status: Option<BookingStatus>,
}

// GET /api/admin/bookings?status=Pending
async fn list_bookings(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>> {
    Ok(Json(state.store.list_bookings(query.status).await?))
}

// POST /api/admin/bookings/{id}/confirm
async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(booking_id): Path<i64>,
) -> Result<Json<Booking>> {
    Ok(Json(allocator::confirm_pending(&state.store, booking_id).await?))
}
