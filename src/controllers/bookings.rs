use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::{Booking, BookingDetails};
use crate::services::allocator::{self, BookingRequest, Quote};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/quote", post(quote))
        .route("/bookings/{id}", get(get_booking))
        .route("/bookings/{id}/cancel", post(cancel_booking))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateBookingRequest {
    trip_id: i64,
    travel_date: NaiveDate,
    #[validate(length(min = 1, max = 20))]
    seat_ids: Vec<i64>,
}

impl CreateBookingRequest {
    fn into_request(self, user: &AuthUser) -> BookingRequest {
        BookingRequest {
            user_id: user.user_id,
            trip_id: self.trip_id,
            travel_date: self.travel_date,
            seat_ids: self.seat_ids,
        }
    }
}

// POST /api/bookings/quote
async fn quote(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<Quote>> {
    req.validate()?;
    let req = req.into_request(&user);
    Ok(Json(allocator::quote_booking(&state.store, &req).await?))
}

// POST /api/bookings
async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingDetails>)> {
    req.validate()?;
    let req = req.into_request(&user);
    let details = allocator::confirm_booking(&state.store, &req).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

// GET /api/bookings
async fn list_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<Booking>>> {
    Ok(Json(allocator::user_bookings(&state.store, user.user_id).await?))
}

// GET /api/bookings/{id}
async fn get_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<i64>,
) -> Result<Json<BookingDetails>> {
    Ok(Json(
        allocator::booking_details(&state.store, booking_id, user.user_id).await?,
    ))
}

// POST /api/bookings/{id}/cancel
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<i64>,
) -> Result<Json<Booking>> {
    Ok(Json(
        allocator::cancel_booking(&state.store, booking_id, user.user_id).await?,
    ))
}
