use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::Result;
use crate::services::allocator;
use crate::services::catalog::{self, SeatMap};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/trips/{id}/seats", get(seat_map))
}

#[derive(Debug, Deserialize)]
struct SeatMapQuery {
    travel_date: Option<NaiveDate>,
}

// Без даты показываем завтрашний день
fn default_travel_date() -> NaiveDate {
    let today = allocator::today();
    today.checked_add_days(Days::new(1)).unwrap_or(today)
}

// GET /api/trips/{id}/seats?travel_date=YYYY-MM-DD
async fn seat_map(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<i64>,
    Query(query): Query<SeatMapQuery>,
) -> Result<Json<SeatMap>> {
    let travel_date = query.travel_date.unwrap_or_else(default_travel_date);
    Ok(Json(catalog::seat_map(&state.store, trip_id, travel_date).await?))
}
