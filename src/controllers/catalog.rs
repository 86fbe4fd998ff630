use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{Location, Route, RouteFilter};
use crate::services::catalog::{self, TripOffer};
use crate::store::BookingStore;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/locations", get(list_locations))
        .route("/routes", get(list_routes))
        .route("/routes/{id}/trips", get(route_trips))
}

// GET /api/locations
async fn list_locations(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Location>>> {
    Ok(Json(state.store.list_locations().await?))
}

// GET /api/routes?search=&origin=&destination=
async fn list_routes(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<RouteFilter>,
) -> Result<Json<Vec<Route>>> {
    Ok(Json(catalog::list_routes(&state.store, &filter).await?))
}

#[derive(Debug, Deserialize)]
struct TripsQuery {
    travel_date: Option<NaiveDate>,
}

// GET /api/routes/{id}/trips?travel_date=YYYY-MM-DD
async fn route_trips(
    State(state): State<Arc<AppState>>,
    Path(route_id): Path<i64>,
    Query(query): Query<TripsQuery>,
) -> Result<Json<Vec<TripOffer>>> {
    Ok(Json(
        catalog::trips_for_route(&state.store, route_id, query.travel_date).await?,
    ))
}
