use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::warn;

use super::{seats_key, CacheService, ROUTES_KEY};
use crate::error::Result;
use crate::models::{
    Booking, BookingDetails, BookingStatus, Bus, Location, NewBus, NewRoute, NewSeat, NewTrip,
    Route, RouteFilter, ScheduledTrip, Seat, TripDetails,
};
use crate::store::BookingStore;

/// Хранилище с read-through кешем в Redis для списка мест автобуса и
/// полного списка маршрутов. Остальное проксируется как есть.
///
/// Сбой Redis не ломает запрос: логируем и идём в хранилище.
#[derive(Clone)]
pub struct CachedStore<S> {
    inner: S,
    cache: CacheService,
}

impl<S: BookingStore> CachedStore<S> {
    pub fn new(inner: S, cache: CacheService) -> Self {
        Self { inner, cache }
    }

    /// Прогрев кеша при старте: список маршрутов.
    pub async fn warmup(&self) {
        match self.list_routes(&RouteFilter::default()).await {
            Ok(routes) => tracing::info!("Cache warmup done: {} routes", routes.len()),
            Err(e) => warn!("Cache warmup failed: {}", e),
        }
    }
}

impl<S: BookingStore> BookingStore for CachedStore<S> {
    type Tx = S::Tx;

    async fn create_location(&self, name: &str, code: &str) -> Result<Location> {
        self.inner.create_location(name, code).await
    }

    async fn get_location(&self, id: i64) -> Result<Option<Location>> {
        self.inner.get_location(id).await
    }

    async fn list_locations(&self) -> Result<Vec<Location>> {
        self.inner.list_locations().await
    }

    async fn create_route(&self, route: &NewRoute) -> Result<Route> {
        let route = self.inner.create_route(route).await?;
        self.cache.invalidate(ROUTES_KEY).await;
        Ok(route)
    }

    async fn get_route(&self, id: i64) -> Result<Option<Route>> {
        self.inner.get_route(id).await
    }

    async fn list_routes(&self, filter: &RouteFilter) -> Result<Vec<Route>> {
        if !filter.is_empty() {
            return self.inner.list_routes(filter).await;
        }

        match self.cache.get_json::<Vec<Route>>(ROUTES_KEY).await {
            Ok(Some(routes)) => return Ok(routes),
            Ok(None) => {}
            Err(e) => warn!("Routes cache read failed: {:?}", e),
        }

        let routes = self.inner.list_routes(filter).await?;
        if let Err(e) = self.cache.set_json(ROUTES_KEY, &routes, self.cache.routes_ttl).await {
            warn!("Failed to cache routes: {:?}", e);
        }
        Ok(routes)
    }

    async fn create_bus(&self, bus: &NewBus) -> Result<Bus> {
        self.inner.create_bus(bus).await
    }

    async fn get_bus(&self, id: i64) -> Result<Option<Bus>> {
        self.inner.get_bus(id).await
    }

    async fn list_buses(&self) -> Result<Vec<Bus>> {
        self.inner.list_buses().await
    }

    async fn create_trip(&self, trip: &NewTrip) -> Result<ScheduledTrip> {
        self.inner.create_trip(trip).await
    }

    async fn get_trip(&self, id: i64) -> Result<Option<TripDetails>> {
        self.inner.get_trip(id).await
    }

    async fn trips_for_route(&self, route_id: i64) -> Result<Vec<TripDetails>> {
        self.inner.trips_for_route(route_id).await
    }

    async fn seats_for_bus(&self, bus_id: i64) -> Result<Vec<Seat>> {
        let key = seats_key(bus_id);
        match self.cache.get_json::<Vec<Seat>>(&key).await {
            Ok(Some(seats)) => return Ok(seats),
            Ok(None) => {}
            Err(e) => warn!("Seats cache read failed for bus {}: {:?}", bus_id, e),
        }

        let seats = self.inner.seats_for_bus(bus_id).await?;
        if let Err(e) = self.cache.set_json(&key, &seats, self.cache.seats_ttl).await {
            warn!("Failed to cache seats for bus {}: {:?}", bus_id, e);
        }
        Ok(seats)
    }

    async fn replace_seats(&self, bus_id: i64, seats: &[NewSeat]) -> Result<Vec<Seat>> {
        let created = self.inner.replace_seats(bus_id, seats).await?;
        self.cache.invalidate(&seats_key(bus_id)).await;
        Ok(created)
    }

    async fn set_seat_active(&self, seat_id: i64, is_active: bool) -> Result<Option<Seat>> {
        let seat = self.inner.set_seat_active(seat_id, is_active).await?;
        if let Some(seat) = &seat {
            self.cache.invalidate(&seats_key(seat.bus_id)).await;
        }
        Ok(seat)
    }

    async fn booked_seat_ids(&self, trip_id: i64, travel_date: NaiveDate) -> Result<HashSet<i64>> {
        self.inner.booked_seat_ids(trip_id, travel_date).await
    }

    async fn begin_trip(&self, trip_id: i64) -> Result<Self::Tx> {
        self.inner.begin_trip(trip_id).await
    }

    async fn get_booking(&self, id: i64) -> Result<Option<BookingDetails>> {
        self.inner.get_booking(id).await
    }

    async fn bookings_for_user(&self, user_id: i64) -> Result<Vec<Booking>> {
        self.inner.bookings_for_user(user_id).await
    }

    async fn list_bookings(&self, status: Option<BookingStatus>) -> Result<Vec<Booking>> {
        self.inner.list_bookings(status).await
    }

    async fn transition_booking(
        &self,
        id: i64,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> Result<bool> {
        self.inner.transition_booking(id, from, to).await
    }
}
