use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{BookingStore, TripTransaction};
use crate::error::{BookingError, Result};
use crate::models::{
    Booking, BookingDetails, BookingSeat, BookingStatus, Bus, Location, NewBooking, NewBus,
    NewRoute, NewSeat, NewTrip, Route, RouteFilter, ScheduledTrip, Seat, TripDetails,
};

/// Хранилище в памяти с теми же ограничениями уникальности, что и схема Postgres.
///
/// Все операции сериализуются одним мьютексом; транзакция рейса держит его
/// до `commit` или до drop.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    last_id: i64,
    locations: BTreeMap<i64, Location>,
    routes: BTreeMap<i64, RouteRecord>,
    buses: BTreeMap<i64, Bus>,
    trips: BTreeMap<i64, ScheduledTrip>,
    seats: BTreeMap<i64, Seat>,
    bookings: BTreeMap<i64, Booking>,
    booking_seats: Vec<BookingSeat>,
}

#[derive(Clone)]
struct RouteRecord {
    id: i64,
    origin_id: i64,
    destination_id: i64,
    distance: rust_decimal::Decimal,
    base_price: rust_decimal::Decimal,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Количество строк брони (для проверок в тестах).
    pub async fn booking_seat_count(&self) -> usize {
        self.state.lock().await.booking_seats.len()
    }
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn route(&self, id: i64) -> Option<Route> {
        let record = self.routes.get(&id)?;
        Some(Route {
            id: record.id,
            origin: self.locations.get(&record.origin_id)?.clone(),
            destination: self.locations.get(&record.destination_id)?.clone(),
            distance: record.distance,
            base_price: record.base_price,
        })
    }

    fn trip_details(&self, trip: &ScheduledTrip) -> Option<TripDetails> {
        Some(TripDetails {
            trip: trip.clone(),
            route: self.route(trip.route_id)?,
            bus: self.buses.get(&trip.bus_id)?.clone(),
        })
    }

    fn booked_seat_ids(&self, trip_id: i64, travel_date: NaiveDate) -> HashSet<i64> {
        let live: HashSet<i64> = self
            .bookings
            .values()
            .filter(|b| {
                b.scheduled_trip_id == trip_id
                    && b.travel_date == travel_date
                    && b.status.holds_seats()
            })
            .map(|b| b.id)
            .collect();

        self.booking_seats
            .iter()
            .filter(|line| live.contains(&line.booking_id))
            .map(|line| line.seat_id)
            .collect()
    }

    fn booking_details(&self, booking: &Booking) -> BookingDetails {
        let mut seats: Vec<BookingSeat> = self
            .booking_seats
            .iter()
            .filter(|line| line.booking_id == booking.id)
            .cloned()
            .collect();
        seats.sort_by_key(|line| {
            self.seats
                .get(&line.seat_id)
                .map(|s| (s.row, s.column))
                .unwrap_or_default()
        });
        BookingDetails {
            booking: booking.clone(),
            seats,
        }
    }
}

impl BookingStore for MemoryStore {
    type Tx = MemoryTripTransaction;

    async fn create_location(&self, name: &str, code: &str) -> Result<Location> {
        let mut state = self.state.lock().await;
        if state.locations.values().any(|l| l.code == code) {
            return Err(BookingError::Duplicate(format!("location {code}")));
        }
        let location = Location {
            id: state.next_id(),
            name: name.to_string(),
            code: code.to_string(),
        };
        state.locations.insert(location.id, location.clone());
        Ok(location)
    }

    async fn get_location(&self, id: i64) -> Result<Option<Location>> {
        Ok(self.state.lock().await.locations.get(&id).cloned())
    }

    async fn list_locations(&self) -> Result<Vec<Location>> {
        let state = self.state.lock().await;
        let mut locations: Vec<Location> = state.locations.values().cloned().collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locations)
    }

    async fn create_route(&self, route: &NewRoute) -> Result<Route> {
        let mut state = self.state.lock().await;
        for id in [route.origin_id, route.destination_id] {
            if !state.locations.contains_key(&id) {
                return Err(BookingError::not_found(format!("location {id}")));
            }
        }
        if state
            .routes
            .values()
            .any(|r| r.origin_id == route.origin_id && r.destination_id == route.destination_id)
        {
            return Err(BookingError::Duplicate(format!(
                "route {} -> {}",
                route.origin_id, route.destination_id
            )));
        }
        let record = RouteRecord {
            id: state.next_id(),
            origin_id: route.origin_id,
            destination_id: route.destination_id,
            distance: route.distance,
            base_price: route.base_price,
        };
        state.routes.insert(record.id, record.clone());
        state
            .route(record.id)
            .ok_or_else(|| BookingError::Internal("route vanished after insert".into()))
    }

    async fn get_route(&self, id: i64) -> Result<Option<Route>> {
        Ok(self.state.lock().await.route(id))
    }

    async fn list_routes(&self, filter: &RouteFilter) -> Result<Vec<Route>> {
        let state = self.state.lock().await;
        let mut routes: Vec<Route> = state
            .routes
            .keys()
            .filter_map(|id| state.route(*id))
            .filter(|r| filter.matches(r))
            .collect();
        routes.sort_by(|a, b| {
            (&a.origin.name, &a.destination.name).cmp(&(&b.origin.name, &b.destination.name))
        });
        Ok(routes)
    }

    async fn create_bus(&self, bus: &NewBus) -> Result<Bus> {
        let mut state = self.state.lock().await;
        let bus = Bus {
            id: state.next_id(),
            name: bus.name.clone(),
            bus_type: bus.bus_type,
            total_seats: bus.total_seats,
            seat_layout: bus.seat_layout,
        };
        state.buses.insert(bus.id, bus.clone());
        Ok(bus)
    }

    async fn get_bus(&self, id: i64) -> Result<Option<Bus>> {
        Ok(self.state.lock().await.buses.get(&id).cloned())
    }

    async fn list_buses(&self) -> Result<Vec<Bus>> {
        let state = self.state.lock().await;
        let mut buses: Vec<Bus> = state.buses.values().cloned().collect();
        buses.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
        Ok(buses)
    }

    async fn create_trip(&self, trip: &NewTrip) -> Result<ScheduledTrip> {
        let mut state = self.state.lock().await;
        if !state.routes.contains_key(&trip.route_id) {
            return Err(BookingError::not_found(format!("route {}", trip.route_id)));
        }
        if !state.buses.contains_key(&trip.bus_id) {
            return Err(BookingError::not_found(format!("bus {}", trip.bus_id)));
        }
        if state.trips.values().any(|t| {
            t.route_id == trip.route_id
                && t.bus_id == trip.bus_id
                && t.departure_time == trip.departure_time
        }) {
            return Err(BookingError::Duplicate(format!(
                "trip of bus {} at {}",
                trip.bus_id, trip.departure_time
            )));
        }
        let trip = ScheduledTrip {
            id: state.next_id(),
            route_id: trip.route_id,
            bus_id: trip.bus_id,
            departure_time: trip.departure_time,
            arrival_time: trip.arrival_time,
            available_days: trip.available_days.clone(),
        };
        state.trips.insert(trip.id, trip.clone());
        Ok(trip)
    }

    async fn get_trip(&self, id: i64) -> Result<Option<TripDetails>> {
        let state = self.state.lock().await;
        Ok(state.trips.get(&id).and_then(|t| state.trip_details(t)))
    }

    async fn trips_for_route(&self, route_id: i64) -> Result<Vec<TripDetails>> {
        let state = self.state.lock().await;
        let mut trips: Vec<TripDetails> = state
            .trips
            .values()
            .filter(|t| t.route_id == route_id)
            .filter_map(|t| state.trip_details(t))
            .collect();
        trips.sort_by_key(|d| (d.trip.departure_time, d.trip.id));
        Ok(trips)
    }

    async fn seats_for_bus(&self, bus_id: i64) -> Result<Vec<Seat>> {
        let state = self.state.lock().await;
        let mut seats: Vec<Seat> = state
            .seats
            .values()
            .filter(|s| s.bus_id == bus_id)
            .cloned()
            .collect();
        seats.sort_by_key(|s| (s.row, s.column));
        Ok(seats)
    }

    async fn replace_seats(&self, bus_id: i64, seats: &[NewSeat]) -> Result<Vec<Seat>> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if !state.buses.contains_key(&bus_id) {
            return Err(BookingError::not_found(format!("bus {bus_id}")));
        }

        let referenced = state.booking_seats.iter().any(|line| {
            state
                .seats
                .get(&line.seat_id)
                .is_some_and(|s| s.bus_id == bus_id)
        });
        if referenced {
            return Err(BookingError::SeatsInUse(bus_id));
        }

        state.seats.retain(|_, s| s.bus_id != bus_id);
        let mut created = Vec::with_capacity(seats.len());
        for seat in seats {
            let seat = Seat {
                id: state.next_id(),
                bus_id,
                seat_number: seat.seat_number.clone(),
                row: seat.row,
                column: seat.column,
                seat_type: seat.seat_type,
                is_active: true,
            };
            state.seats.insert(seat.id, seat.clone());
            created.push(seat);
        }
        if let Some(bus) = state.buses.get_mut(&bus_id) {
            bus.total_seats = created.len() as i32;
        }
        Ok(created)
    }

    async fn set_seat_active(&self, seat_id: i64, is_active: bool) -> Result<Option<Seat>> {
        let mut state = self.state.lock().await;
        Ok(state.seats.get_mut(&seat_id).map(|seat| {
            seat.is_active = is_active;
            seat.clone()
        }))
    }

    async fn booked_seat_ids(&self, trip_id: i64, travel_date: NaiveDate) -> Result<HashSet<i64>> {
        Ok(self.state.lock().await.booked_seat_ids(trip_id, travel_date))
    }

    async fn begin_trip(&self, trip_id: i64) -> Result<Self::Tx> {
        let guard = self.state.clone().lock_owned().await;
        if !guard.trips.contains_key(&trip_id) {
            return Err(BookingError::not_found(format!("trip {trip_id}")));
        }
        Ok(MemoryTripTransaction {
            guard,
            trip_id,
            pending: Vec::new(),
        })
    }

    async fn get_booking(&self, id: i64) -> Result<Option<BookingDetails>> {
        let state = self.state.lock().await;
        Ok(state.bookings.get(&id).map(|b| state.booking_details(b)))
    }

    async fn bookings_for_user(&self, user_id: i64) -> Result<Vec<Booking>> {
        let state = self.state.lock().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(bookings)
    }

    async fn list_bookings(&self, status: Option<BookingStatus>) -> Result<Vec<Booking>> {
        let state = self.state.lock().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| status.map_or(true, |s| b.status == s))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(bookings)
    }

    async fn transition_booking(
        &self,
        id: i64,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.bookings.get_mut(&id) {
            Some(booking) if from.contains(&booking.status) => {
                booking.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

pub struct MemoryTripTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    trip_id: i64,
    pending: Vec<(Booking, Vec<BookingSeat>)>,
}

impl TripTransaction for MemoryTripTransaction {
    async fn active_seats(&mut self, bus_id: i64, seat_ids: &[i64]) -> Result<Vec<Seat>> {
        let mut seats: Vec<Seat> = seat_ids
            .iter()
            .filter_map(|id| self.guard.seats.get(id))
            .filter(|s| s.bus_id == bus_id && s.is_active)
            .cloned()
            .collect();
        seats.sort_by_key(|s| (s.row, s.column));
        seats.dedup_by_key(|s| s.id);
        Ok(seats)
    }

    async fn booked_seat_ids(&mut self, travel_date: NaiveDate) -> Result<HashSet<i64>> {
        let mut booked = self.guard.booked_seat_ids(self.trip_id, travel_date);
        for (booking, lines) in &self.pending {
            if booking.travel_date == travel_date && booking.status.holds_seats() {
                booked.extend(lines.iter().map(|l| l.seat_id));
            }
        }
        Ok(booked)
    }

    async fn insert_booking(&mut self, new: &NewBooking) -> Result<BookingDetails> {
        if new.scheduled_trip_id != self.trip_id {
            return Err(BookingError::Internal(format!(
                "booking for trip {} inside transaction of trip {}",
                new.scheduled_trip_id, self.trip_id
            )));
        }
        for line in &new.seats {
            if !self.guard.seats.contains_key(&line.seat_id) {
                return Err(BookingError::not_found(format!("seat {}", line.seat_id)));
            }
        }

        let booking = Booking {
            id: self.guard.next_id(),
            user_id: new.user_id,
            scheduled_trip_id: new.scheduled_trip_id,
            booking_date: new.booking_date,
            travel_date: new.travel_date,
            total_price: new.total_price,
            status: new.status,
            created_at: Utc::now(),
        };
        let mut lines = Vec::with_capacity(new.seats.len());
        for seat in &new.seats {
            lines.push(BookingSeat {
                id: self.guard.next_id(),
                booking_id: booking.id,
                seat_id: seat.seat_id,
                seat_number: seat.seat_number.clone(),
                price: seat.price,
            });
        }
        self.pending.push((booking.clone(), lines.clone()));
        Ok(BookingDetails {
            booking,
            seats: lines,
        })
    }

    async fn commit(mut self) -> Result<()> {
        for (booking, lines) in std::mem::take(&mut self.pending) {
            self.guard.bookings.insert(booking.id, booking);
            self.guard.booking_seats.extend(lines);
        }
        Ok(())
    }
}
