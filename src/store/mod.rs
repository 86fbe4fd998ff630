//! Граница хранилища.
//!
//! Сервисы работают только через [`BookingStore`]; реализации:
//! - [`PgStore`]: Postgres через sqlx;
//! - [`MemoryStore`]: всё в памяти, для тестов и локальных прогонов.
//!
//! Проверка занятости мест и вставка брони выполняются внутри
//! [`TripTransaction`], которая держит взаимоисключение по рейсу до `commit`.
//! Транзакция, брошенная без `commit`, ничего не сохраняет.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use chrono::NaiveDate;
use std::collections::HashSet;
use std::future::Future;

use crate::error::Result;
use crate::models::{
    Booking, BookingDetails, BookingStatus, Bus, Location, NewBooking, NewBus, NewRoute, NewSeat,
    NewTrip, Route, RouteFilter, ScheduledTrip, Seat, TripDetails,
};

pub trait BookingStore: Send + Sync {
    type Tx: TripTransaction;

    // --- справочники ---

    fn create_location(&self, name: &str, code: &str) -> impl Future<Output = Result<Location>> + Send;

    fn get_location(&self, id: i64) -> impl Future<Output = Result<Option<Location>>> + Send;

    /// Все пункты, по алфавиту.
    fn list_locations(&self) -> impl Future<Output = Result<Vec<Location>>> + Send;

    fn create_route(&self, route: &NewRoute) -> impl Future<Output = Result<Route>> + Send;

    fn get_route(&self, id: i64) -> impl Future<Output = Result<Option<Route>>> + Send;

    /// Маршруты под фильтр, упорядоченные по названиям пунктов отправления и назначения.
    fn list_routes(&self, filter: &RouteFilter) -> impl Future<Output = Result<Vec<Route>>> + Send;

    fn create_bus(&self, bus: &NewBus) -> impl Future<Output = Result<Bus>> + Send;

    fn get_bus(&self, id: i64) -> impl Future<Output = Result<Option<Bus>>> + Send;

    /// Все автобусы, по имени.
    fn list_buses(&self) -> impl Future<Output = Result<Vec<Bus>>> + Send;

    fn create_trip(&self, trip: &NewTrip) -> impl Future<Output = Result<ScheduledTrip>> + Send;

    fn get_trip(&self, id: i64) -> impl Future<Output = Result<Option<TripDetails>>> + Send;

    /// Рейсы маршрута по времени отправления.
    fn trips_for_route(&self, route_id: i64) -> impl Future<Output = Result<Vec<TripDetails>>> + Send;

    // --- места ---

    /// Все места автобуса (включая неактивные), по ряду и колонке.
    fn seats_for_bus(&self, bus_id: i64) -> impl Future<Output = Result<Vec<Seat>>> + Send;

    /// Атомарно заменяет места автобуса и выставляет `total_seats`.
    ///
    /// Отказывает с `SeatsInUse`, если на какое-либо место автобуса есть строка брони.
    fn replace_seats(&self, bus_id: i64, seats: &[NewSeat]) -> impl Future<Output = Result<Vec<Seat>>> + Send;

    fn set_seat_active(&self, seat_id: i64, is_active: bool) -> impl Future<Output = Result<Option<Seat>>> + Send;

    // --- брони ---

    /// Места, занятые бронями `Pending`/`Confirmed` на рейс и дату (вне транзакции).
    fn booked_seat_ids(&self, trip_id: i64, travel_date: NaiveDate) -> impl Future<Output = Result<HashSet<i64>>> + Send;

    /// Открывает транзакцию с взаимоисключением по рейсу. `NotFound`, если рейса нет.
    fn begin_trip(&self, trip_id: i64) -> impl Future<Output = Result<Self::Tx>> + Send;

    fn get_booking(&self, id: i64) -> impl Future<Output = Result<Option<BookingDetails>>> + Send;

    /// Брони пользователя, новые первыми.
    fn bookings_for_user(&self, user_id: i64) -> impl Future<Output = Result<Vec<Booking>>> + Send;

    /// Все брони (опционально с одним статусом), новые первыми.
    fn list_bookings(&self, status: Option<BookingStatus>) -> impl Future<Output = Result<Vec<Booking>>> + Send;

    /// Условная смена статуса: срабатывает, только если текущий статус входит в `from`.
    /// Возвращает `true`, если строка обновлена.
    fn transition_booking(
        &self,
        id: i64,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Транзакция по одному рейсу. Пока она жива, другие транзакции того же рейса ждут.
pub trait TripTransaction: Send {
    /// Активные места автобуса среди `seat_ids`, прочитанные внутри транзакции
    /// в обход кеша.
    fn active_seats(&mut self, bus_id: i64, seat_ids: &[i64]) -> impl Future<Output = Result<Vec<Seat>>> + Send;

    fn booked_seat_ids(&mut self, travel_date: NaiveDate) -> impl Future<Output = Result<HashSet<i64>>> + Send;

    fn insert_booking(&mut self, booking: &NewBooking) -> impl Future<Output = Result<BookingDetails>> + Send;

    fn commit(self) -> impl Future<Output = Result<()>> + Send;
}
