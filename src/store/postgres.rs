use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, FromRow, PgPool, Postgres, Transaction};
use std::collections::HashSet;
use tracing::debug;

use super::{BookingStore, TripTransaction};
use crate::error::{map_unique_violation, BookingError, Result};
use crate::models::{
    Booking, BookingDetails, BookingSeat, BookingStatus, Bus, Location, NewBooking, NewBus,
    NewRoute, NewSeat, NewTrip, Route, RouteFilter, ScheduledTrip, Seat, SeatLayout, TripDetails,
};

/* ---------- SQL ---------- */

const ROUTE_SELECT: &str = r#"
    SELECT r.id, r.distance, r.base_price,
           o.id AS origin_id, o.name AS origin_name, o.code AS origin_code,
           d.id AS destination_id, d.name AS destination_name, d.code AS destination_code
    FROM routes r
    JOIN locations o ON o.id = r.origin_id
    JOIN locations d ON d.id = r.destination_id
"#;

const TRIP_SELECT: &str = r#"
    SELECT t.id, t.route_id, t.bus_id, t.departure_time, t.arrival_time, t.available_days,
           r.distance, r.base_price,
           o.id AS origin_id, o.name AS origin_name, o.code AS origin_code,
           d.id AS destination_id, d.name AS destination_name, d.code AS destination_code,
           b.name AS bus_name, b.bus_type, b.total_seats, b.seat_layout
    FROM scheduled_trips t
    JOIN routes r ON r.id = t.route_id
    JOIN locations o ON o.id = r.origin_id
    JOIN locations d ON d.id = r.destination_id
    JOIN buses b ON b.id = t.bus_id
"#;

const SEAT_COLUMNS: &str = "id, bus_id, seat_number, seat_row, seat_col, seat_type, is_active";

const BOOKING_COLUMNS: &str =
    "id, user_id, scheduled_trip_id, booking_date, travel_date, total_price, status, created_at";

/* ---------- строки БД ---------- */

#[derive(FromRow)]
struct RouteRow {
    id: i64,
    distance: Decimal,
    base_price: Decimal,
    origin_id: i64,
    origin_name: String,
    origin_code: String,
    destination_id: i64,
    destination_name: String,
    destination_code: String,
}

impl From<RouteRow> for Route {
    fn from(row: RouteRow) -> Self {
        Route {
            id: row.id,
            origin: Location {
                id: row.origin_id,
                name: row.origin_name,
                code: row.origin_code,
            },
            destination: Location {
                id: row.destination_id,
                name: row.destination_name,
                code: row.destination_code,
            },
            distance: row.distance,
            base_price: row.base_price,
        }
    }
}

#[derive(FromRow)]
struct BusRow {
    id: i64,
    name: String,
    bus_type: String,
    total_seats: i32,
    seat_layout: Json<SeatLayout>,
}

impl TryFrom<BusRow> for Bus {
    type Error = BookingError;

    fn try_from(row: BusRow) -> Result<Self> {
        Ok(Bus {
            id: row.id,
            name: row.name,
            bus_type: row.bus_type.parse()?,
            total_seats: row.total_seats,
            seat_layout: row.seat_layout.0,
        })
    }
}

#[derive(FromRow)]
struct TripRow {
    id: i64,
    route_id: i64,
    bus_id: i64,
    departure_time: NaiveTime,
    arrival_time: NaiveTime,
    available_days: Vec<i32>,
}

impl From<TripRow> for ScheduledTrip {
    fn from(row: TripRow) -> Self {
        ScheduledTrip {
            id: row.id,
            route_id: row.route_id,
            bus_id: row.bus_id,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            available_days: weekdays_from_db(&row.available_days),
        }
    }
}

#[derive(FromRow)]
struct TripDetailsRow {
    #[sqlx(flatten)]
    trip: TripRow,
    distance: Decimal,
    base_price: Decimal,
    origin_id: i64,
    origin_name: String,
    origin_code: String,
    destination_id: i64,
    destination_name: String,
    destination_code: String,
    bus_name: String,
    bus_type: String,
    total_seats: i32,
    seat_layout: Json<SeatLayout>,
}

impl TryFrom<TripDetailsRow> for TripDetails {
    type Error = BookingError;

    fn try_from(row: TripDetailsRow) -> Result<Self> {
        let route = Route::from(RouteRow {
            id: row.trip.route_id,
            distance: row.distance,
            base_price: row.base_price,
            origin_id: row.origin_id,
            origin_name: row.origin_name,
            origin_code: row.origin_code,
            destination_id: row.destination_id,
            destination_name: row.destination_name,
            destination_code: row.destination_code,
        });
        let bus = Bus::try_from(BusRow {
            id: row.trip.bus_id,
            name: row.bus_name,
            bus_type: row.bus_type,
            total_seats: row.total_seats,
            seat_layout: row.seat_layout,
        })?;
        Ok(TripDetails {
            trip: row.trip.into(),
            route,
            bus,
        })
    }
}

#[derive(FromRow)]
struct SeatRow {
    id: i64,
    bus_id: i64,
    seat_number: String,
    seat_row: i32,
    seat_col: i32,
    seat_type: String,
    is_active: bool,
}

impl TryFrom<SeatRow> for Seat {
    type Error = BookingError;

    fn try_from(row: SeatRow) -> Result<Self> {
        Ok(Seat {
            id: row.id,
            bus_id: row.bus_id,
            seat_number: row.seat_number,
            row: row.seat_row,
            column: row.seat_col,
            seat_type: row.seat_type.parse()?,
            is_active: row.is_active,
        })
    }
}

#[derive(FromRow)]
struct BookingRow {
    id: i64,
    user_id: i64,
    scheduled_trip_id: i64,
    booking_date: NaiveDate,
    travel_date: NaiveDate,
    total_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = BookingError;

    fn try_from(row: BookingRow) -> Result<Self> {
        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            scheduled_trip_id: row.scheduled_trip_id,
            booking_date: row.booking_date,
            travel_date: row.travel_date,
            total_price: row.total_price,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct BookingSeatRow {
    id: i64,
    booking_id: i64,
    seat_id: i64,
    seat_number: String,
    price: Decimal,
}

impl From<BookingSeatRow> for BookingSeat {
    fn from(row: BookingSeatRow) -> Self {
        BookingSeat {
            id: row.id,
            booking_id: row.booking_id,
            seat_id: row.seat_id,
            seat_number: row.seat_number,
            price: row.price,
        }
    }
}

/* ---------- helpers ---------- */

fn weekdays_from_db(days: &[i32]) -> Vec<u8> {
    let mut days: Vec<u8> = days
        .iter()
        .filter_map(|d| u8::try_from(*d).ok())
        .filter(|d| *d <= 6)
        .collect();
    days.sort_unstable();
    days.dedup();
    days
}

fn statuses(list: &[BookingStatus]) -> Vec<String> {
    list.iter().map(|s| s.as_str().to_string()).collect()
}

// Экранируем спецсимволы LIKE, чтобы поиск был по подстроке, а не по шаблону
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = BookingError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/* ---------- STORE ---------- */

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_booking_seats(&self, booking_id: i64) -> Result<Vec<BookingSeat>> {
        let rows = sqlx::query_as::<_, BookingSeatRow>(
            r#"
            SELECT bs.id, bs.booking_id, bs.seat_id, s.seat_number, bs.price
            FROM booking_seats bs
            JOIN seats s ON s.id = bs.seat_id
            WHERE bs.booking_id = $1
            ORDER BY s.seat_row, s.seat_col
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(BookingSeat::from).collect())
    }
}

impl BookingStore for PgStore {
    type Tx = PgTripTransaction;

    async fn create_location(&self, name: &str, code: &str) -> Result<Location> {
        sqlx::query_as::<_, Location>(
            "INSERT INTO locations (name, code) VALUES ($1, $2) RETURNING id, name, code",
        )
        .bind(name)
        .bind(code)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("location {code}")))
    }

    async fn get_location(&self, id: i64) -> Result<Option<Location>> {
        Ok(
            sqlx::query_as::<_, Location>("SELECT id, name, code FROM locations WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_locations(&self) -> Result<Vec<Location>> {
        Ok(
            sqlx::query_as::<_, Location>("SELECT id, name, code FROM locations ORDER BY name, id")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn create_route(&self, route: &NewRoute) -> Result<Route> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO routes (origin_id, destination_id, distance, base_price)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(route.origin_id)
        .bind(route.destination_id)
        .bind(route.distance)
        .bind(route.base_price)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                &format!("route {} -> {}", route.origin_id, route.destination_id),
            )
        })?;

        self.get_route(id)
            .await?
            .ok_or_else(|| BookingError::Internal(format!("route {id} vanished after insert")))
    }

    async fn get_route(&self, id: i64) -> Result<Option<Route>> {
        let row = sqlx::query_as::<_, RouteRow>(&format!("{ROUTE_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Route::from))
    }

    async fn list_routes(&self, filter: &RouteFilter) -> Result<Vec<Route>> {
        // Быстрый путь без фильтров: не гоняем ILIKE по всем строкам
        let rows = if filter.is_empty() {
            sqlx::query_as::<_, RouteRow>(&format!("{ROUTE_SELECT} ORDER BY o.name, d.name, r.id"))
                .fetch_all(&self.pool)
                .await?
        } else {
            let query = format!(
                r#"{ROUTE_SELECT}
                WHERE ($1::text IS NULL
                       OR o.name ILIKE $1 OR d.name ILIKE $1
                       OR o.code ILIKE $1 OR d.code ILIKE $1)
                  AND ($2::bigint IS NULL OR r.origin_id = $2)
                  AND ($3::bigint IS NULL OR r.destination_id = $3)
                ORDER BY o.name, d.name, r.id"#
            );
            sqlx::query_as::<_, RouteRow>(&query)
                .bind(filter.search().map(like_pattern))
                .bind(filter.origin_id)
                .bind(filter.destination_id)
                .fetch_all(&self.pool)
                .await?
        };
        Ok(rows.into_iter().map(Route::from).collect())
    }

    async fn create_bus(&self, bus: &NewBus) -> Result<Bus> {
        let row = sqlx::query_as::<_, BusRow>(
            "INSERT INTO buses (name, bus_type, total_seats, seat_layout)
             VALUES ($1, $2, $3, $4)
             RETURNING id, name, bus_type, total_seats, seat_layout",
        )
        .bind(&bus.name)
        .bind(bus.bus_type.as_str())
        .bind(bus.total_seats)
        .bind(Json(bus.seat_layout))
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_bus(&self, id: i64) -> Result<Option<Bus>> {
        sqlx::query_as::<_, BusRow>(
            "SELECT id, name, bus_type, total_seats, seat_layout FROM buses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Bus::try_from)
        .transpose()
    }

    async fn list_buses(&self) -> Result<Vec<Bus>> {
        let rows = sqlx::query_as::<_, BusRow>(
            "SELECT id, name, bus_type, total_seats, seat_layout FROM buses ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn create_trip(&self, trip: &NewTrip) -> Result<ScheduledTrip> {
        let days: Vec<i32> = trip.available_days.iter().map(|d| i32::from(*d)).collect();
        let row = sqlx::query_as::<_, TripRow>(
            "INSERT INTO scheduled_trips (route_id, bus_id, departure_time, arrival_time, available_days)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, route_id, bus_id, departure_time, arrival_time, available_days",
        )
        .bind(trip.route_id)
        .bind(trip.bus_id)
        .bind(trip.departure_time)
        .bind(trip.arrival_time)
        .bind(days)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                &format!("trip of bus {} at {}", trip.bus_id, trip.departure_time),
            )
        })?;
        Ok(row.into())
    }

    async fn get_trip(&self, id: i64) -> Result<Option<TripDetails>> {
        sqlx::query_as::<_, TripDetailsRow>(&format!("{TRIP_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TripDetails::try_from)
            .transpose()
    }

    async fn trips_for_route(&self, route_id: i64) -> Result<Vec<TripDetails>> {
        let rows = sqlx::query_as::<_, TripDetailsRow>(&format!(
            "{TRIP_SELECT} WHERE t.route_id = $1 ORDER BY t.departure_time, t.id"
        ))
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn seats_for_bus(&self, bus_id: i64) -> Result<Vec<Seat>> {
        let rows = sqlx::query_as::<_, SeatRow>(&format!(
            "SELECT {SEAT_COLUMNS} FROM seats WHERE bus_id = $1 ORDER BY seat_row, seat_col"
        ))
        .bind(bus_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn replace_seats(&self, bus_id: i64, seats: &[NewSeat]) -> Result<Vec<Seat>> {
        let mut tx = self.pool.begin().await?;

        // Блокируем автобус, чтобы две регенерации не переплелись
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM buses WHERE id = $1 FOR UPDATE")
            .bind(bus_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(BookingError::not_found(format!("bus {bus_id}")));
        }

        let referenced = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
              SELECT 1
              FROM booking_seats bs
              JOIN seats s ON s.id = bs.seat_id
              WHERE s.bus_id = $1
            )
            "#,
        )
        .bind(bus_id)
        .fetch_one(&mut *tx)
        .await?;
        if referenced {
            return Err(BookingError::SeatsInUse(bus_id));
        }

        let deleted = sqlx::query("DELETE FROM seats WHERE bus_id = $1")
            .bind(bus_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        debug!("bus {}: deleted {} old seats", bus_id, deleted);

        let insert = format!(
            "INSERT INTO seats (bus_id, seat_number, seat_row, seat_col, seat_type)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {SEAT_COLUMNS}"
        );
        let mut created = Vec::with_capacity(seats.len());
        for seat in seats {
            let row = sqlx::query_as::<_, SeatRow>(&insert)
                .bind(bus_id)
                .bind(&seat.seat_number)
                .bind(seat.row)
                .bind(seat.column)
                .bind(seat.seat_type.as_str())
                .fetch_one(&mut *tx)
                .await?;
            created.push(Seat::try_from(row)?);
        }

        sqlx::query("UPDATE buses SET total_seats = $2, updated_at = NOW() WHERE id = $1")
            .bind(bus_id)
            .bind(created.len() as i32)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn set_seat_active(&self, seat_id: i64, is_active: bool) -> Result<Option<Seat>> {
        sqlx::query_as::<_, SeatRow>(&format!(
            "UPDATE seats SET is_active = $2 WHERE id = $1 RETURNING {SEAT_COLUMNS}"
        ))
        .bind(seat_id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?
        .map(Seat::try_from)
        .transpose()
    }

    async fn booked_seat_ids(&self, trip_id: i64, travel_date: NaiveDate) -> Result<HashSet<i64>> {
        booked_seat_ids(&self.pool, trip_id, travel_date).await
    }

    async fn begin_trip(&self, trip_id: i64) -> Result<Self::Tx> {
        let mut tx = self.pool.begin().await?;

        // Взаимоисключение по рейсу: вторая транзакция ждёт здесь до commit первой
        // и затем читает уже зафиксированные брони.
        let locked = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM scheduled_trips WHERE id = $1 FOR UPDATE",
        )
        .bind(trip_id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Err(BookingError::not_found(format!("trip {trip_id}")));
        }

        Ok(PgTripTransaction { tx, trip_id })
    }

    async fn get_booking(&self, id: i64) -> Result<Option<BookingDetails>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let booking = Booking::try_from(row)?;
        let seats = self.fetch_booking_seats(booking.id).await?;
        Ok(Some(BookingDetails { booking, seats }))
    }

    async fn bookings_for_user(&self, user_id: i64) -> Result<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn list_bookings(&self, status: Option<BookingStatus>) -> Result<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE $1::text IS NULL OR status = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn transition_booking(
        &self,
        id: i64,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> Result<bool> {
        let updated = sqlx::query(
            "UPDATE bookings SET status = $3, updated_at = NOW()
             WHERE id = $1 AND status = ANY($2)",
        )
        .bind(id)
        .bind(statuses(from))
        .bind(to.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated > 0)
    }
}

async fn booked_seat_ids<'e, E>(executor: E, trip_id: i64, travel_date: NaiveDate) -> Result<HashSet<i64>>
where
    E: sqlx::PgExecutor<'e>,
{
    let ids = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT bs.seat_id
        FROM booking_seats bs
        JOIN bookings b ON b.id = bs.booking_id
        WHERE b.scheduled_trip_id = $1
          AND b.travel_date = $2
          AND b.status = ANY($3)
        "#,
    )
    .bind(trip_id)
    .bind(travel_date)
    .bind(statuses(&BookingStatus::HOLDING))
    .fetch_all(executor)
    .await?;
    Ok(ids.into_iter().collect())
}

pub struct PgTripTransaction {
    tx: Transaction<'static, Postgres>,
    trip_id: i64,
}

impl TripTransaction for PgTripTransaction {
    async fn active_seats(&mut self, bus_id: i64, seat_ids: &[i64]) -> Result<Vec<Seat>> {
        // FOR SHARE: деактивация места ждёт окончания брони
        let rows = sqlx::query_as::<_, SeatRow>(&format!(
            "SELECT {SEAT_COLUMNS} FROM seats
             WHERE bus_id = $1 AND id = ANY($2) AND is_active
             ORDER BY seat_row, seat_col
             FOR SHARE"
        ))
        .bind(bus_id)
        .bind(seat_ids)
        .fetch_all(&mut *self.tx)
        .await?;
        collect(rows)
    }

    async fn booked_seat_ids(&mut self, travel_date: NaiveDate) -> Result<HashSet<i64>> {
        booked_seat_ids(&mut *self.tx, self.trip_id, travel_date).await
    }

    async fn insert_booking(&mut self, new: &NewBooking) -> Result<BookingDetails> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "INSERT INTO bookings (user_id, scheduled_trip_id, booking_date, travel_date, total_price, status)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(new.user_id)
        .bind(new.scheduled_trip_id)
        .bind(new.booking_date)
        .bind(new.travel_date)
        .bind(new.total_price)
        .bind(new.status.as_str())
        .fetch_one(&mut *self.tx)
        .await?;
        let booking = Booking::try_from(row)?;

        let mut seats = Vec::with_capacity(new.seats.len());
        for line in &new.seats {
            let id = sqlx::query_scalar::<_, i64>(
                "INSERT INTO booking_seats (booking_id, seat_id, price)
                 VALUES ($1, $2, $3)
                 RETURNING id",
            )
            .bind(booking.id)
            .bind(line.seat_id)
            .bind(line.price)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_unique_violation(e, &format!("seat {} in booking", line.seat_id)))?;

            seats.push(BookingSeat {
                id,
                booking_id: booking.id,
                seat_id: line.seat_id,
                seat_number: line.seat_number.clone(),
                price: line.price,
            });
        }

        Ok(BookingDetails { booking, seats })
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
