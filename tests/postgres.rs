//! Проверки `PgStore` на живой базе.
//!
//! Запуск: `DATABASE_URL=postgres://... cargo test --test postgres -- --ignored`

use bus_booking::error::BookingError;
use bus_booking::models::{BookingStatus, BusType, NewBus, NewRoute, NewTrip, RouteFilter, SeatLayout};
use bus_booking::services::allocator::{self, BookingRequest};
use bus_booking::services::{catalog, layout};
use bus_booking::store::{BookingStore, PgStore};
use chrono::{Days, NaiveTime};
use rust_decimal::Decimal;
use sqlx::PgPool;

async fn create_user(pool: &PgPool, email: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (email, password_hash, full_name) VALUES ($1, 'x', 'Test') RETURNING user_id",
    )
    .bind(email)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed(store: &PgStore) -> (i64, Vec<i64>) {
    let a = catalog::create_location(store, "Almaty", "ala").await.unwrap();
    let b = catalog::create_location(store, "Astana", "nqz").await.unwrap();
    let route = catalog::create_route(
        store,
        NewRoute {
            origin_id: a.id,
            destination_id: b.id,
            distance: Decimal::new(121400, 2),
            base_price: Decimal::new(10000, 2),
        },
    )
    .await
    .unwrap();
    let bus = catalog::create_bus(
        store,
        NewBus {
            name: "Yutong ZK6122".into(),
            bus_type: BusType::Sleeper,
            total_seats: 0,
            seat_layout: SeatLayout::new(4, 2, 2).unwrap(),
        },
    )
    .await
    .unwrap();
    let seats = layout::regenerate_seats(store, bus.id).await.unwrap();
    let trip = catalog::create_trip(
        store,
        NewTrip {
            route_id: route.id,
            bus_id: bus.id,
            departure_time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            arrival_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            available_days: vec![0, 1, 2, 3, 4, 5, 6],
        },
    )
    .await
    .unwrap();
    (trip.id, seats.iter().map(|s| s.id).collect())
}

#[ignore]
#[sqlx::test(migrations = "src/migrations")]
async fn booking_round_trip(pool: PgPool) {
    let store = PgStore::new(pool.clone());
    let (trip_id, seat_ids) = seed(&store).await;
    let user_id = create_user(&pool, "anna@example.com").await;
    let date = allocator::today().checked_add_days(Days::new(3)).unwrap();

    let req = BookingRequest {
        user_id,
        trip_id,
        travel_date: date,
        seat_ids: seat_ids[..2].to_vec(),
    };
    let details = allocator::confirm_booking(&store, &req).await.unwrap();
    assert_eq!(details.booking.total_price, Decimal::new(36000, 2));
    assert_eq!(details.booking.status, BookingStatus::Confirmed);

    assert!(matches!(
        allocator::confirm_booking(&store, &req).await,
        Err(BookingError::SeatAlreadyBooked { .. })
    ));

    let loaded = allocator::booking_details(&store, details.booking.id, user_id)
        .await
        .unwrap();
    assert_eq!(loaded.seats.len(), 2);

    allocator::cancel_booking(&store, details.booking.id, user_id)
        .await
        .unwrap();
    assert!(store.booked_seat_ids(trip_id, date).await.unwrap().is_empty());
    allocator::confirm_booking(&store, &req).await.unwrap();
}

#[ignore]
#[sqlx::test(migrations = "src/migrations")]
async fn regeneration_guard_and_search(pool: PgPool) {
    let store = PgStore::new(pool.clone());
    let (trip_id, seat_ids) = seed(&store).await;
    let user_id = create_user(&pool, "bek@example.com").await;
    let trip = store.get_trip(trip_id).await.unwrap().unwrap();
    assert_eq!(trip.bus.total_seats, 16);

    allocator::confirm_booking(
        &store,
        &BookingRequest {
            user_id,
            trip_id,
            travel_date: allocator::today().checked_add_days(Days::new(1)).unwrap(),
            seat_ids: vec![seat_ids[0]],
        },
    )
    .await
    .unwrap();

    assert!(matches!(
        layout::regenerate_seats(&store, trip.bus.id).await,
        Err(BookingError::SeatsInUse(_))
    ));

    let found = store
        .list_routes(&RouteFilter {
            search: Some("astan".into()),
            ..RouteFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    let pct = store
        .list_routes(&RouteFilter {
            search: Some("%".into()),
            ..RouteFilter::default()
        })
        .await
        .unwrap();
    assert!(pct.is_empty());
}

#[ignore]
#[sqlx::test(migrations = "src/migrations")]
async fn concurrent_bookings_of_one_seat_have_one_winner(pool: PgPool) {
    const RIVALS: usize = 8;

    let store = PgStore::new(pool.clone());
    let (trip_id, seat_ids) = seed(&store).await;
    let date = allocator::today().checked_add_days(Days::new(5)).unwrap();

    let mut users = Vec::with_capacity(RIVALS);
    for i in 0..RIVALS {
        users.push(create_user(&pool, &format!("rival{i}@example.com")).await);
    }

    let handles: Vec<_> = users
        .into_iter()
        .map(|user_id| {
            let store = store.clone();
            let req = BookingRequest {
                user_id,
                trip_id,
                travel_date: date,
                seat_ids: vec![seat_ids[2]],
            };
            tokio::spawn(async move { allocator::confirm_booking(&store, &req).await })
        })
        .collect();

    let mut wins = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(BookingError::SeatAlreadyBooked { seat_ids: taken }) => {
                assert_eq!(taken, vec![seat_ids[2]]);
                conflicts += 1;
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(conflicts, RIVALS - 1);

    let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM booking_seats")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(lines, 1);
}

#[ignore]
#[sqlx::test(migrations = "src/migrations")]
async fn deactivated_seat_and_status_listing(pool: PgPool) {
    let store = PgStore::new(pool.clone());
    let (trip_id, seat_ids) = seed(&store).await;
    let user_id = create_user(&pool, "dana@example.com").await;
    let date = allocator::today().checked_add_days(Days::new(2)).unwrap();
    let booking = |seat_id| BookingRequest {
        user_id,
        trip_id,
        travel_date: date,
        seat_ids: vec![seat_id],
    };

    store.set_seat_active(seat_ids[0], false).await.unwrap();
    assert!(matches!(
        allocator::confirm_booking(&store, &booking(seat_ids[0])).await,
        Err(BookingError::InvalidSeatSelection(_))
    ));

    let kept = allocator::confirm_booking(&store, &booking(seat_ids[1])).await.unwrap();
    let dropped = allocator::confirm_booking(&store, &booking(seat_ids[3])).await.unwrap();
    allocator::cancel_booking(&store, dropped.booking.id, user_id)
        .await
        .unwrap();

    let cancelled = store
        .list_bookings(Some(BookingStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].id, dropped.booking.id);

    let all = store.list_bookings(None).await.unwrap();
    let ids: Vec<i64> = all.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![dropped.booking.id, kept.booking.id]);
    assert_eq!(store.list_buses().await.unwrap().len(), 1);
}
