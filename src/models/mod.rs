pub mod booking;
pub mod bus;
pub mod location;
pub mod route;
pub mod seat;
pub mod trip;
pub mod user;

pub use booking::{Booking, BookingDetails, BookingSeat, BookingStatus, NewBooking, NewBookingSeat};
pub use bus::{Bus, BusType, NewBus, SeatLayout};
pub use location::Location;
pub use route::{NewRoute, Route, RouteFilter};
pub use seat::{NewSeat, Seat, SeatType};
pub use trip::{NewTrip, ScheduledTrip, TripDetails};
pub use user::User;
