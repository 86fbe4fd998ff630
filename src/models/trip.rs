use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{Bus, Route};

/// Рейс: автобус на маршруте с фиксированным временем отправления,
/// повторяющийся по дням недели (0 = понедельник, 6 = воскресенье).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTrip {
    pub id: i64,
    pub route_id: i64,
    pub bus_id: i64,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    pub available_days: Vec<u8>,
}

impl ScheduledTrip {
    pub fn runs_on(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday().num_days_from_monday() as u8;
        self.available_days.contains(&weekday)
    }
}

#[derive(Debug, Clone)]
pub struct NewTrip {
    pub route_id: i64,
    pub bus_id: i64,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    pub available_days: Vec<u8>,
}

/// Рейс вместе с маршрутом и автобусом: всё, что нужно для цены и схемы мест.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripDetails {
    pub trip: ScheduledTrip,
    pub route: Route,
    pub bus: Bus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_on_uses_monday_based_weekdays() {
        let trip = ScheduledTrip {
            id: 1,
            route_id: 1,
            bus_id: 1,
            departure_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            arrival_time: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
            available_days: vec![0, 6],
        };
        // 2026-10-19 понедельник, 2026-10-25 воскресенье
        assert!(trip.runs_on(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()));
        assert!(trip.runs_on(NaiveDate::from_ymd_opt(2026, 10, 25).unwrap()));
        assert!(!trip.runs_on(NaiveDate::from_ymd_opt(2026, 10, 21).unwrap()));
    }
}
