use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Location;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: i64,
    pub origin: Location,
    pub destination: Location,
    pub distance: Decimal,
    pub base_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewRoute {
    pub origin_id: i64,
    pub destination_id: i64,
    pub distance: Decimal,
    pub base_price: Decimal,
}

/// Фильтр списка маршрутов: подстрока по названию/коду и точные id концов.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteFilter {
    pub search: Option<String>,
    #[serde(alias = "origin")]
    pub origin_id: Option<i64>,
    #[serde(alias = "destination")]
    pub destination_id: Option<i64>,
}

impl RouteFilter {
    pub fn is_empty(&self) -> bool {
        self.search().is_none() && self.origin_id.is_none() && self.destination_id.is_none()
    }

    /// Поисковая строка без пробелов по краям; пустая строка означает "без поиска".
    pub fn search(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn matches(&self, route: &Route) -> bool {
        if self.origin_id.is_some_and(|id| id != route.origin.id) {
            return false;
        }
        if self.destination_id.is_some_and(|id| id != route.destination.id) {
            return false;
        }
        match self.search() {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                [
                    &route.origin.name,
                    &route.origin.code,
                    &route.destination.name,
                    &route.destination.code,
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} → {}", self.origin.name, self.destination.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route() -> Route {
        Route {
            id: 1,
            origin: Location { id: 10, name: "Almaty".into(), code: "ALA".into() },
            destination: Location { id: 11, name: "Astana".into(), code: "NQZ".into() },
            distance: Decimal::new(1200, 0),
            base_price: Decimal::new(10000, 2),
        }
    }

    #[test]
    fn search_is_case_insensitive_over_names_and_codes() {
        let r = route();
        let by_name = RouteFilter { search: Some("astan".into()), ..Default::default() };
        let by_code = RouteFilter { search: Some("ala".into()), ..Default::default() };
        let miss = RouteFilter { search: Some("shymkent".into()), ..Default::default() };
        assert!(by_name.matches(&r));
        assert!(by_code.matches(&r));
        assert!(!miss.matches(&r));
    }

    #[test]
    fn blank_search_is_ignored() {
        let filter = RouteFilter { search: Some("   ".into()), ..Default::default() };
        assert!(filter.is_empty());
        assert!(filter.matches(&route()));
    }

    #[test]
    fn endpoint_filters_are_exact() {
        let r = route();
        assert!(RouteFilter { origin_id: Some(10), ..Default::default() }.matches(&r));
        assert!(!RouteFilter { origin_id: Some(11), ..Default::default() }.matches(&r));
        assert!(!RouteFilter { destination_id: Some(10), ..Default::default() }.matches(&r));
    }
}
