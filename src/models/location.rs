use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Пункт отправления/назначения. Идентичность определяется кодом.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub code: String,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}
