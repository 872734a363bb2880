use serde::Serialize;
use sqlx::FromRow;

/// A row from the `people` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Person {
    pub first_name: String,
    pub last_name: String,
}
