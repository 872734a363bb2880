//! Repository for the `people` table, the load step's target.

use kbatch_core::record::PersonRecord;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::models::person::Person;

/// Largest batch [`PersonRepo::insert_batch`] accepts: two bind parameters
/// per row, and PostgreSQL allows at most 65535 per statement.
pub const MAX_BATCH_ROWS: usize = 32_767;

pub struct PersonRepo;

impl PersonRepo {
    /// Insert a batch of records with one multi-row statement.
    ///
    /// Takes a connection so the caller controls the transaction boundary.
    /// An empty batch is a no-op.
    pub async fn insert_batch(
        conn: &mut PgConnection,
        records: &[PersonRecord],
    ) -> Result<u64, sqlx::Error> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO people (first_name, last_name) ");
        builder.push_values(records, |mut row, record| {
            row.push_bind(record.first_name.clone())
                .push_bind(record.last_name.clone());
        });

        let result = builder.build().execute(conn).await?;
        Ok(result.rows_affected())
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM people")
            .fetch_one(pool)
            .await
    }

    /// All rows in physical order. Only meant for small tables.
    pub async fn list(pool: &PgPool) -> Result<Vec<Person>, sqlx::Error> {
        sqlx::query_as::<_, Person>("SELECT first_name, last_name FROM people")
            .fetch_all(pool)
            .await
    }
}
