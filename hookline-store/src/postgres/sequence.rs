use sqlx::{Postgres, Transaction};

use crate::store::StoreError;

/// Increments the instance sequence inside `tx` and returns the new value.
///
/// With `expected` set, fails [`StoreError::Conflict`] unless the stored sequence still
/// equals it.
pub(crate) async fn next_sequence(
    tx: &mut Transaction<'_, Postgres>,
    instance_id: &str,
    expected: Option<i64>,
) -> Result<i64, StoreError> {
    let row: Option<(i64,)> = match expected {
        Some(expected) => {
            sqlx::query_as(
                r#"
INSERT INTO instance_sequences (instance_id, sequence) VALUES ($1, 1)
ON CONFLICT (instance_id) DO UPDATE SET sequence = instance_sequences.sequence + 1
WHERE instance_sequences.sequence = $2
RETURNING sequence
                "#,
            )
            .bind(instance_id)
            .bind(expected)
            .fetch_optional(&mut **tx)
            .await?
        }
        None => {
            sqlx::query_as(
                r#"
INSERT INTO instance_sequences (instance_id, sequence) VALUES ($1, 1)
ON CONFLICT (instance_id) DO UPDATE SET sequence = instance_sequences.sequence + 1
RETURNING sequence
                "#,
            )
            .bind(instance_id)
            .fetch_optional(&mut **tx)
            .await?
        }
    };
    match row {
        Some((sequence,)) => Ok(sequence),
        None => Err(StoreError::Conflict(format!(
            "instance {instance_id} moved past sequence {}",
            expected.unwrap_or_default()
        ))),
    }
}

pub(crate) async fn current_sequence<'e, E>(executor: E, instance_id: &str) -> Result<i64, StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT sequence FROM instance_sequences WHERE instance_id = $1")
            .bind(instance_id)
            .fetch_optional(executor)
            .await?;
    Ok(row.map(|(s,)| s).unwrap_or(0))
}
