use hookline_core::types::{ListDetails, ObjectDetails};
use hookline_core::Execution;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use super::rows::{containment, stored_targets, ExecutionRow, StoredTarget, EXECUTION_COLUMNS};
use super::sequence::{current_sequence, next_sequence};
use crate::store::{
    ExecutionQuery, ExecutionRecord, ExecutionSearch, ExecutionSortColumn, SearchResult, Snapshot,
    StoreError,
};

pub async fn get_execution(
    pool: &PgPool,
    instance_id: &str,
    condition_id: &str,
) -> Result<Option<ExecutionRecord>, StoreError> {
    let row = sqlx::query_as::<_, ExecutionRow>(&format!(
        "SELECT {EXECUTION_COLUMNS} FROM executions WHERE instance_id = $1 AND id = $2"
    ))
    .bind(instance_id)
    .bind(condition_id)
    .fetch_optional(pool)
    .await?;
    row.map(ExecutionRecord::try_from).transpose()
}

/// Reads executions, target IDs and the sequence in one repeatable-read transaction.
pub async fn snapshot(pool: &PgPool, instance_id: &str) -> Result<Snapshot, StoreError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
        .execute(&mut *tx)
        .await?;

    let sequence = current_sequence(&mut *tx, instance_id).await?;
    let rows = sqlx::query_as::<_, ExecutionRow>(&format!(
        "SELECT {EXECUTION_COLUMNS} FROM executions WHERE instance_id = $1"
    ))
    .bind(instance_id)
    .fetch_all(&mut *tx)
    .await?;
    let target_ids: Vec<(String,)> = sqlx::query_as("SELECT id FROM targets WHERE instance_id = $1")
        .bind(instance_id)
        .fetch_all(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Snapshot {
        executions: rows
            .into_iter()
            .map(|r| ExecutionRecord::try_from(r).map(|rec| rec.execution))
            .collect::<Result<Vec<_>, _>>()?,
        target_ids: target_ids.into_iter().map(|(id,)| id).collect(),
        sequence,
    })
}

pub async fn put_execution(
    pool: &PgPool,
    instance_id: &str,
    execution: &Execution,
    expected_sequence: i64,
) -> Result<ObjectDetails, StoreError> {
    let mut tx = pool.begin().await?;
    let sequence = next_sequence(&mut tx, instance_id, Some(expected_sequence)).await?;
    let id = execution.id();

    let (created_at, changed_at): (chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>) =
        sqlx::query_as(
            r#"
INSERT INTO executions (instance_id, id, execution_type, targets, sequence)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (instance_id, id) DO UPDATE
SET targets = EXCLUDED.targets, sequence = EXCLUDED.sequence, changed_at = now()
RETURNING created_at, changed_at
            "#,
        )
        .bind(instance_id)
        .bind(&id)
        .bind(execution.condition.execution_type().as_str())
        .bind(stored_targets(execution))
        .bind(sequence)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(ObjectDetails {
        id,
        resource_owner: instance_id.to_string(),
        sequence,
        creation_date: created_at,
        change_date: changed_at,
    })
}

pub async fn delete_execution(
    pool: &PgPool,
    instance_id: &str,
    condition_id: &str,
    expected_sequence: i64,
) -> Result<ObjectDetails, StoreError> {
    let mut tx = pool.begin().await?;
    let sequence = next_sequence(&mut tx, instance_id, Some(expected_sequence)).await?;
    let Some(created_at) = delete_row(&mut tx, instance_id, condition_id).await? else {
        return Err(StoreError::NotFound(format!("execution {condition_id}")));
    };
    tx.commit().await?;
    Ok(ObjectDetails {
        id: condition_id.to_string(),
        resource_owner: instance_id.to_string(),
        sequence,
        creation_date: created_at,
        change_date: chrono::Utc::now(),
    })
}

pub(crate) async fn delete_row(
    tx: &mut Transaction<'_, Postgres>,
    instance_id: &str,
    condition_id: &str,
) -> Result<Option<chrono::DateTime<chrono::Utc>>, StoreError> {
    let row: Option<(chrono::DateTime<chrono::Utc>,)> = sqlx::query_as(
        "DELETE FROM executions WHERE instance_id = $1 AND id = $2 RETURNING created_at",
    )
    .bind(instance_id)
    .bind(condition_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(|(created_at,)| created_at))
}

pub(crate) async fn write_targets(
    tx: &mut Transaction<'_, Postgres>,
    instance_id: &str,
    execution: &Execution,
    sequence: i64,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
UPDATE executions SET targets = $3, sequence = $4, changed_at = now()
WHERE instance_id = $1 AND id = $2
        "#,
    )
    .bind(instance_id)
    .bind(execution.id())
    .bind(stored_targets(execution))
    .bind(sequence)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Executions holding `entry`, locked for update.
pub(crate) async fn fetch_referencing(
    tx: &mut Transaction<'_, Postgres>,
    instance_id: &str,
    entry: StoredTarget,
) -> Result<Vec<ExecutionRecord>, StoreError> {
    let rows = sqlx::query_as::<_, ExecutionRow>(&format!(
        "SELECT {EXECUTION_COLUMNS} FROM executions \
         WHERE instance_id = $1 AND targets @> $2 ORDER BY id FOR UPDATE"
    ))
    .bind(instance_id)
    .bind(containment(entry))
    .fetch_all(&mut **tx)
    .await?;
    rows.into_iter().map(ExecutionRecord::try_from).collect()
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, instance_id: &str, search: &ExecutionSearch) {
    qb.push(" WHERE instance_id = ");
    qb.push_bind(instance_id.to_string());
    for query in &search.queries {
        match query {
            ExecutionQuery::InConditions(ids) => {
                qb.push(" AND id = ANY(");
                qb.push_bind(ids.clone());
                qb.push(")");
            }
            ExecutionQuery::ExecutionType(t) => {
                qb.push(" AND execution_type = ");
                qb.push_bind(t.as_str());
            }
            ExecutionQuery::Target(target_id) => {
                qb.push(" AND targets @> ");
                qb.push_bind(containment(StoredTarget::Target(target_id.clone())));
            }
            ExecutionQuery::Include(condition_id) => {
                qb.push(" AND targets @> ");
                qb.push_bind(containment(StoredTarget::Include(condition_id.clone())));
            }
        }
    }
}

fn sort_expr(column: ExecutionSortColumn) -> &'static str {
    match column {
        ExecutionSortColumn::Id => "id",
        ExecutionSortColumn::CreationDate => "created_at",
        ExecutionSortColumn::ChangeDate => "changed_at",
    }
}

pub async fn search_executions(
    pool: &PgPool,
    instance_id: &str,
    search: &ExecutionSearch,
) -> Result<SearchResult<ExecutionRecord>, StoreError> {
    let mut tx = pool.begin().await?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM executions");
    push_filters(&mut count, instance_id, search);
    let (total,): (i64,) = count.build_query_as().fetch_one(&mut *tx).await?;

    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {EXECUTION_COLUMNS} FROM executions"));
    push_filters(&mut qb, instance_id, search);
    let dir = if search.page.asc { "ASC" } else { "DESC" };
    qb.push(format!(" ORDER BY {} {dir}, id {dir}", sort_expr(search.sort)));
    qb.push(" LIMIT ");
    qb.push_bind(i64::try_from(search.page.effective_limit()).unwrap_or(i64::MAX));
    qb.push(" OFFSET ");
    qb.push_bind(i64::try_from(search.page.offset).unwrap_or(i64::MAX));
    let rows: Vec<ExecutionRow> = qb.build_query_as().fetch_all(&mut *tx).await?;

    let sequence = current_sequence(&mut *tx, instance_id).await?;
    tx.commit().await?;

    Ok(SearchResult {
        details: ListDetails {
            total_result: u64::try_from(total).unwrap_or(0),
            processed_sequence: sequence,
            timestamp: chrono::Utc::now(),
        },
        items: rows
            .into_iter()
            .map(ExecutionRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?,
    })
}
