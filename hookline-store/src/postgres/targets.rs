use hookline_core::types::{ListDetails, ObjectDetails};
use hookline_core::{ExecutionTarget, Target};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::executions::{delete_row, fetch_referencing, write_targets};
use super::rows::{timeout_millis, StoredTarget, TargetRow, TARGET_COLUMNS};
use super::sequence::{current_sequence, next_sequence};
use crate::store::{
    SearchResult, StoreError, TargetDeletion, TargetQuery, TargetRecord, TargetSearch,
    TargetSortColumn,
};

pub async fn create_target(pool: &PgPool, target: &Target) -> Result<ObjectDetails, StoreError> {
    let mut tx = pool.begin().await?;
    let sequence = next_sequence(&mut tx, &target.instance_id, None).await?;

    let (created_at, changed_at): (chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>) =
        sqlx::query_as(
            r#"
INSERT INTO targets
  (instance_id, id, name, endpoint, timeout_ms, dispatch_type, interrupt_on_error, signing_key, sequence)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
RETURNING created_at, changed_at
            "#,
        )
        .bind(&target.instance_id)
        .bind(&target.id)
        .bind(&target.name)
        .bind(target.endpoint.as_str())
        .bind(timeout_millis(target.timeout))
        .bind(target.dispatch_type.as_str())
        .bind(target.interrupt_on_error)
        .bind(target.signing_key.expose_bytes())
        .bind(sequence)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(ObjectDetails {
        id: target.id.clone(),
        resource_owner: target.instance_id.clone(),
        sequence,
        creation_date: created_at,
        change_date: changed_at,
    })
}

pub async fn get_target(
    pool: &PgPool,
    instance_id: &str,
    id: &str,
) -> Result<Option<TargetRecord>, StoreError> {
    let row = sqlx::query_as::<_, TargetRow>(&format!(
        "SELECT {TARGET_COLUMNS} FROM targets WHERE instance_id = $1 AND id = $2"
    ))
    .bind(instance_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(TargetRecord::try_from).transpose()
}

pub async fn get_targets(
    pool: &PgPool,
    instance_id: &str,
    ids: &[String],
) -> Result<Vec<TargetRecord>, StoreError> {
    let rows = sqlx::query_as::<_, TargetRow>(&format!(
        "SELECT {TARGET_COLUMNS} FROM targets WHERE instance_id = $1 AND id = ANY($2)"
    ))
    .bind(instance_id)
    .bind(ids.to_vec())
    .fetch_all(pool)
    .await?;
    let mut records = rows
        .into_iter()
        .map(TargetRecord::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    // Keep the caller's order.
    records.sort_by_key(|r| ids.iter().position(|id| *id == r.target.id));
    Ok(records)
}

pub async fn update_target(
    pool: &PgPool,
    target: &Target,
    expected_sequence: i64,
) -> Result<ObjectDetails, StoreError> {
    let mut tx = pool.begin().await?;

    let current: Option<(i64,)> = sqlx::query_as(
        "SELECT sequence FROM targets WHERE instance_id = $1 AND id = $2 FOR UPDATE",
    )
    .bind(&target.instance_id)
    .bind(&target.id)
    .fetch_optional(&mut *tx)
    .await?;
    match current {
        None => return Err(StoreError::NotFound(format!("target {}", target.id))),
        Some((seq,)) if seq != expected_sequence => {
            return Err(StoreError::Conflict(format!(
                "target {} is at sequence {seq}, expected {expected_sequence}",
                target.id
            )))
        }
        Some(_) => {}
    }

    let sequence = next_sequence(&mut tx, &target.instance_id, None).await?;
    let (created_at, changed_at): (chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>) =
        sqlx::query_as(
            r#"
UPDATE targets
SET name = $3, endpoint = $4, timeout_ms = $5, dispatch_type = $6,
    interrupt_on_error = $7, signing_key = $8, sequence = $9, changed_at = now()
WHERE instance_id = $1 AND id = $2
RETURNING created_at, changed_at
            "#,
        )
        .bind(&target.instance_id)
        .bind(&target.id)
        .bind(&target.name)
        .bind(target.endpoint.as_str())
        .bind(timeout_millis(target.timeout))
        .bind(target.dispatch_type.as_str())
        .bind(target.interrupt_on_error)
        .bind(target.signing_key.expose_bytes())
        .bind(sequence)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(ObjectDetails {
        id: target.id.clone(),
        resource_owner: target.instance_id.clone(),
        sequence,
        creation_date: created_at,
        change_date: changed_at,
    })
}

pub async fn delete_target(
    pool: &PgPool,
    instance_id: &str,
    id: &str,
    expected_sequence: i64,
) -> Result<TargetDeletion, StoreError> {
    let mut tx = pool.begin().await?;
    let sequence = next_sequence(&mut tx, instance_id, Some(expected_sequence)).await?;

    let removed: Option<(chrono::DateTime<chrono::Utc>,)> = sqlx::query_as(
        "DELETE FROM targets WHERE instance_id = $1 AND id = $2 RETURNING created_at",
    )
    .bind(instance_id)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some((created_at,)) = removed else {
        return Err(StoreError::NotFound(format!("target {id}")));
    };

    let mut affected = Vec::new();
    for mut record in fetch_referencing(&mut tx, instance_id, StoredTarget::Target(id.to_string())).await? {
        let condition_id = record.details.id.clone();
        record
            .execution
            .targets
            .retain(|t| !matches!(t, ExecutionTarget::Target(target_id) if target_id == id));
        if record.execution.is_empty() {
            delete_row(&mut tx, instance_id, &condition_id).await?;
        } else {
            write_targets(&mut tx, instance_id, &record.execution, sequence).await?;
        }
        affected.push(condition_id);
    }

    tx.commit().await?;
    Ok(TargetDeletion {
        details: ObjectDetails {
            id: id.to_string(),
            resource_owner: instance_id.to_string(),
            sequence,
            creation_date: created_at,
            change_date: chrono::Utc::now(),
        },
        affected_executions: affected,
    })
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, instance_id: &str, search: &TargetSearch) {
    qb.push(" WHERE instance_id = ");
    qb.push_bind(instance_id.to_string());
    for query in &search.queries {
        match query {
            TargetQuery::Name { value, method } => {
                qb.push(if method.ignores_case() {
                    " AND name ILIKE "
                } else {
                    " AND name LIKE "
                });
                qb.push_bind(method.like_pattern(value));
            }
            TargetQuery::InIds(ids) => {
                qb.push(" AND id = ANY(");
                qb.push_bind(ids.clone());
                qb.push(")");
            }
        }
    }
}

fn sort_expr(column: TargetSortColumn) -> &'static str {
    match column {
        TargetSortColumn::Id => "id",
        TargetSortColumn::CreationDate => "created_at",
        TargetSortColumn::ChangeDate => "changed_at",
        TargetSortColumn::Name => "name",
        TargetSortColumn::DispatchType => "dispatch_type",
        TargetSortColumn::Endpoint => "endpoint",
        TargetSortColumn::Timeout => "timeout_ms",
        TargetSortColumn::InterruptOnError => "interrupt_on_error",
    }
}

pub async fn search_targets(
    pool: &PgPool,
    instance_id: &str,
    search: &TargetSearch,
) -> Result<SearchResult<TargetRecord>, StoreError> {
    let mut tx = pool.begin().await?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM targets");
    push_filters(&mut count, instance_id, search);
    let (total,): (i64,) = count.build_query_as().fetch_one(&mut *tx).await?;

    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {TARGET_COLUMNS} FROM targets"));
    push_filters(&mut qb, instance_id, search);
    let dir = if search.page.asc { "ASC" } else { "DESC" };
    qb.push(format!(" ORDER BY {} {dir}, id {dir}", sort_expr(search.sort)));
    qb.push(" LIMIT ");
    qb.push_bind(i64::try_from(search.page.effective_limit()).unwrap_or(i64::MAX));
    qb.push(" OFFSET ");
    qb.push_bind(i64::try_from(search.page.offset).unwrap_or(i64::MAX));
    let rows: Vec<TargetRow> = qb.build_query_as().fetch_all(&mut *tx).await?;

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
            .map(TargetRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?,
    })
}
