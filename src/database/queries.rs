use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::database::{DistroUsageFilter, KeyMatch, RowScan};
use crate::errors::{AppError, Result};
use crate::models::{DistroUsageRow, Granularity, TimeRow};

// Table names come from `Granularity` only; every caller-supplied value is bound.

pub struct TimeQueries;

impl TimeQueries {
    pub async fn find_one(
        pool: &SqlitePool,
        granularity: Granularity,
        key: &KeyMatch,
    ) -> Result<TimeRow> {
        let mut conn = pool.acquire().await.map_err(AppError::unavailable)?;

        let row = match key {
            KeyMatch::Exact(time) => {
                let sql = format!(
                    "SELECT id, time, rx, tx, rate FROM {} WHERE time = ?1 ORDER BY id ASC LIMIT 1",
                    granularity.table()
                );
                sqlx::query_as::<_, TimeRow>(&sql)
                    .bind(time.as_str())
                    .fetch_optional(&mut *conn)
                    .await?
            }
            KeyMatch::Contains(fragment) => {
                let sql = format!(
                    "SELECT id, time, rx, tx, rate FROM {} WHERE instr(lower(time), lower(?1)) > 0 ORDER BY id ASC LIMIT 1",
                    granularity.table()
                );
                sqlx::query_as::<_, TimeRow>(&sql)
                    .bind(fragment.as_str())
                    .fetch_optional(&mut *conn)
                    .await?
            }
        };

        tracing::debug!(table = granularity.table(), ?key, found = row.is_some(), "time row lookup");
        row.ok_or(AppError::NotFound)
    }

    pub async fn scan(
        pool: &SqlitePool,
        granularity: Granularity,
        scan: RowScan,
    ) -> Result<Vec<TimeRow>> {
        let mut conn = pool.acquire().await.map_err(AppError::unavailable)?;

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT id, time, rx, tx, rate FROM ");
        query.push(granularity.table());
        query.push(" ORDER BY id ");
        query.push(scan.order.as_sql());
        if let Some(limit) = scan.limit {
            query.push(" LIMIT ").push_bind(limit);
        }

        let rows = query
            .build_query_as::<TimeRow>()
            .fetch_all(&mut *conn)
            .await?;

        tracing::debug!(table = granularity.table(), ?scan, rows = rows.len(), "time rows scan");
        Ok(rows)
    }
}

pub struct AggregateQueries;

impl AggregateQueries {
    pub async fn sum_total(pool: &SqlitePool) -> Result<i64> {
        let mut conn = pool.acquire().await.map_err(AppError::unavailable)?;

        let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(total), 0) FROM agg")
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(total, "aggregate total");
        Ok(total)
    }
}

pub struct DistroUsageQueries;

impl DistroUsageQueries {
    pub async fn find(pool: &SqlitePool, filter: &DistroUsageFilter) -> Result<Vec<DistroUsageRow>> {
        let mut conn = pool.acquire().await.map_err(AppError::unavailable)?;

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, time, distro, bytes FROM distrousage");
        let mut has_where = false;

        if !filter.distros.is_empty() {
            query.push(" WHERE distro IN (");
            let mut names = query.separated(", ");
            for distro in &filter.distros {
                names.push_bind(distro.as_str());
            }
            names.push_unseparated(")");
            has_where = true;
        }

        if let Some(date) = &filter.date {
            query.push(if has_where { " AND " } else { " WHERE " });
            query.push("time = ").push_bind(date.as_str());
        }

        query.push(" ORDER BY id DESC LIMIT ").push_bind(filter.limit);

        let rows = query
            .build_query_as::<DistroUsageRow>()
            .fetch_all(&mut *conn)
            .await?;

        tracing::debug!(
            distros = filter.distros.len(),
            date = ?filter.date,
            limit = filter.limit,
            rows = rows.len(),
            "distro usage lookup"
        );
        Ok(rows)
    }
}
