use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::config::Config;
use crate::errors::Result;
use crate::models::{DistroUsageRow, Granularity, TimeRow};

pub mod queries;

use queries::{AggregateQueries, DistroUsageQueries, TimeQueries};

/// How a singular lookup matches the stored `time` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatch {
    Exact(String),
    /// Literal, ASCII case-insensitive substring of the key; the first row in
    /// insertion order wins.
    Contains(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    Ascending,
    Descending,
}

impl RowOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            RowOrder::Ascending => "ASC",
            RowOrder::Descending => "DESC",
        }
    }
}

/// Insertion-ordered scan of a time table, optionally limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowScan {
    pub order: RowOrder,
    pub limit: Option<i64>,
}

impl RowScan {
    pub fn all() -> Self {
        RowScan {
            order: RowOrder::Ascending,
            limit: None,
        }
    }
}

/// Store-level filter for the `distrousage` table. Rows always come back
/// most recent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistroUsageFilter {
    pub distros: Vec<String>,
    pub date: Option<String>,
    pub limit: i64,
}

/// Read access to the bandwidth telemetry tables.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Single row of a time table, or `AppError::NotFound`.
    async fn time_row(&self, granularity: Granularity, key: KeyMatch) -> Result<TimeRow>;

    async fn time_rows(&self, granularity: Granularity, scan: RowScan) -> Result<Vec<TimeRow>>;

    /// Sum of `agg.total`; zero for an empty table.
    async fn aggregate_total(&self) -> Result<i64>;

    async fn distro_usage_rows(&self, filter: DistroUsageFilter) -> Result<Vec<DistroUsageRow>>;

    async fn ping(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(config: &Config) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(config.run_migrations);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(crate::errors::AppError::unavailable)?;

        let database = Self { pool };
        if config.run_migrations {
            database.migrate().await?;
        }

        Ok(database)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl TelemetryStore for Database {
    async fn time_row(&self, granularity: Granularity, key: KeyMatch) -> Result<TimeRow> {
        TimeQueries::find_one(&self.pool, granularity, &key).await
    }

    async fn time_rows(&self, granularity: Granularity, scan: RowScan) -> Result<Vec<TimeRow>> {
        TimeQueries::scan(&self.pool, granularity, scan).await
    }

    async fn aggregate_total(&self) -> Result<i64> {
        AggregateQueries::sum_total(&self.pool).await
    }

    async fn distro_usage_rows(&self, filter: DistroUsageFilter) -> Result<Vec<DistroUsageRow>> {
        DistroUsageQueries::find(&self.pool, &filter).await
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(crate::errors::AppError::unavailable)?;
        sqlx::query("SELECT 1").execute(&mut *conn).await?;
        Ok(())
    }
}
