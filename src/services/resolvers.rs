use std::sync::Arc;

use crate::{
    database::{KeyMatch, RowOrder, RowScan, TelemetryStore},
    errors::{AppError, Result},
    models::{hour_key, Granularity, Pagination, TimeEntry, TotalEntry},
};

/// Resolves hourly, daily and monthly aggregates and the running total.
#[derive(Clone)]
pub struct TimeResolver {
    store: Arc<dyn TelemetryStore>,
}

impl TimeResolver {
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    pub async fn hour(&self, date: &str, hour: i64) -> Result<TimeEntry> {
        let date = require_date(date)?;
        let hour = u8::try_from(hour)
            .ok()
            .filter(|h| *h <= 23)
            .ok_or_else(|| AppError::invalid(format!("hour must be between 0 and 23, got {}", hour)))?;

        let row = self
            .store
            .time_row(Granularity::Hour, KeyMatch::Exact(hour_key(date, hour)))
            .await?;
        row.try_into()
    }

    pub async fn day(&self, date: &str) -> Result<TimeEntry> {
        let date = require_date(date)?;
        let row = self
            .store
            .time_row(Granularity::Day, KeyMatch::Exact(date.to_string()))
            .await?;
        row.try_into()
    }

    /// `date` may be any part of the month key (`2019`, `Mar`, `Mar/01/2019`).
    pub async fn month(&self, date: &str) -> Result<TimeEntry> {
        let date = require_date(date)?;
        let row = self
            .store
            .time_row(Granularity::Month, KeyMatch::Contains(date.to_string()))
            .await?;
        row.try_into()
    }

    pub async fn collection(
        &self,
        granularity: Granularity,
        pagination: Pagination,
    ) -> Result<Vec<TimeEntry>> {
        let scan = pagination_scan(pagination)?;
        self.store
            .time_rows(granularity, scan)
            .await?
            .into_iter()
            .map(TimeEntry::try_from)
            .collect()
    }

    pub async fn total(&self) -> Result<TotalEntry> {
        let total = self.store.aggregate_total().await?;
        let total = u64::try_from(total)
            .map_err(|_| AppError::MalformedRow(format!("aggregate total is negative ({})", total)))?;
        Ok(TotalEntry { total })
    }
}

fn require_date(date: &str) -> Result<&str> {
    if date.trim().is_empty() {
        return Err(AppError::invalid("date must not be empty"));
    }
    Ok(date)
}

/// `first` wins over `last`. `last` scans newest first and the rows keep
/// that order.
fn pagination_scan(pagination: Pagination) -> Result<RowScan> {
    for (name, value) in [("first", pagination.first), ("last", pagination.last)] {
        if let Some(n) = value {
            if n <= 0 {
                return Err(AppError::invalid(format!("{} must be a positive integer, got {}", name, n)));
            }
        }
    }

    let scan = match (pagination.first, pagination.last) {
        (Some(first), _) => RowScan {
            order: RowOrder::Ascending,
            limit: Some(first),
        },
        (None, Some(last)) => RowScan {
            order: RowOrder::Descending,
            limit: Some(last),
        },
        (None, None) => RowScan::all(),
    };
    Ok(scan)
}
