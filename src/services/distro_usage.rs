use std::sync::Arc;

use crate::{
    database::{DistroUsageFilter, TelemetryStore},
    errors::{AppError, Result},
    models::{DistroUsageArgs, DistroUsageEntry, DistroUsageRow},
};

/// Rows assumed per day when no distro set bounds the lookback window.
/// A heuristic for "every known distro", not a derived value.
pub const DISTRO_FANOUT_PER_DAY: i64 = 41;

/// Row cap when no lookback window is given, roughly all distros over
/// the last three days.
pub const DEFAULT_DISTRO_USAGE_CAP: i64 = 123;

#[derive(Clone)]
pub struct DistroUsageResolver {
    store: Arc<dyn TelemetryStore>,
}

impl DistroUsageResolver {
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, args: DistroUsageArgs) -> Result<Vec<DistroUsageEntry>> {
        let filter = build_filter(&args)?;
        let rows = self.store.distro_usage_rows(filter).await?;
        shape_distro_usage(rows, args.sort_biggest.unwrap_or(false))
    }
}

/// Number of rows fetched, most recent first, before any sorting. The
/// product saturates at `i64::MAX`, which leaves the read uncapped.
pub fn row_cap(distro_count: usize, last_days: Option<i64>) -> i64 {
    match last_days {
        Some(days) if distro_count > 0 => (distro_count as i64).saturating_mul(days),
        Some(days) => DISTRO_FANOUT_PER_DAY.saturating_mul(days),
        None => DEFAULT_DISTRO_USAGE_CAP,
    }
}

/// Converts capped rows to entries. With `sort_biggest` the rows are
/// re-ordered by descending bytes; ties keep their relative order.
pub fn shape_distro_usage(
    rows: Vec<DistroUsageRow>,
    sort_biggest: bool,
) -> Result<Vec<DistroUsageEntry>> {
    let mut entries = rows
        .into_iter()
        .map(DistroUsageEntry::try_from)
        .collect::<Result<Vec<_>>>()?;

    if sort_biggest {
        entries.sort_by(|a, b| b.bytes.cmp(&a.bytes));
    }

    Ok(entries)
}

fn build_filter(args: &DistroUsageArgs) -> Result<DistroUsageFilter> {
    let mut distros: Vec<String> = Vec::new();
    for name in args.distros.iter().flatten() {
        if name.trim().is_empty() {
            return Err(AppError::invalid("distro names must not be empty"));
        }
        if !distros.contains(name) {
            distros.push(name.clone());
        }
    }

    if let Some(date) = &args.date {
        if date.trim().is_empty() {
            return Err(AppError::invalid("date must not be empty"));
        }
    }

    if let Some(days) = args.last_days {
        if days <= 0 {
            return Err(AppError::invalid(format!("lastDays must be a positive integer, got {}", days)));
        }
    }

    Ok(DistroUsageFilter {
        limit: row_cap(distros.len(), args.last_days),
        distros,
        date: args.date.clone(),
    })
}
