use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::AppError;

/// Time bucket size of an aggregate row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hour,
    Day,
    Month,
}

impl Granularity {
    pub fn table(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Month => "month",
        }
    }
}

/// Raw row of the `hour`, `day` and `month` tables.
#[derive(Debug, Clone, FromRow)]
pub struct TimeRow {
    pub id: i64,
    pub time: String,
    pub rx: i64,
    pub tx: i64,
    pub rate: f64,
}

/// Bandwidth counters for one hour, day or month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    /// `MMM/DD/YYYY`, or `MMM/DD/YYYY HH:00` for hourly rows
    pub date: String,
    /// Bytes received
    pub rx: u64,
    /// Bytes transmitted
    pub tx: u64,
    /// Bandwidth rate in Mbit/s
    pub rate: f64,
}

impl TryFrom<TimeRow> for TimeEntry {
    type Error = AppError;

    fn try_from(row: TimeRow) -> Result<Self, Self::Error> {
        Ok(TimeEntry {
            rx: non_negative(row.rx, "rx", row.id)?,
            tx: non_negative(row.tx, "tx", row.id)?,
            date: row.time,
            rate: row.rate,
        })
    }
}

/// Total bytes ever served, summed over the `agg` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalEntry {
    pub total: u64,
}

/// Key of an hourly row: the calendar date followed by a zero-padded `HH:00`.
pub fn hour_key(date: &str, hour: u8) -> String {
    format!("{} {:02}:00", date, hour)
}

pub(crate) fn non_negative(value: i64, column: &str, id: i64) -> Result<u64, AppError> {
    u64::try_from(value).map_err(|_| {
        AppError::MalformedRow(format!("row {} has negative {} ({})", id, column, value))
    })
}
