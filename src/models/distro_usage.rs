use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::AppError;
use crate::models::telemetry::non_negative;

/// Decimal places kept when converting bytes to GB.
pub const GB_DECIMAL_PLACES: i32 = 2;

const BYTES_PER_GB: f64 = 1_000_000_000.0;

/// Raw row of the `distrousage` table.
#[derive(Debug, Clone, FromRow)]
pub struct DistroUsageRow {
    pub id: i64,
    pub time: String,
    pub distro: String,
    pub bytes: i64,
}

/// Daily bandwidth for one distro or project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistroUsageEntry {
    pub date: String,
    pub distro: String,
    pub bytes: u64,
    #[serde(rename = "GB")]
    pub gb: f64,
}

impl TryFrom<DistroUsageRow> for DistroUsageEntry {
    type Error = AppError;

    fn try_from(row: DistroUsageRow) -> Result<Self, Self::Error> {
        let bytes = non_negative(row.bytes, "bytes", row.id)?;
        Ok(DistroUsageEntry {
            date: row.time,
            distro: row.distro,
            bytes,
            gb: bytes_to_gb(bytes),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DistroUsageArgs {
    /// Restrict to these distros; absent or empty means all of them
    pub distros: Option<Vec<String>>,
    /// Exact date key
    pub date: Option<String>,
    /// Lookback window in days
    pub last_days: Option<i64>,
    /// Re-sort the capped result by descending byte count
    pub sort_biggest: Option<bool>,
}

/// Converts bytes to decimal gigabytes rounded to [`GB_DECIMAL_PLACES`].
pub fn bytes_to_gb(bytes: u64) -> f64 {
    let scale = 10f64.powi(GB_DECIMAL_PLACES);
    (bytes as f64 / (BYTES_PER_GB / scale)).round() / scale
}
