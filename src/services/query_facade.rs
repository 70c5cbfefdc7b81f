//! Named query operations over the telemetry store.
//!
//! The facade is what a transport binds to: every operation has a name,
//! a declared argument shape and a declared result shape, and dispatch
//! forwards straight to the resolvers. Errors pass through unchanged.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    database::TelemetryStore,
    errors::{AppError, Result},
    models::{DistroUsageArgs, DistroUsageEntry, Granularity, Pagination, TimeEntry, TotalEntry},
    services::{distro_usage::DistroUsageResolver, resolvers::TimeResolver},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Hour,
    Day,
    Month,
    Hours,
    Days,
    Months,
    Total,
    #[serde(rename = "distrousage")]
    DistroUsage,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::Hour,
        Operation::Day,
        Operation::Month,
        Operation::Hours,
        Operation::Days,
        Operation::Months,
        Operation::Total,
        Operation::DistroUsage,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Hour => "hour",
            Operation::Day => "day",
            Operation::Month => "month",
            Operation::Hours => "hours",
            Operation::Days => "days",
            Operation::Months => "months",
            Operation::Total => "total",
            Operation::DistroUsage => "distrousage",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn descriptor(&self) -> OperationDescriptor {
        const DATE: &str = "Date in format MMM/DD/YYYY";
        const FIRST: &str = "The first n entries in the store";
        const LAST: &str = "The last n entries in the store, most recent first";

        let (description, args, returns) = match self {
            Operation::Hour => (
                "Bandwidth for one hour of one day",
                vec![
                    ArgDescriptor::required("date", ArgType::String, DATE),
                    ArgDescriptor::required("hour", ArgType::Int, "Hour of the day, 0 to 23"),
                ],
                ResultShape::Single("TimeEntry"),
            ),
            Operation::Day => (
                "Bandwidth for one day",
                vec![ArgDescriptor::required("date", ArgType::String, DATE)],
                ResultShape::Single("TimeEntry"),
            ),
            Operation::Month => (
                "Bandwidth for the first month whose key contains the given fragment",
                vec![ArgDescriptor::required(
                    "date",
                    ArgType::String,
                    "Any part of the month key, e.g. a year",
                )],
                ResultShape::Single("TimeEntry"),
            ),
            Operation::Hours | Operation::Days | Operation::Months => (
                match self {
                    Operation::Hours => "Hourly bandwidth entries",
                    Operation::Days => "Daily bandwidth entries",
                    _ => "Monthly bandwidth entries",
                },
                vec![
                    ArgDescriptor::optional("first", ArgType::Int, FIRST),
                    ArgDescriptor::optional("last", ArgType::Int, LAST),
                ],
                ResultShape::List("TimeEntry"),
            ),
            Operation::Total => (
                "Total bytes ever passed through the mirror",
                vec![],
                ResultShape::Single("TotalEntry"),
            ),
            Operation::DistroUsage => (
                "Daily bandwidth for individual distros and projects, most recent first",
                vec![
                    ArgDescriptor::optional("distros", ArgType::StringList, "Distro names; all distros when absent"),
                    ArgDescriptor::optional("date", ArgType::String, DATE),
                    ArgDescriptor::optional("lastDays", ArgType::Int, "Lookback window in days"),
                    ArgDescriptor::optional(
                        "sortBiggest",
                        ArgType::Bool,
                        "Sort the returned rows by descending bytes",
                    ),
                ],
                ResultShape::List("DistroUsageEntry"),
            ),
        };

        OperationDescriptor {
            name: self.name(),
            description,
            args,
            returns,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgType {
    String,
    Int,
    Bool,
    StringList,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgDescriptor {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: ArgType,
    pub required: bool,
    pub description: &'static str,
}

impl ArgDescriptor {
    fn required(name: &'static str, ty: ArgType, description: &'static str) -> Self {
        Self { name, ty, required: true, description }
    }

    fn optional(name: &'static str, ty: ArgType, description: &'static str) -> Self {
        Self { name, ty, required: false, description }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "entity", rename_all = "snake_case")]
pub enum ResultShape {
    Single(&'static str),
    List(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub args: Vec<ArgDescriptor>,
    pub returns: ResultShape,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    Time(TimeEntry),
    Times(Vec<TimeEntry>),
    Total(TotalEntry),
    DistroUsage(Vec<DistroUsageEntry>),
}

impl QueryOutput {
    pub fn len(&self) -> usize {
        match self {
            QueryOutput::Time(_) | QueryOutput::Total(_) => 1,
            QueryOutput::Times(entries) => entries.len(),
            QueryOutput::DistroUsage(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HourArgs {
    date: String,
    hour: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DateArgs {
    date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

#[derive(Clone)]
pub struct QueryFacade {
    time: TimeResolver,
    distro_usage: DistroUsageResolver,
}

impl QueryFacade {
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self {
            time: TimeResolver::new(store.clone()),
            distro_usage: DistroUsageResolver::new(store),
        }
    }

    pub fn catalog() -> Vec<OperationDescriptor> {
        Operation::ALL.iter().map(Operation::descriptor).collect()
    }

    /// Dispatches an operation by name with JSON arguments. `null` means no
    /// arguments.
    pub async fn execute(&self, operation: &str, args: Value) -> Result<QueryOutput> {
        let op = Operation::from_name(operation)
            .ok_or_else(|| AppError::invalid(format!("unknown operation '{}'", operation)))?;

        match op {
            Operation::Hour => {
                let HourArgs { date, hour } = parse_args(op, args)?;
                self.hour(&date, hour).await.map(QueryOutput::Time)
            }
            Operation::Day => {
                let DateArgs { date } = parse_args(op, args)?;
                self.day(&date).await.map(QueryOutput::Time)
            }
            Operation::Month => {
                let DateArgs { date } = parse_args(op, args)?;
                self.month(&date).await.map(QueryOutput::Time)
            }
            Operation::Hours => self.hours(parse_args(op, args)?).await.map(QueryOutput::Times),
            Operation::Days => self.days(parse_args(op, args)?).await.map(QueryOutput::Times),
            Operation::Months => self.months(parse_args(op, args)?).await.map(QueryOutput::Times),
            Operation::Total => {
                let NoArgs {} = parse_args(op, args)?;
                self.total().await.map(QueryOutput::Total)
            }
            Operation::DistroUsage => self
                .distrousage(parse_args(op, args)?)
                .await
                .map(QueryOutput::DistroUsage),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn hour(&self, date: &str, hour: i64) -> Result<TimeEntry> {
        self.time.hour(date, hour).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn day(&self, date: &str) -> Result<TimeEntry> {
        self.time.day(date).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn month(&self, date: &str) -> Result<TimeEntry> {
        self.time.month(date).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn hours(&self, pagination: Pagination) -> Result<Vec<TimeEntry>> {
        self.time.collection(Granularity::Hour, pagination).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn days(&self, pagination: Pagination) -> Result<Vec<TimeEntry>> {
        self.time.collection(Granularity::Day, pagination).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn months(&self, pagination: Pagination) -> Result<Vec<TimeEntry>> {
        self.time.collection(Granularity::Month, pagination).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn total(&self) -> Result<TotalEntry> {
        self.time.total().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn distrousage(&self, args: DistroUsageArgs) -> Result<Vec<DistroUsageEntry>> {
        self.distro_usage.resolve(args).await
    }
}

fn parse_args<T: DeserializeOwned>(op: Operation, args: Value) -> Result<T> {
    let args = match args {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(args)
        .map_err(|e| AppError::invalid(format!("invalid arguments for '{}': {}", op.name(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{KeyMatch, MockTelemetryStore};
    use crate::models::TimeRow;
    use serde_json::json;

    fn day_row() -> TimeRow {
        TimeRow {
            id: 1,
            time: "Mar/05/2019".to_string(),
            rx: 10,
            tx: 20,
            rate: 0.25,
        }
    }

    #[test]
    fn test_catalog_lists_every_operation() {
        let names: Vec<_> = QueryFacade::catalog().iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec!["hour", "day", "month", "hours", "days", "months", "total", "distrousage"]
        );
    }

    #[test]
    fn test_hour_descriptor() {
        let descriptor = Operation::Hour.descriptor();
        assert_eq!(descriptor.returns, ResultShape::Single("TimeEntry"));
        assert!(descriptor.args.iter().all(|a| a.required));

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["args"][1]["name"], "hour");
        assert_eq!(json["args"][1]["type"], "int");
        assert_eq!(json["returns"]["kind"], "single");
    }

    #[test]
    fn test_operation_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_name(op.name()), Some(op));
        }
        assert_eq!(Operation::from_name("weeks"), None);
    }

    #[tokio::test]
    async fn test_execute_dispatches_day() {
        let mut store = MockTelemetryStore::new();
        store
            .expect_time_row()
            .withf(|g, key| *g == Granularity::Day && *key == KeyMatch::Exact("Mar/05/2019".into()))
            .returning(|_, _| Ok(day_row()));

        let facade = QueryFacade::new(Arc::new(store));
        let output = facade.execute("day", json!({ "date": "Mar/05/2019" })).await.unwrap();

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({ "date": "Mar/05/2019", "rx": 10, "tx": 20, "rate": 0.25 })
        );
    }

    #[tokio::test]
    async fn test_execute_rejects_unknown_operation() {
        let facade = QueryFacade::new(Arc::new(MockTelemetryStore::new()));
        let err = facade.execute("weeks", Value::Null).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_execute_rejects_missing_required_argument() {
        let facade = QueryFacade::new(Arc::new(MockTelemetryStore::new()));

        let err = facade.execute("hour", json!({ "date": "Mar/05/2019" })).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let err = facade.execute("day", json!({ "day": "Mar/05/2019" })).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_execute_rejects_unknown_argument_names() {
        let facade = QueryFacade::new(Arc::new(MockTelemetryStore::new()));

        let err = facade.execute("days", json!({ "frist": 3 })).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let err = facade
            .execute("distrousage", json!({ "last_days": 1, "sort_biggest": true }))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let err = facade.execute("total", json!({ "since": "2019" })).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_execute_collection_without_args() {
        let mut store = MockTelemetryStore::new();
        store
            .expect_time_rows()
            .withf(|g, scan| *g == Granularity::Month && scan.limit.is_none())
            .returning(|_, _| Ok(vec![]));

        let facade = QueryFacade::new(Arc::new(store));
        let output = facade.execute("months", Value::Null).await.unwrap();
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_execute_propagates_not_found() {
        let mut store = MockTelemetryStore::new();
        store.expect_time_row().returning(|_, _| Err(AppError::NotFound));

        let facade = QueryFacade::new(Arc::new(store));
        let err = facade.execute("month", json!({ "date": "1999" })).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn test_execute_total() {
        let mut store = MockTelemetryStore::new();
        store.expect_aggregate_total().returning(|| Ok(42));

        let facade = QueryFacade::new(Arc::new(store));
        let output = facade.execute("total", json!({})).await.unwrap();
        assert_eq!(output, QueryOutput::Total(TotalEntry { total: 42 }));
    }
}
