use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Instant;

pub struct MetricsService {
    registry: Registry,
    http_requests: IntCounterVec,
    request_duration: HistogramVec,
    errors: IntCounterVec,
    query_operations: IntCounterVec,
}

impl MetricsService {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests by method and status"),
            &["method", "status"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "Request latency by endpoint"),
            &["endpoint"],
        )?;
        let errors = IntCounterVec::new(
            Opts::new("errors_total", "Errors by type"),
            &["type"],
        )?;
        let query_operations = IntCounterVec::new(
            Opts::new("query_operations_total", "Query operations by name and outcome"),
            &["operation", "outcome"],
        )?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(query_operations.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            request_duration,
            errors,
            query_operations,
        })
    }

    pub fn record_request(&self, method: &str, status: u16) {
        let status = status.to_string();
        self.http_requests
            .with_label_values(&[method, status.as_str()])
            .inc();
    }

    pub fn record_error(&self, error_type: &str) {
        self.errors.with_label_values(&[error_type]).inc();
    }

    /// `outcome` is `ok` or an `AppError::kind` label.
    pub fn record_query(&self, operation: &str, outcome: &str) {
        self.query_operations
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn start_timer(&self, endpoint: String) -> RequestTimer {
        RequestTimer {
            start: Instant::now(),
            endpoint,
            histogram: self.request_duration.clone(),
        }
    }

    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Records the elapsed time into `request_duration_seconds` when dropped.
pub struct RequestTimer {
    start: Instant,
    endpoint: String,
    histogram: HistogramVec,
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.histogram
            .with_label_values(&[self.endpoint.as_str()])
            .observe(duration.as_secs_f64());
    }
}
