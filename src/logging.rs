use log::{info, Level};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::LoggingConfig;

/// Structured logging context for the ledger extractor.
///
/// Each call emits one JSON object through the `log` facade. Metadata keys
/// are kept sorted so identical contexts render identically.
pub struct LogContext {
    pub component: String,
    pub operation: String,
    pub metadata: BTreeMap<String, Value>,
}

impl LogContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Block level; stored as `block_level` so it never shadows the log level
    pub fn with_level(self, level: u64) -> Self {
        self.with_metadata("block_level", json!(level))
    }

    pub fn with_operation_hash(self, hash: &str) -> Self {
        self.with_metadata("operation_hash", json!(hash))
    }

    pub fn with_address(self, address: &str) -> Self {
        self.with_metadata("address", json!(address))
    }

    pub fn with_value(self, value: &str) -> Self {
        self.with_metadata("value", json!(value))
    }

    pub fn with_duration_ms(self, duration_ms: u64) -> Self {
        self.with_metadata("duration_ms", json!(duration_ms))
    }

    pub fn with_retry_count(self, retry_count: u32) -> Self {
        self.with_metadata("retry_count", json!(retry_count))
    }

    fn format_message(&self, level: Level, message: &str) -> String {
        let mut entry = serde_json::Map::new();
        entry.insert("timestamp".into(), json!(chrono::Utc::now().to_rfc3339()));
        entry.insert("level".into(), json!(level.as_str()));
        entry.insert("component".into(), json!(self.component));
        entry.insert("operation".into(), json!(self.operation));
        entry.insert("message".into(), json!(message));

        for (key, value) in &self.metadata {
            entry.entry(key.clone()).or_insert_with(|| value.clone());
        }

        Value::Object(entry).to_string()
    }

    /// Emit at an explicit level
    pub fn log(&self, level: Level, message: &str) {
        if log::log_enabled!(level) {
            log::log!(level, "{}", self.format_message(level, message));
        }
    }

    pub fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    pub fn trace(&self, message: &str) {
        self.log(Level::Trace, message);
    }
}

/// Times an operation and logs its duration when finished
pub struct PerformanceMonitor {
    started: Instant,
    operation: String,
    metadata: BTreeMap<String, Value>,
}

impl PerformanceMonitor {
    pub fn new(operation: &str) -> Self {
        Self {
            started: Instant::now(),
            operation: operation.to_string(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Milliseconds since the monitor was created
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn into_context(self, duration: u64) -> LogContext {
        let mut context = LogContext::new("performance", &self.operation)
            .with_duration_ms(duration);
        for (key, value) in self.metadata {
            context = context.with_metadata(&key, value);
        }
        context
    }

    pub fn finish(self) -> u64 {
        let duration = self.elapsed_ms();
        self.into_context(duration)
            .debug(&format!("Operation completed in {}ms", duration));
        duration
    }

    pub fn finish_with_result<T, E>(self, result: &Result<T, E>) -> u64
    where
        E: std::fmt::Display,
    {
        let duration = self.elapsed_ms();
        let context = self.into_context(duration);

        match result {
            Ok(_) => {
                context.debug(&format!("Operation completed successfully in {}ms", duration));
            }
            Err(e) => {
                context
                    .with_metadata("error", json!(e.to_string()))
                    .warn(&format!("Operation failed after {}ms: {}", duration, e));
            }
        }

        duration
    }
}

/// Error logging utilities
pub struct ErrorLogger;

impl ErrorLogger {
    pub fn log_error(error: &crate::error::LedgerError, context: Option<LogContext>) {
        let severity = error.severity();

        let mut log_context = context
            .unwrap_or_else(|| LogContext::new("error", "unknown"))
            .with_metadata("error_type", json!(format!("{:?}", error)))
            .with_metadata("severity", json!(format!("{:?}", severity)))
            .with_metadata("recoverable", json!(error.is_recoverable()));

        if let Some(delay) = error.retry_delay() {
            log_context = log_context.with_metadata("retry_delay_seconds", json!(delay));
        }

        let message = format!("Error occurred: {}", error);

        match severity {
            crate::error::ErrorSeverity::Critical | crate::error::ErrorSeverity::High => {
                log_context.error(&message)
            }
            crate::error::ErrorSeverity::Medium => log_context.warn(&message),
            crate::error::ErrorSeverity::Low => log_context.info(&message),
        }
    }

    pub fn log_recovery_attempt(error: &crate::error::LedgerError, attempt: u32, max_attempts: u32) {
        let context = LogContext::new("recovery", "retry_attempt")
            .with_retry_count(attempt)
            .with_metadata("max_attempts", json!(max_attempts))
            .with_metadata("error_type", json!(format!("{:?}", error)));

        if attempt == max_attempts {
            context.error(&format!("Final retry attempt failed: {}", error));
        } else {
            context.warn(&format!("Retry attempt {} of {}: {}", attempt, max_attempts, error));
        }
    }

    pub fn log_recovery_success(operation: &str, attempts: u32, total_duration_ms: u64) {
        LogContext::new("recovery", "success")
            .with_metadata("retried_operation", json!(operation))
            .with_retry_count(attempts)
            .with_duration_ms(total_duration_ms)
            .info(&format!("Operation recovered after {} attempts in {}ms", attempts, total_duration_ms));
    }
}

/// Domain metrics emitted as structured log lines
pub struct MetricsLogger;

impl MetricsLogger {
    pub fn log_block_extracted(level: u64, transaction_count: usize, record_count: usize, duration_ms: u64) {
        LogContext::new("metrics", "block_extracted")
            .with_level(level)
            .with_metadata("transaction_count", json!(transaction_count))
            .with_metadata("record_count", json!(record_count))
            .with_duration_ms(duration_ms)
            .info(&format!(
                "Block {} extracted: {} transactions, {} ledger records",
                level, transaction_count, record_count
            ));
    }

    pub fn log_explorer_call(endpoint: &str, duration_ms: u64, success: bool) {
        let context = LogContext::new("metrics", "explorer_call")
            .with_metadata("endpoint", json!(endpoint))
            .with_duration_ms(duration_ms)
            .with_metadata("success", json!(success));

        if success {
            context.debug(&format!("Explorer call {} completed in {}ms", endpoint, duration_ms));
        } else {
            context.warn(&format!("Explorer call {} failed after {}ms", endpoint, duration_ms));
        }
    }

    pub fn log_database_operation(operation: &str, duration_ms: u64, rows_affected: Option<usize>) {
        let mut context = LogContext::new("metrics", "database_operation")
            .with_metadata("db_operation", json!(operation))
            .with_duration_ms(duration_ms);

        if let Some(rows) = rows_affected {
            context = context.with_metadata("rows_affected", json!(rows));
        }

        context.debug(&format!("Database {} completed in {}ms", operation, duration_ms));
    }

    pub fn log_index_status(head_level: u64, last_processed_level: u64, total_records: u64) {
        let levels_behind = head_level.saturating_sub(last_processed_level);
        let context = LogContext::new("metrics", "index_status")
            .with_metadata("head_level", json!(head_level))
            .with_metadata("last_processed_level", json!(last_processed_level))
            .with_metadata("levels_behind", json!(levels_behind))
            .with_metadata("total_records", json!(total_records));

        if levels_behind > 10 {
            context.warn(&format!(
                "Index is {} levels behind (head: {}, processed: {})",
                levels_behind, head_level, last_processed_level
            ));
        } else {
            context.info(&format!(
                "Index status: {} levels behind, {} ledger records",
                levels_behind, total_records
            ));
        }
    }
}

/// Initialize logging. `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pretty = config.format == "pretty";

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.level.as_str()))
        .format(move |buf, record| {
            use std::io::Write;

            let message = record.args().to_string();
            match serde_json::from_str::<Value>(&message) {
                Ok(json_value) if json_value.is_object() => {
                    if pretty {
                        writeln!(buf, "{}", serde_json::to_string_pretty(&json_value)?)
                    } else {
                        writeln!(buf, "{}", json_value)
                    }
                }
                _ => writeln!(
                    buf,
                    "{} [{}] {}: {}",
                    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ),
            }
        })
        .try_init()?;

    info!("Structured logging initialized");
    Ok(())
}
