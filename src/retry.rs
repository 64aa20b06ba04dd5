use std::time::Duration;
use tokio::time::sleep;
use crate::config::ExplorerConfig;
use crate::error::LedgerError;
use crate::logging::{LogContext, ErrorLogger, PerformanceMonitor};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first call included
    pub max_attempts: u32,
    /// Initial delay between retries in seconds
    pub initial_delay_seconds: u64,
    /// Maximum delay between retries in seconds
    pub max_delay_seconds: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Whether to add jitter to prevent thundering herd
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_seconds: 1,
            max_delay_seconds: 60,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Configuration for TzKT explorer calls
    pub fn for_explorer() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_seconds: 2,
            max_delay_seconds: 30,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl From<&ExplorerConfig> for RetryConfig {
    fn from(config: &ExplorerConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            initial_delay_seconds: config.retry_delay_seconds,
            max_delay_seconds: config.max_retry_delay_seconds,
            ..Self::for_explorer()
        }
    }
}

/// Retry mechanism with exponential backoff and jitter
pub struct RetryManager {
    config: RetryConfig,
    operation_name: String,
}

impl RetryManager {
    pub fn new(operation_name: &str, config: RetryConfig) -> Self {
        Self {
            config,
            operation_name: operation_name.to_string(),
        }
    }

    /// Execute an operation, retrying recoverable failures
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, LedgerError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, LedgerError>>,
    {
        let monitor = PerformanceMonitor::new(&format!("retry_{}", self.operation_name));
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let attempt_monitor = PerformanceMonitor::new(&format!("{}_attempt_{}", self.operation_name, attempt));

            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        ErrorLogger::log_recovery_success(
                            &self.operation_name,
                            attempt,
                            monitor.elapsed_ms(),
                        );
                    }
                    attempt_monitor.finish();
                    return Ok(result);
                }
                Err(error) => {
                    attempt_monitor.finish_with_result::<(), &LedgerError>(&Err(&error));

                    if !error.is_recoverable() {
                        LogContext::new("retry", &self.operation_name)
                            .with_retry_count(attempt)
                            .with_metadata("reason", serde_json::json!("non_recoverable"))
                            .error(&format!("Non-recoverable error, aborting retries: {}", error));
                        return Err(error);
                    }

                    ErrorLogger::log_recovery_attempt(&error, attempt, max_attempts);

                    if attempt >= max_attempts {
                        last_error = Some(error);
                        break;
                    }

                    let delay = self.delay_for(attempt, &error);

                    LogContext::new("retry", &self.operation_name)
                        .with_retry_count(attempt)
                        .with_metadata("delay_ms", serde_json::json!(delay.as_millis() as u64))
                        .with_metadata("max_attempts", serde_json::json!(max_attempts))
                        .info(&format!("Retrying in {:?} (attempt {} of {})", delay, attempt, max_attempts));

                    sleep(delay).await;
                    last_error = Some(error);
                }
            }
        }

        let final_error = last_error.unwrap_or_else(|| {
            LedgerError::System(crate::error::SystemError::ResourceExhausted(
                "All retry attempts exhausted".to_string()
            ))
        });

        LogContext::new("retry", &self.operation_name)
            .with_metadata("max_attempts", serde_json::json!(max_attempts))
            .error(&format!("All {} retry attempts failed: {}", max_attempts, final_error));

        Err(final_error)
    }

    /// Rate limits carry the server's own back-off hint, which wins over the
    /// exponential schedule as long as it fits under the configured cap.
    fn delay_for(&self, attempt: u32, error: &LedgerError) -> Duration {
        match error {
            LedgerError::Explorer(crate::error::ExplorerError::RateLimit { seconds }) => {
                Duration::from_secs((*seconds).min(self.config.max_delay_seconds))
            }
            _ => self.calculate_delay(attempt),
        }
    }

    /// Calculate delay for the given attempt number
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.config.initial_delay_seconds as f64;
        let exponential_delay = base_delay * self.config.backoff_multiplier.powi(attempt as i32 - 1);

        let capped_delay = exponential_delay.min(self.config.max_delay_seconds as f64);

        let final_delay = if self.config.jitter {
            let jitter_factor = 0.1; // 10% jitter
            let jitter = capped_delay * jitter_factor * (rand::random::<f64>() - 0.5);
            (capped_delay + jitter).max(0.0)
        } else {
            capped_delay
        };

        Duration::from_secs_f64(final_delay)
    }
}

/// Convenience wrapper for one-off retried calls
pub struct RetryUtils;

impl RetryUtils {
    /// Retry with custom configuration
    pub async fn retry_with_config<T, F, Fut>(
        operation_name: &str,
        config: RetryConfig,
        operation: F,
    ) -> Result<T, LedgerError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, LedgerError>>,
    {
        let retry_manager = RetryManager::new(operation_name, config);
        retry_manager.execute(operation).await
    }
}
