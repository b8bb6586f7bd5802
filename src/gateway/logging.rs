use log::{debug, error, info, trace, warn};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::gateway::errors::GatewayError;

/// Structured logging and session statistics for a run of conversions
pub struct ConversionLogger {
    start_time: Instant,
    operation_timers: HashMap<String, Instant>,
    stats: LoggingStats,
}

/// Statistics for logging operations
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoggingStats {
    pub total_operations: usize,
    pub successful_operations: usize,
    pub failed_operations: usize,
    pub warnings_count: usize,
    pub errors_count: usize,
    pub bytes_converted: u64,
}

#[derive(Debug, Clone, Copy)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Context information for structured logging
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    pub operation: String,
    pub source: Option<String>,
    pub additional_data: HashMap<String, String>,
}

impl LogContext {
    fn new(operation: &str, source: &str) -> Self {
        Self {
            operation: operation.to_string(),
            source: Some(source.to_string()),
            additional_data: HashMap::new(),
        }
    }

    fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.additional_data.insert(key.to_string(), value.to_string());
        self
    }
}

impl ConversionLogger {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            operation_timers: HashMap::new(),
            stats: LoggingStats::default(),
        }
    }

    /// Start timing an operation
    pub fn start_operation(&mut self, operation_name: &str) {
        self.operation_timers
            .insert(operation_name.to_string(), Instant::now());
        info!("🚀 Starting operation: {}", operation_name);
    }

    /// End timing an operation and log the duration
    pub fn end_operation(&mut self, operation_name: &str, success: bool) -> Option<Duration> {
        let start_time = self.operation_timers.remove(operation_name)?;
        let duration = start_time.elapsed();
        let status = if success { "✅ SUCCESS" } else { "❌ FAILED" };
        info!("{} Operation '{}' completed in {:?}", status, operation_name, duration);

        self.stats.total_operations += 1;
        if success {
            self.stats.successful_operations += 1;
        } else {
            self.stats.failed_operations += 1;
        }
        Some(duration)
    }

    /// Log a finished HTML conversion
    pub fn log_conversion(&mut self, source: &str, input_size: u64, output_size: usize) {
        let context = LogContext::new("html_conversion", source)
            .with("input_size_bytes", input_size)
            .with("output_size_bytes", output_size)
            .with(
                "compression_ratio",
                format!("{:.2}", output_size as f64 / input_size.max(1) as f64),
            );

        info!("📝 HTML conversion: {} ({} bytes -> {} bytes)", source, input_size, output_size);
        self.stats.bytes_converted += input_size;
        self.log_structured(LogLevel::Debug, "HTML conversion completed", &context);
    }

    /// Log a failed conversion request
    pub fn log_failure(&mut self, source: &str, err: &GatewayError) {
        let context = LogContext::new("conversion_failure", source)
            .with("status", err.status_code())
            .with("error", err.label());

        match err {
            GatewayError::Validation(_) | GatewayError::UnsupportedSource(_) => {
                warn!("⚠️  Rejected {}: {}", source, err);
                self.stats.warnings_count += 1;
            }
            GatewayError::Http(_) | GatewayError::Configuration(_) => {
                error!("❌ Conversion failed for {}: {}", source, err);
                self.stats.errors_count += 1;
            }
        }
        self.log_structured(LogLevel::Debug, "Conversion failed", &context);
    }

    pub fn get_stats(&self) -> &LoggingStats {
        &self.stats
    }

    /// Get total elapsed time since logger creation
    pub fn get_total_elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn log_final_summary(&self) {
        let total_time = self.get_total_elapsed();

        info!("🏁 Conversion session completed in {:?}", total_time);
        info!("📊 Final statistics:");
        info!("   Total operations: {}", self.stats.total_operations);
        info!("   Successful: {}", self.stats.successful_operations);
        info!("   Failed: {}", self.stats.failed_operations);
        info!("   Warnings: {}", self.stats.warnings_count);
        info!("   Errors: {}", self.stats.errors_count);
        info!("   HTML converted: {} bytes", self.stats.bytes_converted);

        let success_rate = if self.stats.total_operations > 0 {
            (self.stats.successful_operations as f64 / self.stats.total_operations as f64) * 100.0
        } else {
            0.0
        };
        info!("   Success rate: {:.1}%", success_rate);
    }

    fn log_structured(&self, level: LogLevel, message: &str, context: &LogContext) {
        let log_entry = format!(
            "[{}] {} | Source: {} | Data: {:?}",
            context.operation,
            message,
            context.source.as_deref().unwrap_or("N/A"),
            context.additional_data
        );

        match level {
            LogLevel::Trace => trace!("{}", log_entry),
            LogLevel::Debug => debug!("{}", log_entry),
            LogLevel::Info => info!("{}", log_entry),
            LogLevel::Warn => warn!("{}", log_entry),
            LogLevel::Error => error!("{}", log_entry),
        }
    }
}

impl Default for ConversionLogger {
    fn default() -> Self {
        Self::new()
    }
}
