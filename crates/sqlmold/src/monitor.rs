//! SQL logging for any [`Executor`].
//!
//! [`LoggingExecutor`] wraps an executor and emits one `tracing` event per
//! statement under the `sqlmold.sql` target: the SQL (optionally truncated),
//! the argument count, the elapsed time and the outcome. It can also enforce a
//! client-side deadline.
//!
//! ```ignore
//! use sqlmold::{LogConfig, LoggingExecutor};
//! use std::time::Duration;
//!
//! let exec = LoggingExecutor::new(client).with_config(
//!     LogConfig::new()
//!         .with_query_timeout(Duration::from_secs(5))
//!         .with_slow_query_threshold(Duration::from_millis(200)),
//! );
//! ```

use crate::client::Executor;
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::Value;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::Level;

/// Configuration for [`LoggingExecutor`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level successful statements are logged at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    /// Include argument values in the event.
    pub log_args: bool,
    /// Client-side deadline per statement. `None` means no timeout (default).
    pub query_timeout: Option<Duration>,
    /// Statements slower than this are logged at `WARN`.
    pub slow_query_threshold: Option<Duration>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
            log_args: false,
            query_timeout: None,
            slow_query_threshold: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Log argument values alongside the SQL.
    pub fn with_args(mut self) -> Self {
        self.log_args = true;
        self
    }

    /// Statements exceeding this duration fail with [`OrmError::Timeout`].
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }
}

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// An executor wrapper that logs every statement through `tracing`.
pub struct LoggingExecutor<E> {
    inner: E,
    config: LogConfig,
}

impl<E: Executor> LoggingExecutor<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            config: LogConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Get a reference to the inner executor.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Get the inner executor, consuming this wrapper.
    pub fn into_inner(self) -> E {
        self.inner
    }

    fn display_sql<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.config.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)).into(),
            _ => sql.into(),
        }
    }

    fn emit(
        &self,
        op: &'static str,
        sql: &str,
        args: &[Value],
        elapsed: Duration,
        err: Option<&OrmError>,
    ) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.display_sql(sql);
        let arg_count = args.len();
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let args = self.config.log_args.then(|| tracing::field::debug(args));

        if let Some(err) = err {
            tracing::warn!(
                target: "sqlmold.sql",
                op,
                arg_count,
                elapsed_ms,
                sql = %sql,
                error = %err,
                "statement failed"
            );
            return;
        }

        let slow = self
            .config
            .slow_query_threshold
            .is_some_and(|threshold| elapsed > threshold);
        let level = if slow { Level::WARN } else { self.config.level };
        emit_at_level!(
            level,
            target: "sqlmold.sql",
            op,
            slow,
            arg_count,
            elapsed_ms,
            sql = %sql,
            args = args,
        );
    }

    async fn run<T, F>(
        &self,
        op: &'static str,
        sql: &str,
        args: &[Value],
        future: F,
    ) -> OrmResult<T>
    where
        F: std::future::Future<Output = OrmResult<T>> + Send,
    {
        let start = Instant::now();
        let result = match self.config.query_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, future).await {
                Ok(result) => result,
                Err(_) => Err(OrmError::Timeout(timeout)),
            },
            None => future.await,
        };
        self.emit(op, sql, args, start.elapsed(), result.as_ref().err());
        result
    }
}

#[async_trait]
impl<E: Executor> Executor for LoggingExecutor<E> {
    async fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<u64> {
        self.run("exec", sql, args, self.inner.exec(sql, args)).await
    }

    async fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        self.run("query", sql, args, self.inner.query(sql, args)).await
    }

    async fn query_row(&self, sql: &str, args: &[Value]) -> OrmResult<Row> {
        self.run("query_row", sql, args, self.inner.query_row(sql, args)).await
    }
}
