//! Executor boundary: the only place sqlmold touches a connection.

use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::Value;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// A connection-like handle that can run SQL.
///
/// Implemented for `tokio_postgres::Client` and `tokio_postgres::Transaction`, so
/// any operation can run inside a transaction the caller opened. The trait is
/// object safe; eager-load callbacks receive it as `&dyn Executor`.
///
/// sqlmold issues exactly one call per built statement and never retries.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute a statement and return the number of affected rows.
    async fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<u64>;

    /// Execute a query and return all rows.
    async fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>>;

    /// Execute a query and return the **first** row.
    ///
    /// Semantics:
    /// - 0 rows: returns [`OrmError::NotFound`]
    /// - 1 row: returns that row
    /// - multiple rows: returns the first row (does **not** error)
    async fn query_row(&self, sql: &str, args: &[Value]) -> OrmResult<Row> {
        let rows = self.query(sql, args).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| OrmError::not_found("Expected one row, got none"))
    }
}

fn pg_params(args: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    args.iter().map(|a| a as &(dyn ToSql + Sync)).collect()
}

#[async_trait]
impl Executor for tokio_postgres::Client {
    async fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<u64> {
        tokio_postgres::Client::execute(self, sql, &pg_params(args))
            .await
            .map_err(OrmError::from_db_error)
    }

    async fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        let rows = tokio_postgres::Client::query(self, sql, &pg_params(args))
            .await
            .map_err(OrmError::from_db_error)?;
        Row::from_pg_rows(&rows)
    }
}

#[async_trait]
impl Executor for tokio_postgres::Transaction<'_> {
    async fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<u64> {
        tokio_postgres::Transaction::execute(self, sql, &pg_params(args))
            .await
            .map_err(OrmError::from_db_error)
    }

    async fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        let rows = tokio_postgres::Transaction::query(self, sql, &pg_params(args))
            .await
            .map_err(OrmError::from_db_error)?;
        Row::from_pg_rows(&rows)
    }
}

macro_rules! forward_executor {
    ($($wrapper:ty),*) => {
        $(
            #[async_trait]
            impl<E: Executor + ?Sized> Executor for $wrapper {
                async fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<u64> {
                    (**self).exec(sql, args).await
                }

                async fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
                    (**self).query(sql, args).await
                }

                async fn query_row(&self, sql: &str, args: &[Value]) -> OrmResult<Row> {
                    (**self).query_row(sql, args).await
                }
            }
        )*
    };
}

forward_executor!(&E, Box<E>, Arc<E>);
