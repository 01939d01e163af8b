//! Running a built [`Query`] and binding its results.

use super::Query;
use crate::bind::{Bindable, bind_rows, compile_mapping, scan_row};
use crate::client::Executor;
use crate::eager::load_relationships;
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use serde::{Deserialize, Serialize};

/// What a singular bind does with a result set of more than one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindMode {
    /// Scan every row onto the same object; the last row's values win.
    #[default]
    LastRowWins,
    /// Fail with [`OrmError::TooManyRows`].
    Strict,
}

impl Query {
    /// Execute the statement and return the number of affected rows.
    pub async fn exec<E: Executor + ?Sized>(&self, exec: &E) -> OrmResult<u64> {
        let (sql, args) = self.build();
        exec.exec(&sql, &args).await.map_err(|e| e.in_op("exec"))
    }

    /// Execute the statement and return all rows.
    pub async fn query<E: Executor + ?Sized>(&self, exec: &E) -> OrmResult<Vec<Row>> {
        let (sql, args) = self.build();
        exec.query(&sql, &args).await.map_err(|e| e.in_op("query"))
    }

    /// Execute the statement and return the first row.
    pub async fn query_row<E: Executor + ?Sized>(&self, exec: &E) -> OrmResult<Row> {
        let (sql, args) = self.build();
        exec.query_row(&sql, &args)
            .await
            .map_err(|e| e.in_op("query_row"))
    }

    /// Bind the result set into a single `T`, then eager load the query's
    /// load paths onto it.
    ///
    /// Zero rows is [`OrmError::NotFound`]. More than one row follows the
    /// query's [`BindMode`]. Mapping and decode failures are wrapped as the
    /// `"bind"` operation.
    pub async fn bind_one<T: Bindable, E: Executor>(&self, exec: &E) -> OrmResult<T> {
        let rows = self.query(exec).await?;
        let mut obj = self.scan_one::<T>(&rows).map_err(|e| e.in_op("bind"))?;

        if !self.load.is_empty() {
            load_relationships(exec, &self.load, true, &mut [&mut obj]).await?;
        }
        Ok(obj)
    }

    /// Bind every row into a new `T` in result order, then eager load the
    /// query's load paths onto the whole batch.
    pub async fn bind_all<T: Bindable, E: Executor>(&self, exec: &E) -> OrmResult<Vec<T>> {
        let rows = self.query(exec).await?;
        let mut objs = bind_rows::<T>(&rows).map_err(|e| e.in_op("bind"))?;

        if !self.load.is_empty() && !objs.is_empty() {
            let mut targets: Vec<&mut T> = objs.iter_mut().collect();
            load_relationships(exec, &self.load, false, &mut targets).await?;
        }
        Ok(objs)
    }

    fn scan_one<T: Bindable>(&self, rows: &[Row]) -> OrmResult<T> {
        let Some(first) = rows.first() else {
            return Err(OrmError::not_found(format!(
                "bind failed to find any {} rows",
                std::any::type_name::<T>()
            )));
        };
        if self.bind_mode == BindMode::Strict && rows.len() > 1 {
            return Err(OrmError::too_many_rows(1, rows.len()));
        }

        let mapping = compile_mapping::<T>(first.columns())?;
        let mut obj = T::default();
        for row in rows {
            scan_row(&mut obj, &mapping, row)?;
        }
        Ok(obj)
    }
}
