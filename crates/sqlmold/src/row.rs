//! Driver-neutral result rows.

use crate::error::{OrmError, OrmResult};
use crate::value::{FromValue, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::sync::Arc;
use std::error::Error;
use tokio_postgres::types::{FromSql, FromSqlOwned, Kind, Type};

/// One result row: shared column names plus the values in column order.
///
/// Rows from the same result set share one `columns` allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row. `values` must be in the same order as `columns`.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the first column named `column`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx)
    }

    /// Typed access by column name, returning [`OrmError::Decode`] on failure.
    pub fn try_get<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self
            .get(column)
            .ok_or_else(|| OrmError::decode(column, "no such column"))?;
        T::from_value(value.clone()).map_err(|e| OrmError::decode(column, e))
    }

    /// Decode a `tokio_postgres` row, picking the [`Value`] variant from each column's type.
    pub fn from_pg(row: &tokio_postgres::Row) -> OrmResult<Self> {
        let columns: Arc<[String]> = row
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        Self::from_pg_with_columns(row, columns)
    }

    /// Decode a batch of rows so they share one column list.
    pub fn from_pg_rows(rows: &[tokio_postgres::Row]) -> OrmResult<Vec<Self>> {
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let columns: Arc<[String]> = first
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        rows.iter()
            .map(|row| Self::from_pg_with_columns(row, columns.clone()))
            .collect()
    }

    fn from_pg_with_columns(row: &tokio_postgres::Row, columns: Arc<[String]>) -> OrmResult<Self> {
        let mut values = Vec::with_capacity(columns.len());
        for (idx, column) in row.columns().iter().enumerate() {
            values.push(decode_pg(row, idx, column.type_())?);
        }
        Ok(Self { columns, values })
    }
}

fn get_opt<T: FromSqlOwned>(row: &tokio_postgres::Row, idx: usize) -> OrmResult<Option<T>> {
    row.try_get::<_, Option<T>>(idx).map_err(|e| {
        let name = row.columns()[idx].name();
        OrmError::decode(name, e.to_string())
    })
}

fn decode_pg(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> OrmResult<Value> {
    let value = if *ty == Type::BOOL {
        get_opt::<bool>(row, idx)?.map(Value::Bool)
    } else if *ty == Type::INT2 {
        get_opt::<i16>(row, idx)?.map(|v| Value::Int(v.into()))
    } else if *ty == Type::INT4 {
        get_opt::<i32>(row, idx)?.map(|v| Value::Int(v.into()))
    } else if *ty == Type::INT8 {
        get_opt::<i64>(row, idx)?.map(Value::Int)
    } else if *ty == Type::OID {
        get_opt::<u32>(row, idx)?.map(|v| Value::Int(v.into()))
    } else if *ty == Type::FLOAT4 {
        get_opt::<f32>(row, idx)?.map(|v| Value::Float(v.into()))
    } else if *ty == Type::FLOAT8 {
        get_opt::<f64>(row, idx)?.map(Value::Float)
    } else if *ty == Type::BYTEA {
        get_opt::<Vec<u8>>(row, idx)?.map(Value::Bytes)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        get_opt::<serde_json::Value>(row, idx)?.map(Value::Json)
    } else if *ty == Type::DATE {
        get_opt::<NaiveDate>(row, idx)?.map(Value::Date)
    } else if *ty == Type::TIMESTAMP {
        get_opt::<NaiveDateTime>(row, idx)?.map(Value::Timestamp)
    } else if *ty == Type::TIMESTAMPTZ {
        get_opt::<DateTime<Utc>>(row, idx)?.map(Value::TimestampTz)
    } else if *ty == Type::UUID {
        get_opt::<uuid::Uuid>(row, idx)?.map(Value::Uuid)
    } else if matches!(ty.kind(), Kind::Enum(_)) {
        get_opt::<EnumText>(row, idx)?.map(|v| Value::Text(v.0))
    } else {
        // text, varchar, bpchar, name, citext. Anything else (numeric,
        // intervals, arrays, ranges) is a decode error; cast it in SQL.
        get_opt::<String>(row, idx)?.map(Value::Text)
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Enum labels arrive as their UTF-8 text, which `String` refuses to accept.
struct EnumText(String);

impl<'a> FromSql<'a> for EnumText {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Self(std::str::from_utf8(raw)?.to_owned()))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(ty.kind(), Kind::Enum(_))
    }
}
