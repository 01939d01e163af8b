//! Driver-neutral argument and result values.
//!
//! [`Value`] is what query arguments are stored as and what result rows are
//! decoded into. Field types convert through [`FromValue`] / [`ToValue`], and
//! `Value` encodes itself for `tokio-postgres` by looking at the parameter
//! type the server reports.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::error::Error;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use uuid::Uuid;

/// A single SQL value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type name used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
            Value::Uuid(_) => "uuid",
        }
    }
}

/// Build a `Vec<Value>` from heterogeneous literals.
///
/// ```ignore
/// let args = sqlmold::args![5_i64, "Bob", None::<i32>];
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::Value::from($value)),+]
    };
}

/// Convert a [`Value`] into a Rust field type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, String>;
}

/// Read a Rust field back out as a [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;
}

fn mismatch(expected: &str, got: &Value) -> String {
    format!("expected {expected}, got {}", got.kind())
}

macro_rules! value_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }

            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::$variant(self.clone())
                }
            }
        )*
    };
}

value_conversions! {
    bool => Bool,
    i64 => Int,
    f64 => Float,
    String => Text,
    Vec<u8> => Bytes,
    serde_json::Value => Json,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    Uuid => Uuid,
}

macro_rules! narrow_int_conversions {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Int(i64::from(v))
                }
            }

            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, String> {
                    match value {
                        Value::Int(v) => <$ty>::try_from(v)
                            .map_err(|_| format!("{v} is out of range for {}", stringify!($ty))),
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }
            }
        )*
    };
}

narrow_int_conversions!(i8, i16, i32, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToValue::to_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bool(v) => Ok(v),
            // MySQL and SQLite report booleans as integers.
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Int(v) => Ok(v),
            other => Err(mismatch("i64", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            other => Err(mismatch("f64", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, String> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bytes(v) => Ok(v),
            Value::Text(v) => Ok(v.into_bytes()),
            other => Err(mismatch("bytes", &other)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Json(v) => Ok(v),
            Value::Text(v) => serde_json::from_str(&v).map_err(|e| e.to_string()),
            other => Err(mismatch("json", &other)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Date(v) => Ok(v),
            other => Err(mismatch("date", &other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Timestamp(v) => Ok(v),
            Value::TimestampTz(v) => Ok(v.naive_utc()),
            other => Err(mismatch("timestamp", &other)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::TimestampTz(v) => Ok(v),
            Value::Timestamp(v) => Ok(v.and_utc()),
            other => Err(mismatch("timestamptz", &other)),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Uuid(v) => Ok(v),
            Value::Text(v) => Uuid::parse_str(&v).map_err(|e| e.to_string()),
            other => Err(mismatch("uuid", &other)),
        }
    }
}

type BoxError = Box<dyn Error + Sync + Send>;

fn encode<T: ToSql>(value: &T, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if !T::accepts(ty) {
        return Err(format!(
            "cannot encode {} as postgres type {}",
            std::any::type_name::<T>(),
            ty
        )
        .into());
    }
    value.to_sql(ty, out)
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => encode(v, ty, out),
            Value::Int(v) => {
                if *ty == Type::INT2 {
                    encode(&i16::try_from(*v)?, ty, out)
                } else if *ty == Type::INT4 {
                    encode(&i32::try_from(*v)?, ty, out)
                } else if *ty == Type::FLOAT4 {
                    encode(&(*v as f32), ty, out)
                } else if *ty == Type::FLOAT8 {
                    encode(&(*v as f64), ty, out)
                } else {
                    encode(v, ty, out)
                }
            }
            Value::Float(v) => {
                if *ty == Type::FLOAT4 {
                    encode(&(*v as f32), ty, out)
                } else {
                    encode(v, ty, out)
                }
            }
            Value::Text(v) => {
                if matches!(ty.kind(), Kind::Enum(_)) {
                    // Enum labels go over the wire as their raw text.
                    out.extend_from_slice(v.as_bytes());
                    Ok(IsNull::No)
                } else {
                    encode(v, ty, out)
                }
            }
            Value::Bytes(v) => encode(v, ty, out),
            Value::Json(v) => encode(v, ty, out),
            Value::Date(v) => encode(v, ty, out),
            Value::Timestamp(v) => encode(v, ty, out),
            Value::TimestampTz(v) => encode(v, ty, out),
            Value::Uuid(v) => encode(v, ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_macro_converts_each_literal() {
        let args = args![30, "Bob", None::<i64>, true];
        assert_eq!(
            args,
            vec![
                Value::Int(30),
                Value::Text("Bob".into()),
                Value::Null,
                Value::Bool(true)
            ]
        );
        assert!(args![].is_empty());
    }

    #[test]
    fn narrow_ints_check_range() {
        assert_eq!(i16::from_value(Value::Int(12)), Ok(12));
        assert!(i16::from_value(Value::Int(70_000)).is_err());
        assert!(u8::from_value(Value::Int(-1)).is_err());
    }

    #[test]
    fn option_maps_null() {
        assert_eq!(Option::<String>::from_value(Value::Null), Ok(None));
        assert_eq!(
            Option::<String>::from_value(Value::Text("x".into())),
            Ok(Some("x".to_string()))
        );
        assert_eq!(None::<i32>.to_value(), Value::Null);
    }

    #[test]
    fn mismatch_names_both_kinds() {
        let err = String::from_value(Value::Int(1)).unwrap_err();
        assert_eq!(err, "expected text, got int");
    }

    #[test]
    fn encode_narrows_ints_for_int4() {
        let mut buf = BytesMut::new();
        let is_null = Value::Int(7).to_sql(&Type::INT4, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::No));
        assert_eq!(&buf[..], &7_i32.to_be_bytes());
    }

    #[test]
    fn encode_rejects_text_for_int() {
        let mut buf = BytesMut::new();
        assert!(Value::Text("x".into()).to_sql(&Type::INT8, &mut buf).is_err());
    }

    #[test]
    fn encode_text_as_enum_label() {
        let mood = Type::new(
            "mood".into(),
            90_001,
            Kind::Enum(vec!["happy".into(), "sad".into()]),
            "public".into(),
        );
        let mut buf = BytesMut::new();
        let is_null = Value::Text("happy".into()).to_sql(&mood, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::No));
        assert_eq!(&buf[..], b"happy");

        // Non-text values are still checked against the enum type.
        assert!(Value::Int(1).to_sql(&mood, &mut BytesMut::new()).is_err());
    }
}
