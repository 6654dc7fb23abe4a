//! Dynamically typed column values.
//!
//! [`Value`] is the slot type of every record attribute and every argument the
//! statement builders bind. It encodes to and decodes from the Postgres binary
//! format through `tokio-postgres`, so a record can be hydrated from any row
//! whose column types are supported without knowing them at compile time.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use std::error::Error;
use tokio_postgres::types::{FromSql, IsNull, Kind, ToSql, Type, WrongType, to_sql_checked};

type BoxError = Box<dyn Error + Sync + Send>;

/// A single column value.
///
/// `Value::Null` is the zero value: a freshly created record holds `Null` in
/// every slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Text(String),
    Bytea(Vec<u8>),
    Uuid(uuid::Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Timestamptz(DateTime<Utc>),
    Json(serde_json::Value),
    #[cfg(feature = "rust_decimal")]
    Numeric(rust_decimal::Decimal),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int2(_) => "int2",
            Self::Int4(_) => "int4",
            Self::Int8(_) => "int8",
            Self::Float4(_) => "float4",
            Self::Float8(_) => "float8",
            Self::Text(_) => "text",
            Self::Bytea(_) => "bytea",
            Self::Uuid(_) => "uuid",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
            Self::Timestamptz(_) => "timestamptz",
            Self::Json(_) => "json",
            #[cfg(feature = "rust_decimal")]
            Self::Numeric(_) => "numeric",
            Self::Array(_) => "array",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Any integer variant, widened.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int2(v) => Some(i64::from(*v)),
            Self::Int4(v) => Some(i64::from(*v)),
            Self::Int8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float4(v) => Some(f64::from(*v)),
            Self::Float8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytea(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<uuid::Uuid> {
        match self {
            Self::Uuid(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Whether values of Postgres type `ty` can be decoded into a `Value`.
    pub fn supports(ty: &Type) -> bool {
        match *ty {
            Type::BOOL
            | Type::INT2
            | Type::INT4
            | Type::INT8
            | Type::OID
            | Type::FLOAT4
            | Type::FLOAT8
            | Type::TEXT
            | Type::VARCHAR
            | Type::BPCHAR
            | Type::NAME
            | Type::UNKNOWN
            | Type::BYTEA
            | Type::UUID
            | Type::DATE
            | Type::TIME
            | Type::TIMESTAMP
            | Type::TIMESTAMPTZ
            | Type::JSON
            | Type::JSONB => true,
            #[cfg(feature = "rust_decimal")]
            Type::NUMERIC => true,
            _ => match ty.kind() {
                Kind::Array(member) => Self::supports(member),
                _ => is_textual(ty),
            },
        }
    }
}

/// Types exchanged as plain UTF-8 text: enums and text-like extension types
/// such as `citext`.
fn is_textual(ty: &Type) -> bool {
    matches!(ty.kind(), Kind::Enum(_)) || <String as FromSql>::accepts(ty)
}

fn encode_text(v: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if matches!(ty.kind(), Kind::Enum(_)) {
        out.extend_from_slice(v.as_bytes());
        Ok(IsNull::No)
    } else {
        v.to_sql_checked(ty, out)
    }
}

fn wrong_type<T>(ty: &Type) -> BoxError {
    Box::new(WrongType::new::<T>(ty.clone()))
}

fn encode_int(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        Type::OID => u32::try_from(v)?.to_sql(ty, out),
        #[cfg(feature = "rust_decimal")]
        Type::NUMERIC => rust_decimal::Decimal::from(v).to_sql(ty, out),
        _ => Err(wrong_type::<i64>(ty)),
    }
}

fn encode_float(v: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT8 => v.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        _ => Err(wrong_type::<f64>(ty)),
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Self::Null => Ok(IsNull::Yes),
            Self::Bool(v) => v.to_sql_checked(ty, out),
            Self::Int2(v) => encode_int(i64::from(*v), ty, out),
            Self::Int4(v) => encode_int(i64::from(*v), ty, out),
            Self::Int8(v) => encode_int(*v, ty, out),
            Self::Float4(v) => encode_float(f64::from(*v), ty, out),
            Self::Float8(v) => encode_float(*v, ty, out),
            Self::Text(v) => encode_text(v, ty, out),
            Self::Bytea(v) => v.to_sql_checked(ty, out),
            Self::Uuid(v) => v.to_sql_checked(ty, out),
            Self::Date(v) => v.to_sql_checked(ty, out),
            Self::Time(v) => v.to_sql_checked(ty, out),
            Self::Timestamp(v) => v.to_sql_checked(ty, out),
            Self::Timestamptz(v) => v.to_sql_checked(ty, out),
            Self::Json(v) => v.to_sql_checked(ty, out),
            #[cfg(feature = "rust_decimal")]
            Self::Numeric(v) => v.to_sql_checked(ty, out),
            Self::Array(v) => v.to_sql_checked(ty, out),
        }
    }

    // Each variant checks the target type itself.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = match *ty {
            Type::BOOL => Self::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => Self::Int2(i16::from_sql(ty, raw)?),
            Type::INT4 => Self::Int4(i32::from_sql(ty, raw)?),
            Type::INT8 => Self::Int8(i64::from_sql(ty, raw)?),
            Type::OID => Self::Int8(i64::from(u32::from_sql(ty, raw)?)),
            Type::FLOAT4 => Self::Float4(f32::from_sql(ty, raw)?),
            Type::FLOAT8 => Self::Float8(f64::from_sql(ty, raw)?),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                Self::Text(String::from_sql(ty, raw)?)
            }
            Type::BYTEA => Self::Bytea(Vec::<u8>::from_sql(ty, raw)?),
            Type::UUID => Self::Uuid(uuid::Uuid::from_sql(ty, raw)?),
            Type::DATE => Self::Date(NaiveDate::from_sql(ty, raw)?),
            Type::TIME => Self::Time(NaiveTime::from_sql(ty, raw)?),
            Type::TIMESTAMP => Self::Timestamp(NaiveDateTime::from_sql(ty, raw)?),
            Type::TIMESTAMPTZ => Self::Timestamptz(DateTime::<Utc>::from_sql(ty, raw)?),
            Type::JSON | Type::JSONB => Self::Json(serde_json::Value::from_sql(ty, raw)?),
            #[cfg(feature = "rust_decimal")]
            Type::NUMERIC => Self::Numeric(rust_decimal::Decimal::from_sql(ty, raw)?),
            _ => match ty.kind() {
                Kind::Array(_) => Self::Array(Vec::<Value>::from_sql(ty, raw)?),
                Kind::Enum(_) => Self::Text(std::str::from_utf8(raw)?.to_string()),
                _ if is_textual(ty) => Self::Text(String::from_sql(ty, raw)?),
                _ => return Err(format!("unsupported column type {ty}").into()),
            },
        };
        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Self::Null)
    }

    fn accepts(ty: &Type) -> bool {
        Self::supports(ty)
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i16 => Int2,
    i32 => Int4,
    i64 => Int8,
    f32 => Float4,
    f64 => Float8,
    String => Text,
    Vec<u8> => Bytea,
    uuid::Uuid => Uuid,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => Timestamptz,
    serde_json::Value => Json,
    Vec<Value> => Array,
}

#[cfg(feature = "rust_decimal")]
impl_from! { rust_decimal::Decimal => Numeric }

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Bytea(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
