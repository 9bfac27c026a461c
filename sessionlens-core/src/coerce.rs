//! Result coercion
//!
//! DuckDB hands back whatever width the expression produced: `COUNT(*)` is a
//! BIGINT, `SUM` over BIGINT is a HUGEINT, `AVG` is a DOUBLE, casts may give
//! DECIMAL, and timestamps arrive as raw epoch offsets in one of four units.
//! Every catalog query maps its rows through [`RawRow`] so callers only ever
//! see `i64`, `f64`, `String`, and `Option<String>`.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate};
use duckdb::types::{TimeUnit, Value};
use std::sync::Arc;

/// Semantic type a result column is read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Whole number; fractional values truncate toward zero
    Integer,
    Float,
    /// Text; NULL becomes ""
    Text,
    /// Canonical `YYYY-MM-DD HH:MM:SS[.f]` or `YYYY-MM-DD`
    Timestamp,
    /// Text; NULL stays NULL
    NullableText,
    /// Text; NULL becomes the given sentinel
    TextOr(&'static str),
}

impl FieldKind {
    fn name(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Text | FieldKind::TextOr(_) => "text",
            FieldKind::Timestamp => "timestamp",
            FieldKind::NullableText => "nullable text",
        }
    }
}

/// A normalized scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

/// Coerce one engine value to the scalar for `kind`.
pub fn coerce(column: &str, value: &Value, kind: FieldKind) -> Result<Scalar> {
    let scalar = match kind {
        FieldKind::Integer => to_int(value).map(Scalar::Int),
        FieldKind::Float => to_float(value).map(Scalar::Float),
        FieldKind::Text => match value {
            Value::Null => Some(Scalar::Text(String::new())),
            other => to_text(other).map(Scalar::Text),
        },
        FieldKind::Timestamp => to_timestamp(value).map(Scalar::Text),
        FieldKind::NullableText => match value {
            Value::Null => Some(Scalar::Null),
            other => to_text(other).map(Scalar::Text),
        },
        FieldKind::TextOr(default) => match value {
            Value::Null => Some(Scalar::Text(default.to_string())),
            other => to_text(other).map(Scalar::Text),
        },
    };

    scalar.ok_or_else(|| Error::Coercion {
        column: column.to_string(),
        expected: kind.name(),
        found: describe(value),
    })
}

fn describe(value: &Value) -> String {
    let mut text = format!("{:?}", value);
    if text.len() > 64 {
        let mut end = 64;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.push('…');
    }
    text
}

fn float_to_int(f: f64) -> Option<i64> {
    let truncated = f.trunc();
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
    if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Some(truncated as i64)
    } else {
        None
    }
}

fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Boolean(b) => Some(i64::from(*b)),
        Value::TinyInt(v) => Some(i64::from(*v)),
        Value::SmallInt(v) => Some(i64::from(*v)),
        Value::Int(v) => Some(i64::from(*v)),
        Value::BigInt(v) => Some(*v),
        Value::HugeInt(v) => i64::try_from(*v).ok(),
        Value::UTinyInt(v) => Some(i64::from(*v)),
        Value::USmallInt(v) => Some(i64::from(*v)),
        Value::UInt(v) => Some(i64::from(*v)),
        Value::UBigInt(v) => i64::try_from(*v).ok(),
        Value::Float(v) => float_to_int(f64::from(*v)),
        Value::Double(v) => float_to_int(*v),
        Value::Decimal(d) => {
            let text = d.to_string();
            let whole = text.split('.').next().unwrap_or("0");
            match whole {
                "-0" | "-" | "" => Some(0),
                w => w.parse().ok(),
            }
        }
        Value::Text(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_int))
        }
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float(v) => Some(f64::from(*v)),
        Value::Double(v) => Some(*v),
        Value::Decimal(d) => d.to_string().parse().ok(),
        Value::HugeInt(v) => Some(*v as f64),
        Value::UBigInt(v) => Some(*v as f64),
        Value::BigInt(v) => Some(*v as f64),
        Value::Text(s) => s.trim().parse().ok(),
        other => to_int(other).map(|v| v as f64),
    }
}

fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) | Value::Enum(s) => Some(s.clone()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Float(_) | Value::Double(_) => to_float(value).map(|f| f.to_string()),
        Value::Decimal(d) => Some(d.to_string()),
        Value::HugeInt(v) => Some(v.to_string()),
        Value::UBigInt(v) => Some(v.to_string()),
        Value::Timestamp(..) | Value::Date32(_) => to_timestamp(value),
        other => to_int(other).map(|v| v.to_string()),
    }
}

fn to_micros(unit: TimeUnit, value: i64) -> Option<i64> {
    match unit {
        TimeUnit::Second => value.checked_mul(1_000_000),
        TimeUnit::Millisecond => value.checked_mul(1_000),
        TimeUnit::Microsecond => Some(value),
        TimeUnit::Nanosecond => Some(value.div_euclid(1_000)),
    }
}

/// Days between 0001-01-01 and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn to_timestamp(value: &Value) -> Option<String> {
    match value {
        Value::Timestamp(unit, raw) => {
            let micros = to_micros(*unit, *raw)?;
            let dt = DateTime::from_timestamp_micros(micros)?;
            Some(dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string())
        }
        Value::Date32(days) => {
            let date =
                NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)?;
            Some(date.format("%Y-%m-%d").to_string())
        }
        Value::Text(s) => Some(s.clone()),
        _ => None,
    }
}

/// One result row: column names shared across the result set, values in
/// column order.
#[derive(Debug, Clone)]
pub struct RawRow {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl RawRow {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Engine-native value for a column.
    pub fn value(&self, column: &str) -> Result<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
            .ok_or_else(|| Error::Coercion {
                column: column.to_string(),
                expected: "present column",
                found: "no such column".to_string(),
            })
    }

    pub fn get(&self, column: &str, kind: FieldKind) -> Result<Scalar> {
        coerce(column, self.value(column)?, kind)
    }

    pub fn int(&self, column: &str) -> Result<i64> {
        match self.get(column, FieldKind::Integer)? {
            Scalar::Int(v) => Ok(v),
            other => Err(mismatch(column, FieldKind::Integer, other)),
        }
    }

    pub fn float(&self, column: &str) -> Result<f64> {
        match self.get(column, FieldKind::Float)? {
            Scalar::Float(v) => Ok(v),
            other => Err(mismatch(column, FieldKind::Float, other)),
        }
    }

    pub fn text(&self, column: &str) -> Result<String> {
        self.text_kind(column, FieldKind::Text)
    }

    pub fn timestamp(&self, column: &str) -> Result<String> {
        self.text_kind(column, FieldKind::Timestamp)
    }

    pub fn text_or(&self, column: &str, default: &'static str) -> Result<String> {
        self.text_kind(column, FieldKind::TextOr(default))
    }

    pub fn nullable_text(&self, column: &str) -> Result<Option<String>> {
        match self.get(column, FieldKind::NullableText)? {
            Scalar::Text(s) => Ok(Some(s)),
            Scalar::Null => Ok(None),
            other => Err(mismatch(column, FieldKind::NullableText, other)),
        }
    }

    fn text_kind(&self, column: &str, kind: FieldKind) -> Result<String> {
        match self.get(column, kind)? {
            Scalar::Text(s) => Ok(s),
            other => Err(mismatch(column, kind, other)),
        }
    }
}

fn mismatch(column: &str, kind: FieldKind, found: Scalar) -> Error {
    Error::Coercion {
        column: column.to_string(),
        expected: kind.name(),
        found: format!("{:?}", found),
    }
}
