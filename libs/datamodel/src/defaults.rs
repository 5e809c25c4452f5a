//! Default hooks installed into every fresh `HookRegistry`.
//!
//! Inbound hooks are forgiving: a primitive accepts any scalar that has an
//! obvious reading as that primitive. Outbound hooks only check the shape.

use std::sync::Arc;

use chrono::Utc;

use crate::error::ConvertError;
use crate::field::{FieldValue, mismatch};
use crate::hooks::HookRegistry;
use crate::temporal;
use crate::value::Value;

pub(crate) fn install(registry: &mut HookRegistry) {
    install_int(registry, "i8", i128::from(i8::MIN), i128::from(i8::MAX));
    install_int(registry, "i16", i128::from(i16::MIN), i128::from(i16::MAX));
    install_int(registry, "i32", i128::from(i32::MIN), i128::from(i32::MAX));
    install_int(registry, "i64", i128::from(i64::MIN), i128::from(i64::MAX));
    install_int(registry, "isize", isize::MIN as i128, isize::MAX as i128);
    install_int(registry, "u8", 0, i128::from(u8::MAX));
    install_int(registry, "u16", 0, i128::from(u16::MAX));
    install_int(registry, "u32", 0, i128::from(u32::MAX));
    install_int(registry, "u64", 0, i128::from(u64::MAX));
    install_int(registry, "usize", 0, usize::MAX as i128);

    registry.register("f64", Arc::new(float_inbound), Arc::new(float_outbound));
    registry.register("f32", Arc::new(f32_inbound), Arc::new(float_outbound));

    registry.register("bool", Arc::new(bool_inbound), Arc::new(bool_outbound));
    registry.register("String", Arc::new(string_inbound), Arc::new(string_outbound));
    registry.register("Bytes", Arc::new(bytes_inbound), Arc::new(bytes_outbound));

    registry.register("NaiveDate", Arc::new(date_inbound), Arc::new(date_outbound));
    registry.register(
        "DateTime<FixedOffset>",
        Arc::new(datetime_inbound),
        Arc::new(datetime_outbound),
    );
    registry.register(
        "DateTime<Utc>",
        Arc::new(utc_inbound),
        Arc::new(datetime_outbound),
    );

    registry.register(
        "Any",
        Arc::new(any_inbound),
        Arc::new(any_outbound),
    );
}

fn any_inbound(value: &Value) -> Result<FieldValue, ConvertError> {
    Ok(FieldValue::Any(value.clone()))
}

fn any_outbound(value: &FieldValue) -> Result<Value, ConvertError> {
    match value {
        FieldValue::Any(v) => Ok(v.clone()),
        other => Err(mismatch("any", other)),
    }
}

// ---------------------------------------------------------------------------
// Integers
// ---------------------------------------------------------------------------

fn install_int(registry: &mut HookRegistry, name: &'static str, min: i128, max: i128) {
    registry.register(
        name,
        Arc::new(move |value: &Value| -> Result<FieldValue, ConvertError> {
            let v = coerce_int(value)?;
            if v < min || v > max {
                return Err(ConvertError::coercion(format!("{v} is out of range for {name}"))
                    .with_raw(value));
            }
            Ok(FieldValue::Int(v))
        }),
        Arc::new(int_outbound),
    );
}

fn coerce_int(value: &Value) -> Result<i128, ConvertError> {
    match value {
        Value::Int(v) => Ok(i128::from(*v)),
        Value::Float(f) if f.is_finite() => Ok(f.trunc() as i128),
        Value::Bool(b) => Ok(i128::from(*b)),
        Value::Str(s) => s.trim().parse::<i128>().map_err(|e| {
            ConvertError::coercion(format!("invalid integer: {e}")).with_raw(value)
        }),
        other => Err(
            ConvertError::coercion(format!("cannot read {} as an integer", other.kind_name()))
                .with_raw(value),
        ),
    }
}

fn int_outbound(value: &FieldValue) -> Result<Value, ConvertError> {
    match value {
        FieldValue::Int(v) => i64::try_from(*v)
            .map(Value::Int)
            .map_err(|_| ConvertError::coercion(format!("{v} does not fit in a tree integer"))),
        other => Err(mismatch("int", other)),
    }
}

// ---------------------------------------------------------------------------
// Floats, bools, strings, bytes
// ---------------------------------------------------------------------------

fn float_inbound(value: &Value) -> Result<FieldValue, ConvertError> {
    let v = match value {
        Value::Float(f) => *f,
        Value::Int(i) => *i as f64,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Str(s) => s.trim().parse::<f64>().map_err(|e| {
            ConvertError::coercion(format!("invalid float: {e}")).with_raw(value)
        })?,
        other => {
            return Err(
                ConvertError::coercion(format!("cannot read {} as a float", other.kind_name()))
                    .with_raw(value),
            );
        }
    };
    Ok(FieldValue::Float(v))
}

/// Finite values beyond `f32::MAX` fail instead of becoming infinite.
fn f32_inbound(value: &Value) -> Result<FieldValue, ConvertError> {
    match float_inbound(value)? {
        FieldValue::Float(v) if v.is_finite() && v.abs() > f64::from(f32::MAX) => {
            Err(ConvertError::coercion(format!("{v} is out of range for f32")).with_raw(value))
        }
        other => Ok(other),
    }
}

fn float_outbound(value: &FieldValue) -> Result<Value, ConvertError> {
    match value {
        FieldValue::Float(v) => Ok(Value::Float(*v)),
        other => Err(mismatch("float", other)),
    }
}

fn bool_inbound(value: &Value) -> Result<FieldValue, ConvertError> {
    let v = match value {
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => {
            let s = s.trim();
            !(s.is_empty() || s.eq_ignore_ascii_case("false") || s == "0")
        }
        other => {
            return Err(
                ConvertError::coercion(format!("cannot read {} as a bool", other.kind_name()))
                    .with_raw(value),
            );
        }
    };
    Ok(FieldValue::Bool(v))
}

fn bool_outbound(value: &FieldValue) -> Result<Value, ConvertError> {
    match value {
        FieldValue::Bool(v) => Ok(Value::Bool(*v)),
        other => Err(mismatch("bool", other)),
    }
}

fn string_inbound(value: &Value) -> Result<FieldValue, ConvertError> {
    let text = match value {
        Value::Str(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format!("{f:?}"),
        Value::Bool(b) => b.to_string(),
        Value::Date(d) => temporal::format_date(d),
        Value::DateTime(dt) => temporal::format_datetime(dt),
        other => {
            return Err(
                ConvertError::coercion(format!("cannot read {} as a string", other.kind_name()))
                    .with_raw(value),
            );
        }
    };
    Ok(FieldValue::Str(text))
}

fn string_outbound(value: &FieldValue) -> Result<Value, ConvertError> {
    match value {
        FieldValue::Str(s) => Ok(Value::Str(s.clone())),
        other => Err(mismatch("string", other)),
    }
}

fn bytes_inbound(value: &Value) -> Result<FieldValue, ConvertError> {
    match value {
        Value::Str(s) => Ok(FieldValue::Bytes(s.as_bytes().to_vec())),
        Value::Seq(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Int(b) => u8::try_from(*b).map_err(|_| {
                    ConvertError::coercion(format!("{b} is not a byte"))
                        .with_raw(item)
                        .at_index(i)
                }),
                other => Err(ConvertError::coercion(format!(
                    "expected a byte, found {}",
                    other.kind_name()
                ))
                .with_raw(item)
                .at_index(i)),
            })
            .collect::<Result<Vec<u8>, _>>()
            .map(FieldValue::Bytes),
        other => Err(
            ConvertError::coercion(format!("cannot read {} as bytes", other.kind_name()))
                .with_raw(value),
        ),
    }
}

fn bytes_outbound(value: &FieldValue) -> Result<Value, ConvertError> {
    match value {
        FieldValue::Bytes(b) => String::from_utf8(b.clone())
            .map(Value::Str)
            .map_err(|e| ConvertError::coercion(format!("bytes are not valid UTF-8: {e}"))),
        other => Err(mismatch("bytes", other)),
    }
}

// ---------------------------------------------------------------------------
// Temporal
// ---------------------------------------------------------------------------

fn date_inbound(value: &Value) -> Result<FieldValue, ConvertError> {
    match value {
        Value::Str(s) => temporal::parse_date(s)
            .map(FieldValue::Date)
            .map_err(|e| e.with_raw(value)),
        Value::Date(d) => Ok(FieldValue::Date(*d)),
        Value::DateTime(dt) => Ok(FieldValue::Date(dt.date_naive())),
        other => Err(
            ConvertError::temporal(format!("cannot read {} as a date", other.kind_name()))
                .with_raw(value),
        ),
    }
}

fn date_outbound(value: &FieldValue) -> Result<Value, ConvertError> {
    match value {
        FieldValue::Date(d) => Ok(Value::Str(temporal::format_date(d))),
        other => Err(mismatch("date", other)),
    }
}

fn datetime_inbound(value: &Value) -> Result<FieldValue, ConvertError> {
    match value {
        Value::Str(s) => temporal::parse_datetime(s)
            .map(FieldValue::DateTime)
            .map_err(|e| e.with_raw(value)),
        Value::DateTime(dt) => Ok(FieldValue::DateTime(*dt)),
        other => Err(
            ConvertError::temporal(format!("cannot read {} as a timestamp", other.kind_name()))
                .with_raw(value),
        ),
    }
}

fn utc_inbound(value: &Value) -> Result<FieldValue, ConvertError> {
    match datetime_inbound(value)? {
        FieldValue::DateTime(dt) => Ok(FieldValue::DateTime(dt.with_timezone(&Utc).fixed_offset())),
        other => Ok(other),
    }
}

fn datetime_outbound(value: &FieldValue) -> Result<Value, ConvertError> {
    match value {
        FieldValue::DateTime(dt) => Ok(Value::Str(temporal::format_datetime(dt))),
        other => Err(mismatch("datetime", other)),
    }
}
