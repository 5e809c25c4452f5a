use std::io;

use serde::Deserialize;
use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter, Serializer};

use crate::error::DatamodelError;
use crate::value::Value;

/// Tree → text. The default is `JsonEncoder`; replace it per context with
/// `Context::set_text_encoder`.
pub trait TextEncoder: Send + Sync {
    fn encode(&self, value: &Value) -> Result<String, DatamodelError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderStyle {
    /// `{"x": 1, "y": ["a", "b"]}`
    #[default]
    Spaced,
    /// `{"x":1,"y":["a","b"]}`
    Compact,
    /// Two-space indented, one entry per line.
    Pretty,
}

/// JSON text encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder {
    style: EncoderStyle,
}

impl JsonEncoder {
    pub fn new(style: EncoderStyle) -> Self {
        Self { style }
    }

    pub fn spaced() -> Self {
        Self::new(EncoderStyle::Spaced)
    }

    pub fn compact() -> Self {
        Self::new(EncoderStyle::Compact)
    }

    pub fn pretty() -> Self {
        Self::new(EncoderStyle::Pretty)
    }

    pub fn style(&self) -> EncoderStyle {
        self.style
    }

    fn write<F: Formatter>(value: &Value, formatter: F) -> Result<String, DatamodelError> {
        let mut out = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut out, formatter);
        value.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

impl TextEncoder for JsonEncoder {
    fn encode(&self, value: &Value) -> Result<String, DatamodelError> {
        match self.style {
            EncoderStyle::Spaced => Self::write(value, SpacedFormatter),
            EncoderStyle::Compact => Self::write(value, CompactFormatter),
            EncoderStyle::Pretty => Self::write(value, PrettyFormatter::new()),
        }
    }
}

/// Single-line JSON with `", "` and `": "` separators.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Text → tree. Object keys keep their document order.
pub fn parse_text(text: &str) -> Result<Value, DatamodelError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    Ok(Value::from(value))
}
