//! Value Codecs
//!
//! Every value node stores its value as the string that appears in the
//! instance document. A codec translates between that instance string and a
//! typed runtime value:
//!
//! - `decode` never fails. Malformed input yields the type's null value.
//! - `encode(decode(s))` normalizes `s`; `decode(encode(v))` returns `v`
//!   except where the type loses information on purpose (a geopoint with an
//!   invalid component collapses to null).
//!
//! Select and rank controls hold several values. [`SetCodec`] and
//! [`ArrayCodec`] compose the string codec into an unordered-unique and an
//! ordered list encoding respectively.

mod attachment;
mod boolean;
mod geo;
mod multi;
mod numeric;
mod string;
mod temporal;

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

pub use attachment::{BinaryCodec, InstanceAttachment};
pub use boolean::BooleanCodec;
pub use geo::{GeopointCodec, GeoshapeCodec, GeotraceCodec, Geopoint};
pub use multi::{ArrayCodec, SetCodec};
pub use numeric::{DecimalCodec, IntCodec};
pub use string::StringCodec;
pub use temporal::{DateCodec, DateTimeCodec, TimeCodec};

/// Data types a bind can declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    #[default]
    String,
    Int,
    Decimal,
    Boolean,
    Date,
    Time,
    DateTime,
    Geopoint,
    Geotrace,
    Geoshape,
    Binary,
    Barcode,
    Intent,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "dateTime",
            Self::Geopoint => "geopoint",
            Self::Geotrace => "geotrace",
            Self::Geoshape => "geoshape",
            Self::Binary => "binary",
            Self::Barcode => "barcode",
            Self::Intent => "intent",
        }
    }

    /// Check if the type is numeric (the only kinds a range control accepts).
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Decimal)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stateless mapping between instance strings and runtime values.
pub trait ValueCodec {
    type Runtime: Clone + PartialEq + fmt::Debug;

    fn value_type(&self) -> ValueType;

    /// Runtime value to instance string.
    fn encode(&self, value: &Self::Runtime) -> String;

    /// Instance string to runtime value. Malformed input decodes to null.
    fn decode(&self, value: &str) -> Self::Runtime;
}

/// A decoded value of any type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum RuntimeValue {
    String(String),
    Int(Option<i64>),
    Decimal(Option<f64>),
    Boolean(Option<bool>),
    Date(Option<NaiveDate>),
    Time(Option<NaiveTime>),
    DateTime(Option<DateTime<FixedOffset>>),
    Geopoint(Option<Geopoint>),
    Geotrace(Option<Vec<Geopoint>>),
    Geoshape(Option<Vec<Geopoint>>),
    Binary(Option<String>),
    Values(Vec<String>),
}

impl RuntimeValue {
    /// Check if the value is its type's null.
    pub fn is_null(&self) -> bool {
        match self {
            Self::String(value) => value.is_empty(),
            Self::Int(value) => value.is_none(),
            Self::Decimal(value) => value.is_none(),
            Self::Boolean(value) => value.is_none(),
            Self::Date(value) => value.is_none(),
            Self::Time(value) => value.is_none(),
            Self::DateTime(value) => value.is_none(),
            Self::Geopoint(value) => value.is_none(),
            Self::Geotrace(value) | Self::Geoshape(value) => value.is_none(),
            Self::Binary(value) => value.is_none(),
            Self::Values(values) => values.is_empty(),
        }
    }
}

/// A value supplied by a host to `set_value`.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueInput {
    Null,
    String(String),
    Int(i64),
    Decimal(f64),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<FixedOffset>),
    Geopoint(Geopoint),
    Points(Vec<Geopoint>),
    Values(Vec<String>),
    Attachment(InstanceAttachment),
}

impl ValueInput {
    fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Decimal(_) => "decimal",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) => "dateTime",
            Self::Geopoint(_) => "geopoint",
            Self::Points(_) => "point list",
            Self::Values(_) => "value list",
            Self::Attachment(_) => "attachment",
        }
    }
}

impl From<&str> for ValueInput {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ValueInput {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ValueInput {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ValueInput {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<bool> for ValueInput {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<NaiveDate> for ValueInput {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveTime> for ValueInput {
    fn from(value: NaiveTime) -> Self {
        Self::Time(value)
    }
}

impl From<DateTime<FixedOffset>> for ValueInput {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::DateTime(value)
    }
}

impl From<Geopoint> for ValueInput {
    fn from(value: Geopoint) -> Self {
        Self::Geopoint(value)
    }
}

impl From<Vec<String>> for ValueInput {
    fn from(values: Vec<String>) -> Self {
        Self::Values(values)
    }
}

impl From<InstanceAttachment> for ValueInput {
    fn from(value: InstanceAttachment) -> Self {
        Self::Attachment(value)
    }
}

impl<T: Into<ValueInput>> From<Option<T>> for ValueInput {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// How a node's instance string is split into values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Scalar,
    Set,
    Array,
}

/// Codec dispatch for one node: a value type plus a multiplicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedValueCodec {
    value_type: ValueType,
    shape: Shape,
}

impl SharedValueCodec {
    /// Codec for a single value of `value_type`.
    ///
    /// `intent` has no codec yet and yields `None`.
    pub fn scalar(value_type: ValueType) -> Option<Self> {
        (value_type != ValueType::Intent).then_some(Self {
            value_type,
            shape: Shape::Scalar,
        })
    }

    /// Unique, unordered string values (select controls).
    pub fn set() -> Self {
        Self {
            value_type: ValueType::String,
            shape: Shape::Set,
        }
    }

    /// Ordered string values (rank controls).
    pub fn array() -> Self {
        Self {
            value_type: ValueType::String,
            shape: Shape::Array,
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn decode(&self, value: &str) -> RuntimeValue {
        match self.shape {
            Shape::Set => return RuntimeValue::Values(SetCodec.decode(value)),
            Shape::Array => return RuntimeValue::Values(ArrayCodec.decode(value)),
            Shape::Scalar => {}
        }

        match self.value_type {
            ValueType::String | ValueType::Barcode | ValueType::Intent => {
                RuntimeValue::String(StringCodec.decode(value))
            }
            ValueType::Int => RuntimeValue::Int(IntCodec.decode(value)),
            ValueType::Decimal => RuntimeValue::Decimal(DecimalCodec.decode(value)),
            ValueType::Boolean => RuntimeValue::Boolean(BooleanCodec.decode(value)),
            ValueType::Date => RuntimeValue::Date(DateCodec.decode(value)),
            ValueType::Time => RuntimeValue::Time(TimeCodec.decode(value)),
            ValueType::DateTime => RuntimeValue::DateTime(DateTimeCodec.decode(value)),
            ValueType::Geopoint => RuntimeValue::Geopoint(GeopointCodec.decode(value)),
            ValueType::Geotrace => RuntimeValue::Geotrace(GeotraceCodec.decode(value)),
            ValueType::Geoshape => RuntimeValue::Geoshape(GeoshapeCodec.decode(value)),
            ValueType::Binary => RuntimeValue::Binary(BinaryCodec.decode(value)),
        }
    }

    /// Encode a runtime value, or `None` if it is of a different type.
    pub fn encode(&self, value: &RuntimeValue) -> Option<String> {
        let encoded = match (self.shape, self.value_type, value) {
            (Shape::Set, _, RuntimeValue::Values(values)) => SetCodec.encode(values),
            (Shape::Array, _, RuntimeValue::Values(values)) => ArrayCodec.encode(values),
            (Shape::Set | Shape::Array, _, _) => return None,
            (_, ValueType::String | ValueType::Barcode, RuntimeValue::String(value)) => {
                StringCodec.encode(value)
            }
            (_, ValueType::Int, RuntimeValue::Int(value)) => IntCodec.encode(value),
            (_, ValueType::Decimal, RuntimeValue::Decimal(value)) => DecimalCodec.encode(value),
            (_, ValueType::Boolean, RuntimeValue::Boolean(value)) => BooleanCodec.encode(value),
            (_, ValueType::Date, RuntimeValue::Date(value)) => DateCodec.encode(value),
            (_, ValueType::Time, RuntimeValue::Time(value)) => TimeCodec.encode(value),
            (_, ValueType::DateTime, RuntimeValue::DateTime(value)) => DateTimeCodec.encode(value),
            (_, ValueType::Geopoint, RuntimeValue::Geopoint(value)) => GeopointCodec.encode(value),
            (_, ValueType::Geotrace, RuntimeValue::Geotrace(value)) => GeotraceCodec.encode(value),
            (_, ValueType::Geoshape, RuntimeValue::Geoshape(value)) => GeoshapeCodec.encode(value),
            (_, ValueType::Binary, RuntimeValue::Binary(value)) => BinaryCodec.encode(value),
            _ => return None,
        };
        Some(encoded)
    }

    /// Convert host input into the normalized instance string.
    ///
    /// The error is a human-readable reason; callers attach the node.
    pub fn normalize(&self, input: ValueInput) -> Result<String, String> {
        let runtime = self.input_to_runtime(input)?;
        self.encode(&runtime)
            .ok_or_else(|| format!("value does not match type {}", self.value_type))
    }

    fn input_to_runtime(&self, input: ValueInput) -> Result<RuntimeValue, String> {
        let mismatch = |input: &ValueInput| {
            format!(
                "{} input cannot be stored as {}",
                input.kind(),
                self.describe()
            )
        };

        if self.shape != Shape::Scalar {
            return match input {
                ValueInput::Null => Ok(RuntimeValue::Values(Vec::new())),
                ValueInput::String(value) => Ok(self.decode(&value)),
                ValueInput::Values(values) => {
                    if let Some(bad) = values.iter().find(|value| !multi::is_token(value)) {
                        return Err(format!("select value {bad:?} is not a single token"));
                    }
                    Ok(RuntimeValue::Values(values))
                }
                other => Err(mismatch(&other)),
            };
        }

        let value_type = self.value_type;
        let runtime = match input {
            ValueInput::Null => self.decode(""),
            ValueInput::String(value) => self.decode(&value),
            ValueInput::Int(value) => match value_type {
                ValueType::Int => RuntimeValue::Int(Some(value)),
                ValueType::Decimal => RuntimeValue::Decimal(Some(value as f64)),
                ValueType::String | ValueType::Barcode => RuntimeValue::String(value.to_string()),
                _ => return Err(mismatch(&input)),
            },
            ValueInput::Decimal(value) => match value_type {
                ValueType::Decimal if value.is_finite() => RuntimeValue::Decimal(Some(value)),
                ValueType::Int => RuntimeValue::Int(numeric::truncate(value)),
                ValueType::String | ValueType::Barcode => RuntimeValue::String(value.to_string()),
                _ => return Err(mismatch(&input)),
            },
            ValueInput::Boolean(value) => match value_type {
                ValueType::Boolean => RuntimeValue::Boolean(Some(value)),
                ValueType::String => RuntimeValue::String(value.to_string()),
                _ => return Err(mismatch(&input)),
            },
            ValueInput::Date(value) if value_type == ValueType::Date => {
                RuntimeValue::Date(Some(value))
            }
            ValueInput::Time(value) if value_type == ValueType::Time => {
                RuntimeValue::Time(Some(value))
            }
            ValueInput::DateTime(value) if value_type == ValueType::DateTime => {
                RuntimeValue::DateTime(Some(value))
            }
            ValueInput::Geopoint(point) if value_type == ValueType::Geopoint => {
                if !point.is_valid() {
                    return Err(format!("geopoint {point} is out of bounds"));
                }
                RuntimeValue::Geopoint(Some(point))
            }
            ValueInput::Points(points) if matches!(value_type, ValueType::Geotrace | ValueType::Geoshape) => {
                // Validate through the string form so both paths agree.
                let encoded = GeotraceCodec.encode(&Some(points));
                let decoded = self.decode(&encoded);
                if decoded.is_null() {
                    return Err(format!("points do not form a valid {value_type}"));
                }
                decoded
            }
            ValueInput::Attachment(attachment) if value_type == ValueType::Binary => {
                RuntimeValue::Binary(Some(attachment.file_name))
            }
            other => return Err(mismatch(&other)),
        };
        Ok(runtime)
    }

    fn describe(&self) -> String {
        match self.shape {
            Shape::Scalar => self.value_type.to_string(),
            Shape::Set => "a set of values".to_string(),
            Shape::Array => "an ordered list of values".to_string(),
        }
    }
}
