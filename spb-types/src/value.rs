use serde::Serialize;
use thiserror::Error;

use crate::payload::{metric, DataType};

/// Wrapper around the protobuf metric value variant
#[derive(Debug, Clone, PartialEq)]
pub struct MetricValue(pub metric::Value);

impl MetricValue {
    pub fn new(inner: metric::Value) -> Self {
        Self(inner)
    }
}

impl From<MetricValue> for metric::Value {
    fn from(value: MetricValue) -> Self {
        value.0
    }
}

impl From<metric::Value> for MetricValue {
    fn from(value: metric::Value) -> Self {
        MetricValue(value)
    }
}

fn bool_to_proto(val: bool) -> bool {
    val
}
fn u8_to_proto(val: u8) -> u32 {
    val as u32
}
fn u16_to_proto(val: u16) -> u32 {
    val as u32
}
fn u32_to_proto(val: u32) -> u32 {
    val
}
fn u64_to_proto(val: u64) -> u64 {
    val
}
fn i8_to_proto(val: i8) -> u32 {
    let b = val.to_le_bytes();
    u32::from_le_bytes([b[0], 0, 0, 0])
}
fn i16_to_proto(val: i16) -> u32 {
    let b = val.to_le_bytes();
    u32::from_le_bytes([b[0], b[1], 0, 0])
}
fn i32_to_proto(val: i32) -> u32 {
    u32::from_le_bytes(val.to_le_bytes())
}
fn i64_to_proto(val: i64) -> u64 {
    u64::from_le_bytes(val.to_le_bytes())
}
fn f32_to_proto(val: f32) -> f32 {
    val
}
fn f64_to_proto(val: f64) -> f64 {
    val
}
fn string_to_proto(val: String) -> String {
    val
}

fn proto_to_bool(val: bool) -> bool {
    val
}
fn proto_to_u8(val: u32) -> u8 {
    val as u8
}
fn proto_to_u16(val: u32) -> u16 {
    val as u16
}
fn proto_to_u32(val: u32) -> u32 {
    val
}
fn proto_to_u64(val: u64) -> u64 {
    val
}
fn proto_to_i8(val: u32) -> i8 {
    let bytes = val.to_le_bytes();
    i8::from_le_bytes([bytes[0]])
}
fn proto_to_i16(val: u32) -> i16 {
    let bytes = val.to_le_bytes();
    i16::from_le_bytes([bytes[0], bytes[1]])
}
fn proto_to_i32(val: u32) -> i32 {
    i32::from_le_bytes(val.to_le_bytes())
}
fn proto_to_i64(val: u64) -> i64 {
    i64::from_le_bytes(val.to_le_bytes())
}
fn proto_to_f32(val: f32) -> f32 {
    val
}
fn proto_to_f64(val: f64) -> f64 {
    val
}
fn proto_to_string(val: String) -> String {
    val
}

#[derive(Debug, Error, PartialEq)]
pub enum FromValueTypeError {
    #[error("Value variant type was invalid")]
    InvalidVariantType,
}

macro_rules! impl_to_from_metric_value_for_type {
    ($type:ty, $proto_variant:path, $to_proto_fn:ident, $from_proto_fn:ident) => {
        impl From<$type> for MetricValue {
            fn from(value: $type) -> Self {
                $proto_variant($to_proto_fn(value)).into()
            }
        }

        impl TryFrom<MetricValue> for $type {
            type Error = FromValueTypeError;
            fn try_from(value: MetricValue) -> Result<Self, Self::Error> {
                if let $proto_variant(v) = value.0 {
                    Ok($from_proto_fn(v))
                } else {
                    Err(FromValueTypeError::InvalidVariantType)
                }
            }
        }
    };
}

impl_to_from_metric_value_for_type!(bool, metric::Value::BooleanValue, bool_to_proto, proto_to_bool);
impl_to_from_metric_value_for_type!(u8, metric::Value::IntValue, u8_to_proto, proto_to_u8);
impl_to_from_metric_value_for_type!(u16, metric::Value::IntValue, u16_to_proto, proto_to_u16);
impl_to_from_metric_value_for_type!(u32, metric::Value::IntValue, u32_to_proto, proto_to_u32);
impl_to_from_metric_value_for_type!(u64, metric::Value::LongValue, u64_to_proto, proto_to_u64);
impl_to_from_metric_value_for_type!(i8, metric::Value::IntValue, i8_to_proto, proto_to_i8);
impl_to_from_metric_value_for_type!(i16, metric::Value::IntValue, i16_to_proto, proto_to_i16);
impl_to_from_metric_value_for_type!(i32, metric::Value::IntValue, i32_to_proto, proto_to_i32);
impl_to_from_metric_value_for_type!(i64, metric::Value::LongValue, i64_to_proto, proto_to_i64);
impl_to_from_metric_value_for_type!(f32, metric::Value::FloatValue, f32_to_proto, proto_to_f32);
impl_to_from_metric_value_for_type!(f64, metric::Value::DoubleValue, f64_to_proto, proto_to_f64);
impl_to_from_metric_value_for_type!(
    String,
    metric::Value::StringValue,
    string_to_proto,
    proto_to_string
);

/// A decoded scalar metric value.
///
/// String, Text and UUID datatypes all decode to [MetricValueKind::String].
/// Serializes as the bare inner value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValueKind {
    Boolean(bool),
    Double(f64),
    Float(f32),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    String(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum FromMetricValueError {
    #[error("Value decoding error: {0}")]
    ValueDecodeError(#[from] FromValueTypeError),
    #[error("Unsupported datatype {0:?}")]
    UnsupportedDataType(DataType),
}

impl MetricValueKind {
    pub fn try_from_metric_value(
        datatype: DataType,
        value: MetricValue,
    ) -> Result<Self, FromMetricValueError> {
        let out = match datatype {
            DataType::Int8 => MetricValueKind::Int8(i8::try_from(value)?),
            DataType::Int16 => MetricValueKind::Int16(i16::try_from(value)?),
            DataType::Int32 => MetricValueKind::Int32(i32::try_from(value)?),
            DataType::Int64 => MetricValueKind::Int64(i64::try_from(value)?),
            DataType::UInt8 => MetricValueKind::UInt8(u8::try_from(value)?),
            DataType::UInt16 => MetricValueKind::UInt16(u16::try_from(value)?),
            DataType::UInt32 => MetricValueKind::UInt32(u32::try_from(value)?),
            DataType::UInt64 => MetricValueKind::UInt64(u64::try_from(value)?),
            DataType::Float => MetricValueKind::Float(f32::try_from(value)?),
            DataType::Double => MetricValueKind::Double(f64::try_from(value)?),
            DataType::Boolean => MetricValueKind::Boolean(bool::try_from(value)?),
            DataType::String | DataType::Text | DataType::Uuid => {
                MetricValueKind::String(String::try_from(value)?)
            }
            unsupported => return Err(FromMetricValueError::UnsupportedDataType(unsupported)),
        };
        Ok(out)
    }
}

impl From<MetricValueKind> for MetricValue {
    fn from(value: MetricValueKind) -> Self {
        match value {
            MetricValueKind::Boolean(v) => v.into(),
            MetricValueKind::Double(v) => v.into(),
            MetricValueKind::Float(v) => v.into(),
            MetricValueKind::Int8(v) => v.into(),
            MetricValueKind::Int16(v) => v.into(),
            MetricValueKind::Int32(v) => v.into(),
            MetricValueKind::Int64(v) => v.into(),
            MetricValueKind::UInt8(v) => v.into(),
            MetricValueKind::UInt16(v) => v.into(),
            MetricValueKind::UInt32(v) => v.into(),
            MetricValueKind::UInt64(v) => v.into(),
            MetricValueKind::String(v) => v.into(),
        }
    }
}
