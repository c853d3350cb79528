use spb_client::MessageError;
use spb_types::{payload::DataType, FromMetricValueError};
use thiserror::Error;

/// Errors produced while decoding or updating a single metric
#[derive(Error, Debug, PartialEq)]
pub enum MetricError {
    #[error("Malformed metric: {0}")]
    MalformedMetric(String),
    #[error("Unsupported datatype {}", .0.as_str_name())]
    UnsupportedType(DataType),
    #[error("Alias mismatch: expected {expected}, got {actual}")]
    AliasMismatch { expected: u64, actual: u64 },
}

impl From<FromMetricValueError> for MetricError {
    fn from(value: FromMetricValueError) -> Self {
        match value {
            FromMetricValueError::UnsupportedDataType(datatype) => {
                MetricError::UnsupportedType(datatype)
            }
            FromMetricValueError::ValueDecodeError(e) => MetricError::MalformedMetric(e.to_string()),
        }
    }
}

/// Errors returned by [Store::process](crate::Store::process) for a message that could not be applied
#[derive(Error, Debug, PartialEq)]
pub enum ProcessError {
    #[error("Unknown message kind {0}")]
    UnknownMessageKind(String),
    /// `path` names the missing entity as `group/node[/device]`
    #[error("{kind} addressed to unknown entity {path}")]
    RoutingMiss { kind: &'static str, path: String },
}

/// Errors turning a raw publish into a [Message](crate::Message)
#[derive(Error, Debug, PartialEq)]
pub enum IngestError {
    #[error("Invalid publish: {0}")]
    InvalidPublish(#[from] MessageError),
    #[error("Topic does not carry a node or device message")]
    NotNodeOrDeviceTopic,
}

#[derive(Error, Debug, PartialEq)]
pub enum HostError {
    #[error("Invalid host id: {0}")]
    InvalidHostId(String),
}
