use chrono::{DateTime, Utc};
use spb_primary::Message;
use spb_types::{
    constants::BDSEQ,
    payload::{DataType, Metric, Payload},
    utils::timestamp,
    MetricValue,
};

pub fn bdseq_metric(alias: u64) -> Metric {
    let mut bdseq = Metric::new();
    bdseq
        .set_name(BDSEQ.into())
        .set_alias(alias)
        .set_datatype(DataType::Int64)
        .set_timestamp(timestamp())
        .set_value(MetricValue::from(0i64).into());
    bdseq
}

pub fn bool_metric(alias: u64, name: &str, value: bool) -> Metric {
    let mut metric = Metric::new();
    metric
        .set_name(name.into())
        .set_alias(alias)
        .set_datatype(DataType::Boolean)
        .set_value(MetricValue::from(value).into());
    metric
}

pub fn double_metric(alias: u64, name: &str, value: f64) -> Metric {
    let mut metric = Metric::new();
    metric
        .set_name(name.into())
        .set_alias(alias)
        .set_datatype(DataType::Double)
        .set_value(MetricValue::from(value).into());
    metric
}

/// A data metric referencing an alias only
pub fn data_metric(alias: u64, value: MetricValue) -> Metric {
    let mut metric = Metric::new();
    metric.set_alias(alias).set_value(value.into());
    metric
}

pub fn new_birth_payload(metrics: Vec<Metric>) -> Payload {
    Payload {
        timestamp: Some(timestamp()),
        metrics,
        seq: Some(0),
        uuid: None,
        body: None,
    }
}

pub fn new_data_payload(seq: u8, metrics: Vec<Metric>) -> Payload {
    Payload {
        timestamp: Some(timestamp()),
        metrics,
        seq: Some(seq as u64),
        uuid: None,
        body: None,
    }
}

/// Encode a payload and ingest it as if received on `topic`
pub fn ingest(topic: &str, payload: Payload, received_at: DateTime<Utc>) -> Message {
    let bytes: Vec<u8> = payload.into();
    Message::ingest(topic, &bytes, received_at).unwrap()
}
