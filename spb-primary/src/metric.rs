use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
};

use chrono::{DateTime, TimeZone, Utc};
use log::warn;
use serde::Serialize;
use spb_types::{
    payload::{self, DataType},
    MetricValue, MetricValueKind,
};

use crate::error::MetricError;

/// Counter of metrics and messages rejected during processing
#[derive(Debug, Default)]
pub struct Warnings(AtomicU64);

impl Warnings {
    pub fn record(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

fn millis_to_datetime(millis: u64) -> Result<DateTime<Utc>, MetricError> {
    i64::try_from(millis)
        .ok()
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
        .ok_or_else(|| MetricError::MalformedMetric(format!("timestamp {millis} out of range")))
}

fn decode_value(
    datatype: DataType,
    raw: &payload::Metric,
) -> Result<MetricValueKind, MetricError> {
    let value = match &raw.value {
        Some(value) => MetricValue::new(value.clone()),
        None => return Err(MetricError::MalformedMetric("metric value is missing".into())),
    };
    Ok(MetricValueKind::try_from_metric_value(datatype, value)?)
}

/// A single named, aliased telemetry point belonging to a node or device.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    name: String,
    alias: u64,
    datatype: DataType,
    timestamp: Option<DateTime<Utc>>,
    /// `None` when the metric is null
    value: Option<MetricValueKind>,
}

impl Metric {
    /// Decode a metric from a birth certificate.
    ///
    /// The raw metric must carry an alias, a name and a datatype.
    pub fn decode(raw: &payload::Metric) -> Result<Self, MetricError> {
        let alias = raw
            .alias
            .ok_or_else(|| MetricError::MalformedMetric("metric alias is missing".into()))?;
        let name = raw
            .name
            .clone()
            .ok_or_else(|| MetricError::MalformedMetric("metric name is missing".into()))?;
        let datatype = raw
            .datatype
            .ok_or_else(|| MetricError::MalformedMetric("metric datatype is missing".into()))?;
        let datatype = DataType::try_from(datatype).map_err(|_| {
            MetricError::MalformedMetric(format!("metric datatype {datatype} is invalid"))
        })?;

        let timestamp = raw.timestamp.map(millis_to_datetime).transpose()?;
        let value = match raw.is_null.unwrap_or(false) {
            true => None,
            false => Some(decode_value(datatype, raw)?),
        };

        Ok(Self {
            name,
            alias,
            datatype,
            timestamp,
            value,
        })
    }

    /// Apply a data update to the metric.
    ///
    /// On a failed value decode the previous value is kept.
    pub fn update(&mut self, raw: &payload::Metric) -> Result<(), MetricError> {
        let alias = raw
            .alias
            .ok_or_else(|| MetricError::MalformedMetric("metric alias is missing".into()))?;
        if alias != self.alias {
            return Err(MetricError::AliasMismatch {
                expected: self.alias,
                actual: alias,
            });
        }
        if let Some(timestamp) = raw.timestamp {
            self.timestamp = Some(millis_to_datetime(timestamp)?);
        }

        if raw.is_null == Some(true) {
            self.value = None;
            return Ok(());
        }

        // a rejected value leaves the metric as it was, a null metric stays null
        self.value = Some(decode_value(self.datatype, raw)?);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> u64 {
        self.alias
    }

    pub fn datatype(&self) -> DataType {
        self.datatype
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    pub fn value(&self) -> Option<&MetricValueKind> {
        self.value.as_ref()
    }

    /// Project the metric to its external representation with the supplied staleness
    pub fn snapshot(&self, stale: bool) -> MetricView {
        MetricView {
            name: self.name.clone(),
            alias: self.alias,
            stale,
            data_type: self.datatype.as_str_name(),
            timestamp: self.timestamp,
            is_null: self.is_null(),
            value: self.value.clone(),
        }
    }
}

/// External representation of a [Metric]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricView {
    pub name: String,
    pub alias: u64,
    pub stale: bool,
    pub data_type: &'static str,
    pub timestamp: Option<DateTime<Utc>>,
    pub is_null: bool,
    pub value: Option<MetricValueKind>,
}

/// The metrics of a node or device, keyed by alias
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet(BTreeMap<u64, Metric>);

impl MetricSet {
    /// Build the metric set established by a birth certificate.
    ///
    /// Metrics that fail to decode are skipped. `scope` prefixes log lines, e.g. `NBIRTH G/N1`.
    pub fn from_birth(scope: &str, raw: &[payload::Metric], warnings: &Warnings) -> Self {
        let mut metrics = BTreeMap::new();
        for raw_metric in raw {
            match Metric::decode(raw_metric) {
                Ok(metric) => {
                    if let Some(previous) = metrics.insert(metric.alias, metric) {
                        warn!(
                            "{scope}: duplicate alias {} replaces metric {}",
                            previous.alias, previous.name
                        );
                        warnings.record();
                    }
                }
                Err(e) => {
                    warn!(
                        "{scope}: skipping metric {}: {e}",
                        raw_metric.name.as_deref().unwrap_or("<unnamed>")
                    );
                    warnings.record();
                }
            }
        }
        Self(metrics)
    }

    /// Apply data metrics by alias. Unknown aliases and invalid values are skipped.
    pub fn apply_data(&mut self, scope: &str, raw: &[payload::Metric], warnings: &Warnings) {
        for raw_metric in raw {
            let Some(alias) = raw_metric.alias else {
                warn!(
                    "{scope}: metric {} has no alias",
                    raw_metric.name.as_deref().unwrap_or("<unnamed>")
                );
                warnings.record();
                continue;
            };
            let Some(metric) = self.0.get_mut(&alias) else {
                warn!("{scope}: unknown alias {alias}");
                warnings.record();
                continue;
            };
            if let Err(e) = metric.update(raw_metric) {
                warn!("{scope}: invalid update for metric {}: {e}", metric.name);
                warnings.record();
            }
        }
    }

    pub fn get(&self, alias: u64) -> Option<&Metric> {
        self.0.get(&alias)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Snapshot every metric in ascending alias order
    pub fn snapshot(&self, stale: bool) -> Vec<MetricView> {
        self.0.values().map(|metric| metric.snapshot(stale)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spb_types::payload::metric::Value;

    fn raw(alias: u64, name: &str, datatype: DataType, value: Value) -> payload::Metric {
        let mut metric = payload::Metric::new();
        metric
            .set_alias(alias)
            .set_name(name.into())
            .set_datatype(datatype)
            .set_value(value);
        metric
    }

    fn data(alias: u64, value: Value) -> payload::Metric {
        let mut metric = payload::Metric::new();
        metric.set_alias(alias).set_value(value);
        metric
    }

    #[test]
    fn decode_snapshot_each_type() {
        let cases = [
            (DataType::Boolean, Value::BooleanValue(true), MetricValueKind::Boolean(true)),
            (DataType::Double, Value::DoubleValue(1.25), MetricValueKind::Double(1.25)),
            (DataType::Float, Value::FloatValue(-2.5), MetricValueKind::Float(-2.5)),
            (DataType::Int8, Value::IntValue(0x80), MetricValueKind::Int8(i8::MIN)),
            (DataType::Int16, Value::IntValue(0xFFFF), MetricValueKind::Int16(-1)),
            (DataType::Int32, Value::IntValue(7), MetricValueKind::Int32(7)),
            (DataType::Int64, Value::LongValue(u64::MAX), MetricValueKind::Int64(-1)),
            (DataType::UInt8, Value::IntValue(255), MetricValueKind::UInt8(255)),
            (DataType::UInt16, Value::IntValue(65535), MetricValueKind::UInt16(65535)),
            (DataType::UInt32, Value::IntValue(u32::MAX), MetricValueKind::UInt32(u32::MAX)),
            (DataType::UInt64, Value::LongValue(u64::MAX), MetricValueKind::UInt64(u64::MAX)),
            (DataType::String, Value::StringValue("s".into()), MetricValueKind::String("s".into())),
            (DataType::Uuid, Value::StringValue("u".into()), MetricValueKind::String("u".into())),
            (DataType::Text, Value::StringValue("t".into()), MetricValueKind::String("t".into())),
        ];
        for (i, (datatype, value, expected)) in cases.into_iter().enumerate() {
            let alias = i as u64;
            let metric = Metric::decode(&raw(alias, "m", datatype, value)).unwrap();
            let view = metric.snapshot(false);
            assert_eq!(view.name, "m");
            assert_eq!(view.alias, alias);
            assert_eq!(view.data_type, datatype.as_str_name());
            assert_eq!(view.value, Some(expected));
            assert!(!view.is_null);
            assert!(!view.stale);
        }
    }

    #[test]
    fn decode_requires_identity() {
        let mut no_alias = payload::Metric::new();
        no_alias
            .set_name("a".into())
            .set_datatype(DataType::Boolean)
            .set_value(Value::BooleanValue(true));
        assert!(matches!(
            Metric::decode(&no_alias),
            Err(MetricError::MalformedMetric(_))
        ));

        let mut no_name = payload::Metric::new();
        no_name
            .set_alias(1)
            .set_datatype(DataType::Boolean)
            .set_value(Value::BooleanValue(true));
        assert!(matches!(
            Metric::decode(&no_name),
            Err(MetricError::MalformedMetric(_))
        ));

        let mut no_datatype = payload::Metric::new();
        no_datatype
            .set_alias(1)
            .set_name("a".into())
            .set_value(Value::BooleanValue(true));
        assert!(matches!(
            Metric::decode(&no_datatype),
            Err(MetricError::MalformedMetric(_))
        ));
    }

    #[test]
    fn decode_missing_value_and_unsupported_type() {
        let mut missing = payload::Metric::new();
        missing.set_alias(1).set_name("a".into()).set_datatype(DataType::Int32);
        assert!(matches!(
            Metric::decode(&missing),
            Err(MetricError::MalformedMetric(_))
        ));

        let bytes = raw(1, "b", DataType::Bytes, Value::BytesValue(vec![1]));
        assert_eq!(
            Metric::decode(&bytes),
            Err(MetricError::UnsupportedType(DataType::Bytes))
        );
    }

    #[test]
    fn decode_null_metric() {
        let mut null = payload::Metric::new();
        null.set_alias(4)
            .set_name("n".into())
            .set_datatype(DataType::Double)
            .set_timestamp(1_000)
            .set_null();
        let metric = Metric::decode(&null).unwrap();
        assert!(metric.is_null());
        assert_eq!(metric.value(), None);
        assert_eq!(
            metric.timestamp(),
            Some(Utc.timestamp_millis_opt(1_000).unwrap())
        );
    }

    #[test]
    fn update_rules() {
        let mut metric =
            Metric::decode(&raw(1, "speed", DataType::UInt16, Value::IntValue(10))).unwrap();

        let mut update = data(1, Value::IntValue(11));
        update.set_timestamp(5_000);
        metric.update(&update).unwrap();
        assert_eq!(metric.value(), Some(&MetricValueKind::UInt16(11)));
        assert_eq!(
            metric.timestamp(),
            Some(Utc.timestamp_millis_opt(5_000).unwrap())
        );

        let mut null = payload::Metric::new();
        null.set_alias(1).set_null();
        metric.update(&null).unwrap();
        assert!(metric.is_null());

        metric.update(&data(1, Value::IntValue(12))).unwrap();
        assert!(!metric.is_null());
        assert_eq!(metric.value(), Some(&MetricValueKind::UInt16(12)));

        assert_eq!(
            metric.update(&data(2, Value::IntValue(1))),
            Err(MetricError::AliasMismatch {
                expected: 1,
                actual: 2
            })
        );

        // wrong wire variant keeps the previous value
        assert!(metric.update(&data(1, Value::BooleanValue(true))).is_err());
        assert_eq!(metric.value(), Some(&MetricValueKind::UInt16(12)));
    }

    #[test]
    fn null_metric_stays_null_on_bad_update() {
        let mut metric =
            Metric::decode(&raw(1, "level", DataType::Double, Value::DoubleValue(0.5))).unwrap();
        let mut null = payload::Metric::new();
        null.set_alias(1).set_null();
        metric.update(&null).unwrap();
        assert!(metric.is_null());

        let mut bad = data(1, Value::StringValue("high".into()));
        bad.set_timestamp(9_000);
        assert!(metric.update(&bad).is_err());
        assert!(metric.is_null());
        assert_eq!(metric.value(), None);
        assert!(metric.snapshot(false).is_null);
        // the timestamp is refreshed before the value is checked
        assert_eq!(
            metric.timestamp(),
            Some(Utc.timestamp_millis_opt(9_000).unwrap())
        );
    }

    #[test]
    fn metric_set_birth_and_data() {
        let warnings = Warnings::default();
        let mut no_alias = raw(0, "no alias", DataType::Boolean, Value::BooleanValue(true));
        no_alias.alias = None;
        let mut set = MetricSet::from_birth(
            "test",
            &[
                raw(3, "c", DataType::Boolean, Value::BooleanValue(false)),
                raw(1, "a", DataType::Int32, Value::IntValue(1)),
                no_alias,
            ],
            &warnings,
        );
        assert_eq!(set.len(), 2);
        assert_eq!(warnings.count(), 1);
        let aliases: Vec<u64> = set.snapshot(false).iter().map(|m| m.alias).collect();
        assert_eq!(aliases, vec![1, 3]);

        let before = set.clone();
        set.apply_data("test", &[data(9, Value::IntValue(5))], &warnings);
        assert_eq!(set, before);
        assert_eq!(warnings.count(), 2);

        set.apply_data("test", &[data(1, Value::IntValue(5))], &warnings);
        assert_eq!(set.get(1).unwrap().value(), Some(&MetricValueKind::Int32(5)));
        assert_eq!(warnings.count(), 2);
    }

    #[test]
    fn view_json_shape() {
        let metric =
            Metric::decode(&raw(1, "flag", DataType::Boolean, Value::BooleanValue(true))).unwrap();
        let json = serde_json::to_value(metric.snapshot(true)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "flag",
                "alias": 1,
                "stale": true,
                "dataType": "Boolean",
                "timestamp": null,
                "isNull": false,
                "value": true
            })
        );
    }
}
