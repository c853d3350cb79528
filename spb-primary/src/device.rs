use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use parking_lot::RwLock;
use serde::Serialize;
use spb_types::payload;

use crate::metric::{MetricSet, MetricView, Warnings};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    pub id: String,
    pub node_id: String,
    pub group_id: String,
    pub online: bool,
    pub last_message_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullDevice {
    #[serde(flatten)]
    pub device: DeviceView,
    pub metrics: Vec<MetricView>,
}

pub(crate) fn advance(last_message_at: &mut DateTime<Utc>, received_at: DateTime<Utc>) {
    if received_at > *last_message_at {
        *last_message_at = received_at;
    }
}

struct DeviceInner {
    online: bool,
    last_message_at: DateTime<Utc>,
    metrics: MetricSet,
}

/// State of a single device attached to an edge node
pub struct Device {
    group_id: String,
    node_id: String,
    device_id: String,
    warnings: Arc<Warnings>,
    inner: RwLock<DeviceInner>,
}

impl Device {
    pub(crate) fn new(
        group_id: &str,
        node_id: &str,
        device_id: &str,
        created_at: DateTime<Utc>,
        warnings: Arc<Warnings>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            node_id: node_id.into(),
            device_id: device_id.into(),
            warnings,
            inner: RwLock::new(DeviceInner {
                online: false,
                last_message_at: created_at,
                metrics: MetricSet::default(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.device_id
    }

    fn scope(&self, kind: &str) -> String {
        format!("{kind} {}/{}/{}", self.group_id, self.node_id, self.device_id)
    }

    fn view(&self, inner: &DeviceInner) -> DeviceView {
        DeviceView {
            id: self.device_id.clone(),
            node_id: self.node_id.clone(),
            group_id: self.group_id.clone(),
            online: inner.online,
            last_message_at: inner.last_message_at,
        }
    }

    fn full(&self, inner: &DeviceInner) -> FullDevice {
        FullDevice {
            device: self.view(inner),
            metrics: inner.metrics.snapshot(!inner.online),
        }
    }

    /// Replace the metric set and mark the device online.
    ///
    /// Returns `None` and leaves the state untouched when the certificate carries no metrics.
    pub fn birth(&self, received_at: DateTime<Utc>, metrics: &[payload::Metric]) -> Option<FullDevice> {
        let scope = self.scope("DBIRTH");
        if metrics.is_empty() {
            warn!("{scope}: birth certificate has no metrics");
            self.warnings.record();
            return None;
        }
        let metrics = MetricSet::from_birth(&scope, metrics, &self.warnings);
        let mut inner = self.inner.write();
        advance(&mut inner.last_message_at, received_at);
        inner.online = true;
        inner.metrics = metrics;
        debug!("{scope}: online with {} metrics", inner.metrics.len());
        Some(self.full(&inner))
    }

    /// Update metrics in place. Applies while offline too.
    pub fn data(&self, received_at: DateTime<Utc>, metrics: &[payload::Metric]) -> Option<FullDevice> {
        let scope = self.scope("DDATA");
        if metrics.is_empty() {
            warn!("{scope}: data message has no metrics");
            self.warnings.record();
            return None;
        }
        let mut inner = self.inner.write();
        advance(&mut inner.last_message_at, received_at);
        inner.metrics.apply_data(&scope, metrics, &self.warnings);
        Some(self.full(&inner))
    }

    pub fn death(&self, received_at: DateTime<Utc>) -> DeviceView {
        let mut inner = self.inner.write();
        advance(&mut inner.last_message_at, received_at);
        inner.online = false;
        debug!("{}: offline", self.scope("DDEATH"));
        self.view(&inner)
    }

    /// Mark offline following the death of the parent node
    pub(crate) fn set_offline(&self) {
        self.inner.write().online = false;
    }

    pub fn is_online(&self) -> bool {
        self.inner.read().online
    }

    pub fn fetch(&self) -> DeviceView {
        self.view(&self.inner.read())
    }

    pub fn fetch_full(&self) -> FullDevice {
        self.full(&self.inner.read())
    }
}
