use serde::{Deserialize, Serialize};

pub use crate::generated::sparkplug_payload::{payload::*, *};

pub use prost::Message;

impl Metric {
    pub fn new() -> Self {
        Self {
            name: None,
            alias: None,
            timestamp: None,
            datatype: None,
            is_historical: None,
            is_transient: None,
            is_null: None,
            metadata: None,
            properties: None,
            value: None,
        }
    }

    pub fn set_name(&mut self, name: String) -> &mut Self {
        self.name = Some(name);
        self
    }

    pub fn set_alias(&mut self, alias: u64) -> &mut Self {
        self.alias = Some(alias);
        self
    }

    pub fn set_datatype(&mut self, datatype: DataType) -> &mut Self {
        self.datatype = Some(datatype as u32);
        self
    }

    pub fn set_timestamp(&mut self, timestamp: u64) -> &mut Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn set_value(&mut self, value: metric::Value) -> &mut Self {
        self.value = Some(value);
        self.is_null = None;
        self
    }

    pub fn set_null(&mut self) -> &mut Self {
        self.value = None;
        self.is_null = Some(true);
        self
    }
}

impl Payload {
    /// Create a payload stamped with `timestamp` carrying `metrics`
    pub fn with_metrics(timestamp: u64, metrics: Vec<Metric>) -> Self {
        Self {
            timestamp: Some(timestamp),
            metrics,
            seq: None,
            uuid: None,
            body: None,
        }
    }
}

impl From<Payload> for Vec<u8> {
    fn from(value: Payload) -> Self {
        value.encode_to_vec()
    }
}

impl TryFrom<u32> for DataType {
    type Error = ();

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        let v = i32::try_from(v).map_err(|_| ())?;
        DataType::try_from(v).map_err(|_| ())
    }
}

/// JSON body of a message published on a host application STATE topic
#[derive(Debug, Serialize, Deserialize)]
pub struct StateBirthDeathCertificate {
    pub timestamp: u64,
    pub online: bool,
}

impl TryFrom<StateBirthDeathCertificate> for Vec<u8> {
    type Error = String;
    fn try_from(value: StateBirthDeathCertificate) -> Result<Self, Self::Error> {
        serde_json::to_vec(&value).map_err(|e| e.to_string())
    }
}

impl TryFrom<&[u8]> for StateBirthDeathCertificate {
    type Error = String;
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        serde_json::from_slice::<StateBirthDeathCertificate>(value).map_err(|e| e.to_string())
    }
}
