use crate::{DeviceMessage, Event, Message, MessageError, MessageKind, NodeMessage, StatePayload};

use prost::Message as ProstMessage;
use spb_types::{
    constants::{SPBV01, STATE},
    payload::Payload,
};

enum MessageProducer {
    Device,
    Node,
}

fn process_topic_message(
    message_part: &[u8],
    payload: &[u8],
) -> Result<(MessageProducer, Message), MessageError> {
    if message_part.len() < 2 {
        return Err(MessageError::InvalidSparkplugTopic);
    }
    let producer = match message_part[0] {
        b'N' => MessageProducer::Node,
        b'D' => MessageProducer::Device,
        _ => return Err(MessageError::InvalidSparkplugTopic),
    };

    let kind = match &message_part[1..] {
        b"BIRTH" => MessageKind::Birth,
        b"DEATH" => MessageKind::Death,
        b"DATA" => MessageKind::Data,
        b"CMD" => MessageKind::Cmd,
        _ => MessageKind::Other(String::from_utf8(message_part.to_vec())?),
    };

    let payload = Payload::decode(payload)?;
    Ok((producer, Message { payload, kind }))
}

fn parse(topic: &[u8], payload: &[u8]) -> Result<Event, MessageError> {
    let mut iter = topic.split(|c| *c == b'/');

    match iter.next() {
        Some(namespace) if namespace == SPBV01.as_bytes() => (),
        _ => return Err(MessageError::InvalidSparkplugTopic),
    }

    let state_or_group_id = match iter.next() {
        Some(val) if !val.is_empty() => val,
        _ => return Err(MessageError::InvalidSparkplugTopic),
    };

    if STATE.as_bytes().eq(state_or_group_id) {
        let host_id = match (iter.next(), iter.next()) {
            (Some(host_id), None) if !host_id.is_empty() => String::from_utf8(host_id.to_vec())?,
            _ => return Err(MessageError::InvalidSparkplugTopic),
        };
        let payload = StatePayload::try_from(payload)?;
        return Ok(Event::State { host_id, payload });
    }

    let group_id = String::from_utf8(state_or_group_id.to_vec())?;

    let (message_producer, message) = match iter.next() {
        Some(val) => process_topic_message(val, payload)?,
        None => return Err(MessageError::InvalidSparkplugTopic),
    };

    let node_id = match iter.next() {
        Some(val) if !val.is_empty() => String::from_utf8(val.to_vec())?,
        _ => return Err(MessageError::InvalidSparkplugTopic),
    };

    let event = match message_producer {
        MessageProducer::Node => {
            if iter.next().is_some() {
                return Err(MessageError::InvalidSparkplugTopic);
            }
            Event::Node(NodeMessage {
                group_id,
                node_id,
                message,
            })
        }
        MessageProducer::Device => {
            let device_id = match iter.next() {
                Some(val) if !val.is_empty() => String::from_utf8(val.to_vec())?,
                _ => return Err(MessageError::InvalidSparkplugTopic),
            };
            if iter.next().is_some() {
                return Err(MessageError::InvalidSparkplugTopic);
            }
            Event::Device(DeviceMessage {
                group_id,
                node_id,
                device_id,
                message,
            })
        }
    };
    Ok(event)
}

/// Decode a raw publish into an [Event].
///
/// Topics that do not follow `spBv1.0/<group>/<KIND>/<node>[/<device>]` or
/// `spBv1.0/STATE/<host>`, and payloads that fail to decode, produce [Event::InvalidPublish].
pub fn topic_and_payload_to_event(topic: Vec<u8>, payload: Vec<u8>) -> Event {
    match parse(&topic, &payload) {
        Ok(event) => event,
        Err(reason) => Event::InvalidPublish {
            reason,
            topic,
            payload,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spb_types::payload::{metric, DataType, Metric};

    fn payload_bytes() -> Vec<u8> {
        let mut metric = Metric::new();
        metric
            .set_name("a".into())
            .set_alias(1)
            .set_datatype(DataType::Boolean)
            .set_value(metric::Value::BooleanValue(true));
        Payload::with_metrics(0, vec![metric]).into()
    }

    fn event(topic: &str) -> Event {
        topic_and_payload_to_event(topic.as_bytes().to_vec(), payload_bytes())
    }

    fn assert_invalid_topic(topic: &str) {
        match event(topic) {
            Event::InvalidPublish { reason, .. } => {
                assert_eq!(reason, MessageError::InvalidSparkplugTopic, "{topic}")
            }
            other => panic!("{topic} produced {other:?}"),
        }
    }

    #[test]
    fn node_topics() {
        for (verb, kind) in [
            ("NBIRTH", MessageKind::Birth),
            ("NDEATH", MessageKind::Death),
            ("NDATA", MessageKind::Data),
            ("NCMD", MessageKind::Cmd),
        ] {
            match event(&format!("spBv1.0/G/{verb}/N1")) {
                Event::Node(message) => {
                    assert_eq!(message.group_id, "G");
                    assert_eq!(message.node_id, "N1");
                    assert_eq!(message.message.kind, kind);
                    assert_eq!(message.message.payload.metrics.len(), 1);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn device_topics() {
        for (verb, kind) in [
            ("DBIRTH", MessageKind::Birth),
            ("DDEATH", MessageKind::Death),
            ("DDATA", MessageKind::Data),
            ("DCMD", MessageKind::Cmd),
        ] {
            match event(&format!("spBv1.0/G/{verb}/N1/D1")) {
                Event::Device(message) => {
                    assert_eq!(message.group_id, "G");
                    assert_eq!(message.node_id, "N1");
                    assert_eq!(message.device_id, "D1");
                    assert_eq!(message.message.kind, kind);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_verb_is_carried() {
        match event("spBv1.0/G/NFOO/N1") {
            Event::Node(message) => {
                assert_eq!(message.message.kind, MessageKind::Other("NFOO".into()))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn invalid_topics() {
        assert_invalid_topic("spBv2.0/G/NBIRTH/N1");
        assert_invalid_topic("spBv1.0/G/NBIRTH");
        assert_invalid_topic("spBv1.0/G/NBIRTH/N1/D1");
        assert_invalid_topic("spBv1.0/G/DBIRTH/N1");
        assert_invalid_topic("spBv1.0/G/DBIRTH/N1/D1/extra");
        assert_invalid_topic("spBv1.0/G/XBIRTH/N1");
        assert_invalid_topic("spBv1.0//NBIRTH/N1");
        assert_invalid_topic("spBv1.0/G/N/N1");
    }

    #[test]
    fn invalid_payload() {
        let event = topic_and_payload_to_event(
            b"spBv1.0/G/NDATA/N1".to_vec(),
            vec![0xFF, 0xFF, 0xFF],
        );
        assert!(matches!(
            event,
            Event::InvalidPublish {
                reason: MessageError::DecodePayloadError(_),
                ..
            }
        ));
    }

    #[test]
    fn state_topic() {
        let event = topic_and_payload_to_event(
            b"spBv1.0/STATE/host".to_vec(),
            br#"{"online" : false, "timestamp" : 5}"#.to_vec(),
        );
        assert_eq!(
            event,
            Event::State {
                host_id: "host".into(),
                payload: StatePayload::Offline { timestamp: 5 }
            }
        );

        let event = topic_and_payload_to_event(b"spBv1.0/STATE/host".to_vec(), b"ONLINE".to_vec());
        assert!(matches!(
            event,
            Event::InvalidPublish {
                reason: MessageError::StatePayloadJsonDecodeError(_),
                ..
            }
        ));
    }
}
