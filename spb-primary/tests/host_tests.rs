use spb_client::{
    channel::{ChannelBroker, ChannelEventLoop, OutboundMessage},
    Event, StatePayload,
};
use spb_primary::{
    ingest_channel, Host, HostError, HostEvent, MessageKind, SubscriptionConfig,
};
use spb_types::{
    payload::StateBirthDeathCertificate,
    topic::{QoS, StateTopic, Topic, TopicFilter},
};
use std::time::Duration;
use tokio::time::timeout;
use utils::payloads::{bool_metric, new_birth_payload};

mod utils;

async fn next_outbound(broker: &mut ChannelBroker) -> OutboundMessage {
    timeout(Duration::from_secs(1), broker.rx_outbound.recv())
        .await
        .unwrap()
        .unwrap()
}

async fn get_subscriptions_from_broker(broker: &mut ChannelBroker) -> Vec<TopicFilter> {
    match next_outbound(broker).await {
        OutboundMessage::Subscribe(filters) => filters,
        message => panic!("got {message:?}"),
    }
}

async fn get_state_from_broker(broker: &mut ChannelBroker) -> (StateTopic, StatePayload) {
    match next_outbound(broker).await {
        OutboundMessage::StateMessage { topic, payload } => (topic, payload),
        message => panic!("got {message:?}"),
    }
}

fn assert_filters_eq(a: Vec<TopicFilter>, b: Vec<TopicFilter>) {
    assert_eq!(a.len(), b.len());
    for x in a {
        assert!(b.contains(&x), "Sub filters did not contain expected filter: {x:?}")
    }
}

#[tokio::test]
async fn host_states() {
    let host_id = "foo";

    let (eventloop, client, mut broker) = ChannelEventLoop::new();
    let (host, host_client) = Host::new(
        host_id,
        SubscriptionConfig::SingleGroup {
            group_id: "test".into(),
        },
        eventloop,
        client,
    )
    .unwrap();
    let (tx, _rx) = ingest_channel(10);
    let task = tokio::spawn(host.run(tx));

    broker.tx_event.send(Event::Online).unwrap();
    let filters = get_subscriptions_from_broker(&mut broker).await;
    let expected_filters = vec![
        TopicFilter::new_with_qos(Topic::State(StateTopic::new_host(host_id)), QoS::AtMostOnce),
        TopicFilter::new_with_qos(Topic::Group { id: "test".into() }, QoS::AtMostOnce),
    ];
    assert_filters_eq(filters, expected_filters);

    let will = broker.last_will().unwrap();
    assert!(will.retain);
    assert_eq!(will.qos, QoS::AtLeastOnce);
    assert_eq!(will.topic, StateTopic::new_host(host_id).topic);
    let payload = StateBirthDeathCertificate::try_from(will.payload.as_slice()).unwrap();
    assert!(!payload.online);
    let will_payload_timestamp = payload.timestamp;

    let (topic, payload) = get_state_from_broker(&mut broker).await;
    assert_eq!(topic, StateTopic::new_host(host_id));
    //timestamp in will must equal timestamp of online message
    assert_eq!(
        payload,
        StatePayload::Online {
            timestamp: will_payload_timestamp
        }
    );

    //if an offline message for the host is received, republish online
    broker
        .tx_event
        .send(Event::State {
            host_id: host_id.into(),
            payload: StatePayload::Offline { timestamp: 0 },
        })
        .unwrap();
    let (topic, payload) = get_state_from_broker(&mut broker).await;
    assert_eq!(topic, StateTopic::new_host(host_id));
    assert_eq!(
        payload,
        StatePayload::Online {
            timestamp: will_payload_timestamp
        }
    );

    //offline message published on graceful shutdown
    host_client.cancel().await;
    let (topic, payload) = get_state_from_broker(&mut broker).await;
    assert_eq!(topic, StateTopic::new_host(host_id));
    assert!(matches!(payload, StatePayload::Offline { timestamp: _ }));
    assert_eq!(next_outbound(&mut broker).await, OutboundMessage::Disconnect);

    timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
}

#[tokio::test]
async fn all_groups_subscribes_to_namespace_only() {
    let (eventloop, client, mut broker) = ChannelEventLoop::new();
    let (host, _host_client) =
        Host::new("foo", SubscriptionConfig::AllGroups, eventloop, client).unwrap();
    let (tx, _rx) = ingest_channel(10);
    tokio::spawn(host.run(tx));

    broker.tx_event.send(Event::Online).unwrap();
    let filters = get_subscriptions_from_broker(&mut broker).await;
    assert_eq!(filters, vec![TopicFilter::new(Topic::Namespace)]);
}

#[tokio::test]
async fn forwards_messages() {
    let (eventloop, client, broker) = ChannelEventLoop::new();
    let (mut host, _host_client) =
        Host::new("foo", SubscriptionConfig::AllGroups, eventloop, client).unwrap();

    let payload: Vec<u8> = new_birth_payload(vec![bool_metric(1, "a", true)]).into();
    broker
        .tx_event
        .send(spb_client::topic_and_payload_to_event(
            "spBv1.0/G/NBIRTH/N1".into(),
            payload,
        ))
        .unwrap();
    broker
        .tx_event
        .send(spb_client::topic_and_payload_to_event(
            "spBv1.0/G/NDATA".into(),
            vec![],
        ))
        .unwrap();

    let event = timeout(Duration::from_secs(1), host.poll()).await.unwrap();
    let message = match event {
        HostEvent::Message(message) => message,
        event => panic!("got {event:?}"),
    };
    assert_eq!(message.kind, MessageKind::NodeBirth);
    assert_eq!(message.path(), "G/N1");
    assert_eq!(message.metrics.len(), 1);

    let event = timeout(Duration::from_secs(1), host.poll()).await.unwrap();
    assert!(matches!(event, HostEvent::InvalidPublish { .. }));
}

#[tokio::test]
async fn run_feeds_ingestion_channel() {
    let (eventloop, client, broker) = ChannelEventLoop::new();
    let (host, host_client) =
        Host::new("foo", SubscriptionConfig::AllGroups, eventloop, client).unwrap();
    let (tx, mut rx) = ingest_channel(10);
    let task = tokio::spawn(host.run(tx));

    let payload: Vec<u8> = new_birth_payload(vec![bool_metric(1, "a", true)]).into();
    broker
        .tx_event
        .send(spb_client::topic_and_payload_to_event(
            "spBv1.0/G/DBIRTH/N1/D1".into(),
            payload,
        ))
        .unwrap();
    let message = timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.kind, MessageKind::DeviceBirth);
    assert_eq!(message.device_id.as_deref(), Some("D1"));

    host_client.cancel().await;
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
}

#[test]
fn invalid_host_id() {
    let (eventloop, client, _broker) = ChannelEventLoop::new();
    assert!(matches!(
        Host::new("foo/bar", SubscriptionConfig::AllGroups, eventloop, client),
        Err(HostError::InvalidHostId(_))
    ));
}
