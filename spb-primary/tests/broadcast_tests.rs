use std::{sync::Arc, time::Duration};

use chrono::Utc;
use futures::StreamExt;
use spb_primary::{
    ingest_channel, spawn_writer, Broadcaster, Event, EventPayload, NodeEvent, NodeView, Store,
};
use tokio::time::timeout;
use utils::payloads::{bool_metric, ingest, new_birth_payload, new_data_payload};

mod utils;

fn node_death(n: usize) -> Event {
    let now = Utc::now();
    Event {
        timestamp: now,
        payload: EventPayload::NodeDeath(NodeEvent {
            node: NodeView {
                id: format!("N{n}"),
                group_id: "G".into(),
                online: false,
                last_message_at: now,
            },
        }),
    }
}

fn node_id(event: &Event) -> &str {
    match &event.payload {
        EventPayload::NodeDeath(death) => &death.node.id,
        payload => panic!("got {payload:?}"),
    }
}

#[tokio::test]
async fn slow_subscriber_drops_fast_subscriber_receives_all() {
    let broadcaster = Broadcaster::new(10);
    let slow = broadcaster.subscribe();
    let mut fast = broadcaster.subscribe();
    assert_eq!(broadcaster.subscriber_count(), 2);

    for n in 0..11 {
        broadcaster.publish(node_death(n));
        let event = timeout(Duration::from_secs(1), fast.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(node_id(&event), format!("N{n}"));
    }
    assert_eq!(fast.dropped(), 0);
    assert_eq!(slow.dropped(), 1);
    assert_eq!(broadcaster.dropped(), 0);

    let mut slow = slow;
    slow.close();
    let mut received = vec![];
    while let Some(event) = slow.recv().await {
        received.push(node_id(&event).to_string());
    }
    let expected: Vec<String> = (0..10).map(|n| format!("N{n}")).collect();
    assert_eq!(received, expected);
    assert_eq!(broadcaster.subscriber_count(), 1);
}

#[tokio::test]
async fn subscription_is_a_stream() {
    let broadcaster = Broadcaster::new(10);
    let mut subscription = broadcaster.subscribe();
    broadcaster.publish(node_death(1));
    broadcaster.publish(node_death(2));

    let first = timeout(Duration::from_secs(1), subscription.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(node_id(&first), "N1");
    let second = timeout(Duration::from_secs(1), subscription.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(node_id(&second), "N2");
}

#[tokio::test]
async fn dropping_broadcaster_ends_subscriptions() {
    let broadcaster = Broadcaster::new(10);
    let mut subscription = broadcaster.subscribe();
    drop(broadcaster);
    let end = timeout(Duration::from_secs(1), subscription.recv()).await.unwrap();
    assert!(end.is_none());
}

#[tokio::test]
async fn unsubscribe_and_drop_deregister() {
    let broadcaster = Broadcaster::new(10);
    let a = broadcaster.subscribe();
    let b = broadcaster.subscribe();
    assert_eq!(broadcaster.subscriber_count(), 2);
    broadcaster.unsubscribe(a);
    assert_eq!(broadcaster.subscriber_count(), 1);
    drop(b);
    assert_eq!(broadcaster.subscriber_count(), 0);
    // publishing with nobody listening is fine
    broadcaster.publish(node_death(0));
}

#[tokio::test]
async fn writer_publishes_store_events() {
    let store = Arc::new(Store::default());
    let broadcaster = Broadcaster::new(10);
    let mut subscription = broadcaster.subscribe();
    let (tx, rx) = ingest_channel(10);
    let writer = spawn_writer(store.clone(), rx, broadcaster.clone());

    let now = Utc::now();
    tx.send(ingest(
        "spBv1.0/G/NBIRTH/N1",
        new_birth_payload(vec![bool_metric(1, "Light", true)]),
        now,
    ))
    .await
    .unwrap();
    // unknown node, dropped without an event
    tx.send(ingest("spBv1.0/G/NDEATH/N2", new_data_payload(0, vec![]), now))
        .await
        .unwrap();
    tx.send(ingest("spBv1.0/G/NDEATH/N1", new_data_payload(0, vec![]), now))
        .await
        .unwrap();

    let birth = timeout(Duration::from_secs(1), subscription.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(birth.payload.kind(), "NBIRTH");
    let death = timeout(Duration::from_secs(1), subscription.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(death.payload.kind(), "NDEATH");
    assert_eq!(node_id(&death), "N1");

    drop(tx);
    timeout(Duration::from_secs(1), writer).await.unwrap().unwrap();
    assert!(!store.fetch_all()[0].nodes[0].node.online);
}

#[test]
fn event_json() {
    let event = node_death(1);
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "NDEATH");
    assert_eq!(value["data"]["node"]["id"], "N1");
    assert_eq!(value["data"]["node"]["groupId"], "G");
    assert!(value["timestamp"].is_string());
}
