use std::{future::IntoFuture, sync::Arc};

use anyhow::Context;
use clap::Parser;
use log::info;
use spb_client_rumqtt as rumqtt;
use spb_primary::{ingest_channel, spawn_writer, Broadcaster, Host, Store};

mod config;
mod routes;

use config::Config;
use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    env_logger::Builder::new()
        .parse_filters(&config.log_level)
        .init();

    let store = Arc::new(Store::new(config.store_options()));
    let broadcaster = Broadcaster::new(config.event_queue_capacity);
    let (tx, rx) = ingest_channel(config.ingest_queue_capacity);
    let writer = spawn_writer(store.clone(), rx, broadcaster.clone());

    let (eventloop, client) = rumqtt::EventLoop::new(config.mqtt_options(), 10);
    let (host, host_client) = Host::new(
        config.host_id.clone(),
        config.subscription_config(),
        eventloop,
        client,
    )?;
    let host_task = tokio::spawn(host.run(tx));

    let app = routes::router(
        AppState {
            store,
            broadcaster,
        },
        config.static_dir.as_deref(),
    );
    let listener = tokio::net::TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.http_addr))?;
    info!(
        "Host {} connecting to {}:{}, serving on {}",
        config.host_id, config.mqtt_host, config.mqtt_port, config.http_addr
    );

    // open event streams never finish on their own, so no graceful drain
    tokio::select! {
        result = axum::serve(listener, app).into_future() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    host_client.cancel().await;
    host_task.await?;
    // the host held the last sender, so the writer drains and stops
    writer.await?;
    Ok(())
}
