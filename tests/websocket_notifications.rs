//! Change notifications delivered over a WebSocket channel.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use url::Url;

use gateway_sync::certs::CertificateStore;
use gateway_sync::config::{NotificationConfig, ReloadConfig};
use gateway_sync::management::ManagementClient;
use gateway_sync::notifications::{ChangeListener, NotificationCommand, NotificationSource, WebSocketSource};
use gateway_sync::reload::ReloadCoalescer;
use gateway_sync::specs::ConfigStore;

mod common;

#[tokio::test]
async fn test_websocket_subscription_receives_frames() {
    let channel = common::MockChannel::new();
    let url = common::start_channel(channel.clone()).await;

    let source = WebSocketSource::new(Url::parse(&url).unwrap());
    let mut subscription = source.subscribe("gateway.cluster.notifications").await.unwrap();
    assert!(common::eventually(|| channel.subscribers() == 1).await);

    channel.publish(r#"{"Command":"ApiRemoved"}"#);
    let message = subscription.next_message().await.unwrap();
    assert_eq!(message, br#"{"Command":"ApiRemoved"}"#.to_vec());
}

#[tokio::test]
async fn test_websocket_subscribe_to_dead_endpoint_fails() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = WebSocketSource::new(Url::parse(&format!("ws://{addr}/notifications")).unwrap());
    assert!(source.subscribe("gateway.cluster.notifications").await.is_err());
}

#[tokio::test]
async fn test_websocket_notifications_reload_store() {
    let plane = common::MockPlane::new();
    plane.set_configs_body(r#"{"Status":"OK","Nonce":"1","Message":[{"id":"api-1"}]}"#);
    let plane_url = common::start_plane(plane.clone()).await;

    let channel = common::MockChannel::new();
    let channel_url = common::start_channel(channel.clone()).await;

    let client = ManagementClient::new(&common::management_config(&plane_url), CertificateStore::new()).unwrap();
    let reload = ReloadConfig {
        debounce_ms: 10,
        reconcile_interval_secs: 0,
    };
    let coalescer = ReloadCoalescer::new(Arc::new(client), Arc::new(ConfigStore::new()), reload);
    let store = coalescer.store().clone();

    let (shutdown, _) = broadcast::channel::<()>(1);
    tokio::spawn(coalescer.clone().run(shutdown.subscribe()));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let config = NotificationConfig {
        enabled: true,
        url: channel_url.clone(),
        reconnect_base_delay_ms: 10,
        reconnect_max_delay_ms: 50,
        ..NotificationConfig::default()
    };
    let listener = ChangeListener::new(
        Arc::new(WebSocketSource::new(Url::parse(&channel_url).unwrap())),
        coalescer,
        config,
    )
    .with_handler(move |command| recorder.lock().unwrap().push(command));
    tokio::spawn(listener.run(shutdown.subscribe()));

    assert!(common::eventually(|| channel.subscribers() == 1).await);
    channel.publish("not json");
    channel.publish(r#"{"Command":"ConfigUpdated"}"#);

    assert!(common::eventually(|| store.get("api-1").is_some()).await);
    assert_eq!(*seen.lock().unwrap(), vec![NotificationCommand::ApiUpdated]);
    assert_eq!(channel.connections.load(Ordering::SeqCst), 1);

    let _ = shutdown.send(());
}
