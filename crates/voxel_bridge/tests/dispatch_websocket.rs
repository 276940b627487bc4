use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use voxel_bridge::core::config::PendingPolicy;
use voxel_bridge::prelude::*;

const WAIT: Duration = Duration::from_secs(5);

/// Local relay. Each finished connection reports the text frames it received.
async fn spawn_relay() -> (String, mpsc::UnboundedReceiver<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                let mut frames = Vec::new();
                while let Some(Ok(message)) = ws.next().await {
                    match message {
                        Message::Text(text) => frames.push(text.as_str().to_string()),
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                let _ = tx.send(frames);
            });
        }
    });

    (url, rx)
}

fn transport(url: &str, policy: PendingPolicy) -> TransportConfig {
    TransportConfig::default()
        .with_server_url(url)
        .with_idle_timeout(Duration::from_millis(200))
        .with_pending_policy(policy)
}

fn record_name(frame: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(frame).unwrap();
    value["name"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn chained_snapshots_follow_the_join_frame_in_order() {
    let (url, mut connections) = spawn_relay().await;
    let dispatcher = WebSocketDispatcher::spawn(&transport(&url, PendingPolicy::Chain), None);
    let mut bridge = Bridge::new(&SceneConfig::default(), dispatcher);

    for name in ["one", "two", "three"] {
        bridge.state_mut().create_box(Vec3::new(0.0, 0.0, 0.0), Color::white());
        bridge.send_data(Some(name)).unwrap();
    }

    let frames = timeout(WAIT, connections.recv()).await.unwrap().unwrap();
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0], "1000");
    let names: Vec<String> = frames[1..].iter().map(|f| record_name(f)).collect();
    assert_eq!(names, vec!["one", "two", "three"]);

    // The relay only reports after the idle close
    timeout(WAIT, bridge.transport().flush()).await.unwrap().unwrap();
    assert_eq!(bridge.transport().state(), ConnectionState::Closed);
}

#[tokio::test]
async fn coalesced_snapshots_keep_only_the_latest() {
    let (url, mut connections) = spawn_relay().await;
    let dispatcher = WebSocketDispatcher::spawn(&transport(&url, PendingPolicy::Coalesce), None);
    let mut bridge = Bridge::new(&SceneConfig::default(), dispatcher);

    for name in ["one", "two", "three"] {
        bridge.send_data(Some(name)).unwrap();
    }

    let frames = timeout(WAIT, connections.recv()).await.unwrap().unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], "1000");
    assert_eq!(record_name(&frames[1]), "three");
}

#[tokio::test]
async fn room_change_opens_a_new_connection() {
    let (url, mut connections) = spawn_relay().await;
    let dispatcher = WebSocketDispatcher::spawn(&transport(&url, PendingPolicy::Chain), None);
    let mut states = dispatcher.subscribe();
    let mut bridge = Bridge::new(&SceneConfig::default().with_room_name("alpha"), dispatcher);

    bridge.send_data(Some("first")).unwrap();
    timeout(WAIT, states.wait_for(|s| *s == ConnectionState::Open))
        .await
        .unwrap()
        .unwrap();

    bridge.state_mut().set_room_name("beta");
    bridge.send_data(Some("second")).unwrap();

    let first = timeout(WAIT, connections.recv()).await.unwrap().unwrap();
    let second = timeout(WAIT, connections.recv()).await.unwrap().unwrap();
    assert_eq!(first[0], "alpha");
    assert_eq!(record_name(&first[1]), "first");
    assert_eq!(second[0], "beta");
    assert_eq!(record_name(&second[1]), "second");
}

#[tokio::test]
async fn refused_connection_reports_and_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let errors: Arc<Mutex<Vec<DispatchError>>> = Arc::default();
    let sink = Arc::clone(&errors);
    let callback: voxel_bridge::net::ErrorCallback = Arc::new(move |e: &DispatchError| {
        sink.lock().unwrap().push(e.clone());
    });

    let config = transport(&url, PendingPolicy::Chain);
    let dispatcher = WebSocketDispatcher::spawn(&config, Some(callback));
    let mut bridge = Bridge::new(&SceneConfig::default(), dispatcher);
    bridge.send_data(None).unwrap();

    timeout(WAIT, bridge.transport().flush()).await.unwrap().unwrap();
    assert_eq!(bridge.transport().state(), ConnectionState::Closed);

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], DispatchError::Connect { .. }));
}

#[tokio::test]
async fn shutdown_stops_the_dispatcher() {
    let (url, _connections) = spawn_relay().await;
    let dispatcher = WebSocketDispatcher::spawn(&transport(&url, PendingPolicy::Chain), None);
    let states = dispatcher.subscribe();
    dispatcher.shutdown().await;
    assert!(states.has_changed().is_err());
}
