//! Feed server tests with a plain WebSocket client.

#![allow(clippy::panic, missing_docs)]

use std::net::SocketAddr;
use std::time::Duration;

use card_status_stream::app_state::FeedState;
use card_status_stream::feed::{self, CardStatus, StatusBus};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

type Client = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn spawn_feed(bus: StatusBus) -> SocketAddr {
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    let app = feed::build_router(FeedState::new(bus));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn open(addr: SocketAddr) -> Client {
    let url = format!("ws://{addr}/ws/card-status");
    match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => panic!("connect failed: {e}"),
    }
}

async fn next_status(client: &mut Client) -> CardStatus {
    loop {
        let frame = match tokio::time::timeout(WAIT, client.next()).await {
            Ok(Some(Ok(frame))) => frame,
            other => panic!("expected a frame, got {other:?}"),
        };
        if let Message::Text(text) = frame {
            let Ok(status) = serde_json::from_str::<CardStatus>(text.as_str()) else {
                panic!("feed sent malformed JSON: {text}");
            };
            return status;
        }
    }
}

#[tokio::test]
async fn first_frame_is_last_known_status() {
    let bus = StatusBus::new(16);
    bus.publish(CardStatus::ready("before-connect"));
    let addr = spawn_feed(bus.clone()).await;

    let mut client = open(addr).await;
    let status = next_status(&mut client).await;
    assert_eq!(status.status, "ready");
    assert_eq!(status.source.as_deref(), Some("before-connect"));
}

#[tokio::test]
async fn fresh_feed_starts_unknown_then_streams_updates() {
    let bus = StatusBus::new(16);
    let addr = spawn_feed(bus.clone()).await;

    let mut client = open(addr).await;
    assert_eq!(next_status(&mut client).await.status, "unknown");

    bus.publish(CardStatus::error("reader unplugged", "test"));
    let status = next_status(&mut client).await;
    assert!(status.is_error());
    assert_eq!(status.error.as_deref(), Some("reader unplugged"));
}

#[tokio::test]
async fn every_client_gets_each_snapshot() {
    let bus = StatusBus::new(16);
    let addr = spawn_feed(bus.clone()).await;

    let mut a = open(addr).await;
    let mut b = open(addr).await;
    next_status(&mut a).await;
    next_status(&mut b).await;

    assert_eq!(bus.publish(CardStatus::ready("fanout")), 2);
    assert_eq!(next_status(&mut a).await, next_status(&mut b).await);
}

#[tokio::test]
async fn client_messages_are_ignored() {
    let bus = StatusBus::new(16);
    let addr = spawn_feed(bus.clone()).await;

    let mut client = open(addr).await;
    next_status(&mut client).await;

    if let Err(e) = client.send(Message::text("hello?")).await {
        panic!("send failed: {e}");
    }
    bus.publish(CardStatus::ready("after-chatter"));
    let status = next_status(&mut client).await;
    assert_eq!(status.source.as_deref(), Some("after-chatter"));
}

#[tokio::test]
async fn closed_clients_release_their_subscription() {
    let bus = StatusBus::new(16);
    let addr = spawn_feed(bus.clone()).await;

    let mut client = open(addr).await;
    next_status(&mut client).await;
    assert_eq!(bus.receiver_count(), 1);

    let _ = client.close(None).await;
    drop(client);

    let released = tokio::time::timeout(WAIT, async {
        while bus.receiver_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(released.is_ok(), "subscription was never released");
}

#[tokio::test]
async fn health_reports_connected_clients() {
    let bus = StatusBus::new(16);
    let addr = spawn_feed(bus).await;

    let mut client = open(addr).await;
    next_status(&mut client).await;

    let response = tokio_test::assert_ok!(reqwest::get(format!("http://{addr}/health")).await);
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = tokio_test::assert_ok!(response.json().await);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["feed_clients"], 1);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
