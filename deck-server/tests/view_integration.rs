//! WebSocket round-trip integration tests for the view bridge.

mod common;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use common::TestServer;

/// Receive and parse the next JSON text frame.
async fn recv_json(
    stream: &mut (impl StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin),
) -> Option<Value> {
    let msg = timeout(Duration::from_secs(5), stream.next())
        .await
        .ok()??
        .ok()?;
    match msg {
        Message::Text(text) => serde_json::from_str(&text).ok(),
        _ => None,
    }
}

/// Receive frames until one matches `pred`.
async fn recv_until(
    stream: &mut (impl StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin),
    pred: impl Fn(&Value) -> bool,
    max_messages: usize,
) -> Option<Value> {
    for _ in 0..max_messages {
        let msg = recv_json(stream).await?;
        if pred(&msg) {
            return Some(msg);
        }
    }
    None
}

async fn send_json<S>(sink: &mut S, value: &Value)
where
    S: SinkExt<Message> + Unpin,
{
    let text = serde_json::to_string(value).expect("serialize");
    assert!(sink.send(Message::Text(text)).await.is_ok(), "send failed");
}

#[tokio::test]
async fn test_insert_round_trip() {
    let server = TestServer::start().await;
    let (ws, _) = connect_async(server.view_url("q3", 2))
        .await
        .expect("connect");
    let (mut tx, mut rx) = ws.split();

    send_json(
        &mut tx,
        &json!({"action": "insertChart", "params": {"slideIndex": 0, "chartConfig": {"type": "bar"}}}),
    )
    .await;
    let response = recv_json(&mut rx).await.expect("response");
    assert_eq!(response["success"], true);
    assert_eq!(response["action"], "insertChart");
    assert!(response["elementId"]
        .as_str()
        .is_some_and(|id| id.starts_with("chart-")));

    server.shutdown().await;
}

#[tokio::test]
async fn test_unknown_action_and_bad_json() {
    let server = TestServer::start().await;
    let (ws, _) = connect_async(server.view_url("q3", 1))
        .await
        .expect("connect");
    let (mut tx, mut rx) = ws.split();

    send_json(&mut tx, &json!({"action": "explode", "params": {}})).await;
    let response = recv_json(&mut rx).await.expect("response");
    assert_eq!(response["success"], false);
    assert_eq!(response["action"], "explode");

    tx.send(Message::Text("{not json".to_string()))
        .await
        .expect("send");
    let response = recv_json(&mut rx).await.expect("response");
    assert_eq!(response["success"], false);

    server.shutdown().await;
}

#[tokio::test]
async fn test_oversized_frame_rejected() {
    let server = TestServer::start().await;
    let (ws, _) = connect_async(server.view_url("q3", 1))
        .await
        .expect("connect");
    let (mut tx, mut rx) = ws.split();

    let huge = "x".repeat(deck_protocol::validation::MAX_MESSAGE_SIZE + 1);
    tx.send(Message::Text(huge)).await.expect("send");
    let response = recv_json(&mut rx).await.expect("response");
    assert_eq!(response["success"], false);

    // The view keeps working after the rejection.
    send_json(&mut tx, &json!({"action": "deselectElement"})).await;
    let response = recv_json(&mut rx).await.expect("response");
    assert_eq!(response["success"], true);

    server.shutdown().await;
}

#[tokio::test]
async fn test_select_emits_event_after_response() {
    let server = TestServer::start().await;
    let (ws, _) = connect_async(server.view_url("q3", 1))
        .await
        .expect("connect");
    let (mut tx, mut rx) = ws.split();

    send_json(
        &mut tx,
        &json!({"action": "insertImage", "params": {"slideIndex": 0, "url": "a.png"}}),
    )
    .await;
    let inserted = recv_json(&mut rx).await.expect("insert response");
    let id = inserted["elementId"].clone();

    send_json(
        &mut tx,
        &json!({"action": "selectElement", "params": {"elementId": id}}),
    )
    .await;
    let event = recv_until(&mut rx, |m| m["type"] == "elementSelected", 5)
        .await
        .expect("selection event");
    assert_eq!(event["elementId"], id);
    assert_eq!(event["elementType"], "image");

    server.shutdown().await;
}

#[tokio::test]
async fn test_autosave_event_and_store() {
    let server = TestServer::start().await;
    let (ws, _) = connect_async(server.view_url("board", 1))
        .await
        .expect("connect");
    let (mut tx, mut rx) = ws.split();

    send_json(
        &mut tx,
        &json!({"action": "insertTextBox", "params": {"slideIndex": 0, "content": "Agenda"}}),
    )
    .await;
    let event = recv_until(&mut rx, |m| m["type"] == "autosaveCompleted", 5)
        .await
        .expect("autosave event");
    assert_eq!(event["slideIndex"], 0);
    assert_eq!(event["elementCount"], 1);

    let saved = server.store().get("board", 0).expect("snapshot");
    assert_eq!(saved.text_boxes.len(), 1);

    server.shutdown().await;
}

#[tokio::test]
async fn test_disconnect_flushes_pending_edits() {
    let server = TestServer::start().await;
    {
        let (ws, _) = connect_async(server.view_url("late", 1))
            .await
            .expect("connect");
        let (mut tx, mut rx) = ws.split();
        send_json(
            &mut tx,
            &json!({"action": "insertImage", "params": {"slideIndex": 0, "url": "z.png"}}),
        )
        .await;
        recv_json(&mut rx).await.expect("response");
        tx.send(Message::Close(None)).await.expect("close");
    }

    let mut saved = None;
    for _ in 0..50 {
        saved = server.store().get("late", 0);
        if saved.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(saved.expect("flushed on close").images.len(), 1);

    server.shutdown().await;
}

#[tokio::test]
async fn test_zero_slides_rejected() {
    let server = TestServer::start().await;
    assert!(connect_async(server.view_url("empty", 0)).await.is_err());
    server.shutdown().await;
}

#[tokio::test]
async fn test_health_ready() {
    let server = TestServer::start().await;
    let mut stream = tokio::net::TcpStream::connect(server.addr())
        .await
        .expect("connect");
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .expect("write");
    let mut body = String::new();
    stream.read_to_string(&mut body).await.expect("read");
    assert!(body.starts_with("HTTP/1.1 200"), "{body}");
    assert!(body.contains("\"healthy\""));

    server.shutdown().await;
}
