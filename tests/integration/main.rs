//! Integration tests for Waypoint
//!
//! These tests run the real server on an ephemeral port and talk to it the
//! way a renderer would: REST for mutations, WebSocket for live events.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use waypoint_core::GraphStore;
use waypoint_server::{ServerConfig, WaypointServer};
use waypoint_traversal::TraversalConfig;

async fn spawn_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = WaypointServer::new(
        GraphStore::new(),
        TraversalConfig::unpaced(),
        ServerConfig::default(),
    );
    tokio::spawn(async move {
        if let Err(e) = server.serve(listener).await {
            eprintln!("server exited: {}", e);
        }
    });
    addr
}

type Socket = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a message")
            .expect("socket closed")
            .expect("socket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Read messages until one of the given type arrives, collecting everything.
async fn collect_until(socket: &mut Socket, msg_type: &str) -> Vec<Value> {
    let mut seen = Vec::new();
    loop {
        let msg = next_json(socket).await;
        let done = msg["type"] == msg_type;
        seen.push(msg);
        if done {
            return seen;
        }
    }
}

#[tokio::test]
async fn test_health_and_graph() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("http://{addr}/api/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let graph: Value = client
        .get(format!("http://{addr}/api/graph"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(graph["nodes"], json!(["A", "B", "C", "D", "E", "F"]));
    assert_eq!(graph["edges"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_rest_mutations() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/api/nodes"))
        .json(&json!({ "id": "g", "connect_to": "F" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

    let resp = client
        .post(format!("http://{addr}/api/nodes"))
        .json(&json!({ "id": "G" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "duplicate_node");

    let resp = client
        .post(format!("http://{addr}/api/edges"))
        .json(&json!({ "a": "G", "b": "A" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["change"], "added");

    let resp = client
        .delete(format!("http://{addr}/api/nodes/Z"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    let resp = client
        .delete(format!("http://{addr}/api/nodes/G"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);

    let graph: Value = client
        .post(format!("http://{addr}/api/reset"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(graph["epoch"], 1);
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_websocket_traversal_stream() {
    let addr = spawn_server().await;
    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();

    let first = next_json(&mut socket).await;
    assert_eq!(first["type"], "full_graph");

    socket
        .send(Message::Text(
            json!({ "type": "run_traversal", "start": "A", "end": "D" }).to_string(),
        ))
        .await
        .unwrap();

    let messages = collect_until(&mut socket, "run_ended").await;
    let run = messages[0]["run"].clone();
    assert_eq!(messages[0]["type"], "run_started");

    let kinds: Vec<&str> = messages
        .iter()
        .filter(|m| m["type"] == "traversal")
        .map(|m| {
            assert_eq!(m["run"], run);
            m["event"]["kind"].as_str().unwrap()
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "node_visited",
            "node_discovered",
            "node_discovered",
            "node_discovered",
            "node_discovered",
            "path_edge",
            "path_edge",
            "traversal_finished",
        ]
    );

    let path: Vec<(Value, Value)> = messages
        .iter()
        .filter(|m| m["event"]["kind"] == "path_edge")
        .map(|m| (m["event"]["from"].clone(), m["event"]["to"].clone()))
        .collect();
    assert_eq!(path, vec![(json!("B"), json!("D")), (json!("A"), json!("B"))]);

    let ended = messages.last().unwrap();
    assert_eq!(ended["outcome"], json!({ "status": "found", "path_len": 2 }));
}

#[tokio::test]
async fn test_websocket_sees_rest_mutations_and_errors() {
    let addr = spawn_server().await;
    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    assert_eq!(next_json(&mut socket).await["type"], "full_graph");

    socket
        .send(Message::Text(json!({ "type": "ping" }).to_string()))
        .await
        .unwrap();
    assert_eq!(next_json(&mut socket).await["type"], "pong");

    reqwest::Client::new()
        .post(format!("http://{addr}/api/edges"))
        .json(&json!({ "a": "A", "b": "F" }))
        .send()
        .await
        .unwrap();
    let diff = next_json(&mut socket).await;
    assert_eq!(diff["type"], "graph_diff");
    assert_eq!(diff["diff"]["added_edges"], json!([{ "a": "A", "b": "F" }]));

    socket
        .send(Message::Text(
            json!({ "type": "run_traversal", "start": "A", "end": "nowhere" }).to_string(),
        ))
        .await
        .unwrap();
    let err = next_json(&mut socket).await;
    assert_eq!(err["type"], "error");
    assert!(err["message"].as_str().unwrap().contains("NOWHERE"));
}
