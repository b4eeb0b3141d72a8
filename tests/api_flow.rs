//! End-to-end flows over a real listener: REST calls with `reqwest`,
//! live events with `tokio-tungstenite`.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use secret_poll::api;
use secret_poll::app_state::AppState;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Server {
    addr: SocketAddr,
    http: reqwest::Client,
}

impl Server {
    async fn start() -> Self {
        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        let app = api::build_app(AppState::in_memory());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            addr,
            http: reqwest::Client::new(),
        }
    }

    async fn call(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> (u16, Value) {
        let mut request = self.http.request(method, format!("http://{}{path}", self.addr));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let Ok(response) = request.send().await else {
            panic!("request to {path} failed");
        };
        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        self.call(reqwest::Method::POST, path, Some(body)).await
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        self.call(reqwest::Method::GET, path, None).await
    }

    async fn subscribe(&self, room_id: &str) -> Socket {
        let url = format!("ws://{}/api/ws/{room_id}", self.addr);
        let Ok((socket, _)) = connect_async(url).await else {
            panic!("ws connect to {room_id} failed");
        };
        socket
    }

    async fn join_approved(&self, room_id: &str, name: &str) -> String {
        let (status, joined) = self
            .post(&format!("/api/rooms/{room_id}/join"), json!({"participant_name": name}))
            .await;
        assert_eq!(status, 201);
        let (Some(id), Some(token)) = (
            joined["participant"]["participant_id"].as_str(),
            joined["participant_token"].as_str(),
        ) else {
            panic!("join response missing fields: {joined}");
        };
        let (status, _) = self.post(&format!("/api/participants/{id}/approve"), json!({})).await;
        assert_eq!(status, 200);
        token.to_string()
    }
}

/// Reads text frames until one with the given `type` arrives, returning
/// every frame seen on the way.
async fn read_until(socket: &mut Socket, event_type: &str) -> Vec<Value> {
    let mut seen = Vec::new();
    loop {
        let Ok(Some(Ok(frame))) = tokio::time::timeout(Duration::from_secs(5), socket.next()).await
        else {
            panic!("no {event_type} frame; saw {seen:?}");
        };
        let Message::Text(text) = frame else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
            panic!("non-json frame {text}");
        };
        let done = value["type"] == event_type;
        seen.push(value);
        if done {
            return seen;
        }
    }
}

#[tokio::test]
async fn team_meeting_poll_end_to_end() {
    let server = Server::start().await;
    let (status, room) = server
        .post("/api/rooms", json!({"organizer_name": "Dana", "custom_room_id": "team01"}))
        .await;
    assert_eq!(status, 201);
    assert_eq!(room["room_id"], "TEAM01");

    let mut socket = server.subscribe("TEAM01").await;

    let a = server.join_approved("TEAM01", "A").await;
    let b = server.join_approved("TEAM01", "B").await;
    let c = server.join_approved("TEAM01", "C").await;

    let (status, poll) = server
        .post(
            "/api/rooms/TEAM01/polls",
            json!({"question": "Pick a color", "options": ["Red", "Blue"]}),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(poll["state"], "created");
    let Some(poll_id) = poll["poll_id"].as_str().map(str::to_string) else {
        panic!("poll id missing");
    };

    let (status, started) = server.post(&format!("/api/polls/{poll_id}/start"), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(started["state"], "active");

    for (token, option) in [(&a, "Red"), (&b, "Blue"), (&c, "Red")] {
        let (status, receipt) = server
            .post(
                &format!("/api/polls/{poll_id}/vote"),
                json!({"participant_token": token, "option": option}),
            )
            .await;
        assert_eq!(status, 201);
        assert_eq!(receipt["status"], "recorded");
    }

    let (status, err) = server
        .post(
            &format!("/api/polls/{poll_id}/vote"),
            json!({"participant_token": c, "option": "Blue"}),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(err["error"]["code"], 2004);

    let (status, stopped) = server.post(&format!("/api/polls/{poll_id}/stop"), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(stopped["state"], "closed");
    assert_eq!(stopped["closed_by"], "manual");
    assert_eq!(stopped["vote_counts"], json!({"Red": 2, "Blue": 1}));
    assert_eq!(stopped["total_votes"], 3);

    let (status, listing) = server.get("/api/rooms/TEAM01/polls").await;
    assert_eq!(status, 200);
    assert_eq!(listing["polls"][0]["vote_counts"], json!({"Red": 2, "Blue": 1}));

    let frames = read_until(&mut socket, "poll_stopped").await;
    let types: Vec<&str> = frames.iter().filter_map(|f| f["type"].as_str()).collect();
    assert_eq!(
        types,
        [
            "participant_update",
            "participant_approved",
            "participant_update",
            "participant_update",
            "participant_approved",
            "participant_update",
            "participant_update",
            "participant_approved",
            "participant_update",
            "poll_started",
            "vote_update",
            "vote_update",
            "vote_update",
            "poll_stopped",
        ]
    );
    let Some(last) = frames.last() else {
        panic!("frames are non-empty");
    };
    assert_eq!(last["vote_counts"], json!({"Red": 2, "Blue": 1}));

    for frame in &frames {
        let text = frame.to_string();
        for token in [&a, &b, &c] {
            assert!(!text.contains(token.as_str()), "token leaked in {text}");
        }
        if frame["type"] == "vote_update" {
            assert!(frame.get("participant_id").is_none());
        }
    }
}

#[tokio::test]
async fn ws_answers_ping_and_rejects_garbage() {
    let server = Server::start().await;
    server.post("/api/rooms", json!({"organizer_name": "Org", "custom_room_id": "PING1"})).await;
    let mut socket = server.subscribe("ping1").await;

    let Ok(()) = socket.send(Message::text(r#"{"type":"ping"}"#)).await else {
        panic!("send failed");
    };
    read_until(&mut socket, "pong").await;

    let Ok(()) = socket.send(Message::text("hello")).await else {
        panic!("send failed");
    };
    let frames = read_until(&mut socket, "error").await;
    let Some(error) = frames.last() else {
        panic!("error frame expected");
    };
    assert_eq!(error["code"], 400);
}

#[tokio::test]
async fn ws_to_unknown_room_is_refused() {
    let server = Server::start().await;
    let url = format!("ws://{}/api/ws/NOROOM", server.addr);
    assert!(connect_async(url).await.is_err());
}

#[tokio::test]
async fn timed_poll_auto_stops_and_notifies() {
    let server = Server::start().await;
    server.post("/api/rooms", json!({"organizer_name": "Org", "custom_room_id": "TIMED"})).await;
    let mut socket = server.subscribe("TIMED").await;

    let (_, poll) = server
        .post(
            "/api/rooms/TIMED/polls",
            json!({"question": "Quick?", "options": ["Yes", "No"], "timer_minutes": 0.005}),
        )
        .await;
    let Some(poll_id) = poll["poll_id"].as_str().map(str::to_string) else {
        panic!("poll id missing");
    };
    let (status, started) = server.post(&format!("/api/polls/{poll_id}/start"), json!({})).await;
    assert_eq!(status, 200);
    assert!(started["closes_at"].is_string());

    let frames = read_until(&mut socket, "poll_auto_stopped").await;
    assert!(frames.iter().all(|f| f["type"] != "poll_stopped"));

    let (_, listing) = server.get("/api/rooms/TIMED/polls").await;
    assert_eq!(listing["polls"][0]["state"], "closed");
    assert_eq!(listing["polls"][0]["closed_by"], "timer");

    let (status, err) = server.post(&format!("/api/polls/{poll_id}/stop"), json!({})).await;
    assert_eq!(status, 409);
    assert_eq!(err["error"]["code"], 2006);
}

#[tokio::test]
async fn purge_removes_room_and_closes_subscribers() {
    let server = Server::start().await;
    server.post("/api/rooms", json!({"organizer_name": "Org", "custom_room_id": "GONE1"})).await;
    let token = server.join_approved("GONE1", "Ann").await;
    let mut socket = server.subscribe("GONE1").await;

    let (status, report) = server.call(reqwest::Method::DELETE, "/api/rooms/GONE1", None).await;
    assert_eq!(status, 200);
    assert_eq!(report["status"], "purged");
    assert_eq!(report["participants_removed"], 1);

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(Ok(frame)) = socket.next().await {
            if frame.is_close() {
                return true;
            }
        }
        true
    })
    .await;
    assert_eq!(closed, Ok(true));

    let (status, _) = server.get("/api/rooms/GONE1/status").await;
    assert_eq!(status, 404);

    let (status, err) = server
        .post(
            &format!("/api/polls/{}/vote", uuid::Uuid::new_v4()),
            json!({"participant_token": token, "option": "x"}),
        )
        .await;
    assert_eq!(status, 401);
    assert_eq!(err["error"]["code"], 2009);

    let (status, _) = server
        .post("/api/rooms", json!({"organizer_name": "New", "custom_room_id": "GONE1"}))
        .await;
    assert_eq!(status, 201);
}
