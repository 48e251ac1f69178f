//! End-to-end tests against a server bound to an ephemeral port.

#![allow(clippy::panic, clippy::indexing_slicing)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

use lighthouse_core::app_state::AppState;
use lighthouse_core::config::LighthouseConfig;
use lighthouse_core::domain::{
    Context, ContextRoleAssignment, GroupCode, Operation, Role, Subject, User, UserCode,
};
use lighthouse_core::registry::{AssignmentRegistry, UserRegistry};
use lighthouse_core::server::{build_app, build_state};

async fn spawn_server() -> (SocketAddr, AppState) {
    let Ok(state) = build_state(&LighthouseConfig::default()).await else {
        panic!("state should build");
    };
    let alice = User::new(UserCode::new("alice"))
        .with_group(GroupCode::new("ops"))
        .with_secret("pw");
    tokio_test::assert_ok!(state.users.upsert(alice).await);
    tokio_test::assert_ok!(state.users.upsert(User::new(UserCode::new("bob"))).await);
    let ops = Subject::Group(GroupCode::new("ops"));
    for role in [Role::StatusView, Role::OperationInstall, Role::OperationExecute] {
        state
            .assignments
            .add(ContextRoleAssignment::new(ops.clone(), role, Context::new("/prod")))
            .await;
    }
    state
        .catalog
        .define(Operation {
            code: "restart".to_string(),
            name: "Restart".to_string(),
            description: None,
        })
        .await;

    let app = build_app(state.clone(), Duration::from_secs(5));
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind should succeed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener should have an address");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, state)
}

async fn post(
    client: &reqwest::Client,
    url: String,
    body: Value,
    user: Option<&str>,
) -> (u16, Value) {
    let mut request = client.post(url).json(&body);
    if let Some(user) = user {
        request = request.header("x-lighthouse-user", user);
    }
    let Ok(response) = request.send().await else {
        panic!("request should be sent");
    };
    let status = response.status().as_u16();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_and_roles() {
    let (addr, _) = spawn_server().await;
    let Ok(health) = reqwest::get(format!("http://{addr}/health")).await else {
        panic!("health should answer");
    };
    assert_eq!(health.status().as_u16(), 200);

    let Ok(roles) = reqwest::get(format!("http://{addr}/api/v1/roles")).await else {
        panic!("roles should answer");
    };
    let Ok(roles) = roles.json::<Value>().await else {
        panic!("roles should be JSON");
    };
    let Some(roles) = roles.as_array() else {
        panic!("roles should be an array");
    };
    assert_eq!(roles.len(), 11);
    assert!(roles.iter().any(|r| r["id"] == "OPERATION_EXECUTE"));
}

#[tokio::test]
async fn permission_decisions_follow_group_assignments() {
    let (addr, _) = spawn_server().await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/v1/permissions/decide");

    let (status, body) = post(
        &client,
        url.clone(),
        json!({ "user": "alice", "role": "STATUS_VIEW", "context": "/prod/env1/db" }),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["decision"], "allow");

    let (_, body) = post(
        &client,
        url.clone(),
        json!({ "user": "bob", "role": "STATUS_VIEW", "context": "/prod/env1/db" }),
        None,
    )
    .await;
    assert_eq!(body["decision"], "deny");

    let body_without_user = json!({ "role": "STATUS_VIEW", "context": "/prod" });
    let (_, body) = post(&client, url.clone(), body_without_user, None).await;
    assert_eq!(body["decision"], "deny");

    let body_without_role = json!({ "user": "bob", "context": "/prod" });
    let (_, body) = post(&client, url.clone(), body_without_role, None).await;
    assert_eq!(body["decision"], "allow");

    let (status, body) = post(
        &client,
        url.clone(),
        json!({ "user": "mallory", "role": "STATUS_VIEW", "context": "/prod" }),
        None,
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], 2001);

    let unknown_role = json!({ "user": "alice", "role": "NOPE", "context": "/prod" });
    let (status, _) = post(&client, url, unknown_role, None).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn authenticate_checks_digest() {
    let (addr, _) = spawn_server().await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/v1/permissions/authenticate");
    let credentials = json!({ "user": "alice", "secret": "pw" });
    let (_, ok) = post(&client, url.clone(), credentials, None).await;
    assert_eq!(ok["authenticated"], true);
    let (_, wrong) = post(&client, url, json!({ "user": "alice", "secret": "nope" }), None).await;
    assert_eq!(wrong["authenticated"], false);
}

#[tokio::test]
async fn domain_status_lifecycle() {
    let (addr, _) = spawn_server().await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}/api/v1");

    let domains = format!("{base}/domains");
    let (status, opened) = post(&client, domains.clone(), json!({ "key": "prod" }), None).await;
    assert_eq!(status, 201);
    assert_eq!(opened["root_context"], "/prod");
    let (status, _) = post(&client, domains, json!({ "key": "prod" }), None).await;
    assert_eq!(status, 409);

    let statuses = format!("{base}/domains/prod/statuses");
    let (status, tracked) = post(&client, statuses, json!({ "code": "db" }), None).await;
    assert_eq!(status, 201);
    assert_eq!(tracked["context"], "/prod/db");

    let (status, _) = post(
        &client,
        format!("{base}/domains/prod/events"),
        json!({
            "kind": "aggregation",
            "code": "db",
            "counters": { "ok": 4, "error": 1, "stale": 0 }
        }),
        None,
    )
    .await;
    assert_eq!(status, 202);

    let mut history_len = 0;
    for _ in 0..100 {
        let Ok(response) = client
            .get(format!("{base}/domains/prod/statuses/db"))
            .header("x-lighthouse-user", "alice")
            .send()
            .await
        else {
            panic!("status request should be sent");
        };
        let Ok(body) = response.json::<Value>().await else {
            panic!("status should be JSON");
        };
        history_len = body["history"].as_array().map_or(0, Vec::len);
        if history_len == 1 {
            assert_eq!(body["current"]["counters"]["ok"], 4);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(history_len, 1);

    let Ok(anonymous) = client.get(format!("{base}/domains/prod/statuses/db")).send().await else {
        panic!("status request should be sent");
    };
    assert_eq!(anonymous.status().as_u16(), 403);

    let Ok(closed) = client.delete(format!("{base}/domains/prod")).send().await else {
        panic!("close request should be sent");
    };
    assert_eq!(closed.status().as_u16(), 200);
    let Ok(again) = client.delete(format!("{base}/domains/prod")).send().await else {
        panic!("close request should be sent");
    };
    assert_eq!(again.status().as_u16(), 404);
}

#[tokio::test]
async fn operation_install_and_execute() {
    let (addr, _) = spawn_server().await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}/api/v1");
    let _ = post(&client, format!("{base}/domains"), json!({ "key": "prod" }), None).await;
    let location = json!({ "location": "/prod/dep1" });

    let (status, body) = post(
        &client,
        format!("{base}/domains/prod/operations/restart/execute"),
        location.clone(),
        Some("alice"),
    )
    .await;
    assert_eq!(status, 422);
    assert_eq!(body["error"]["code"], 4002);

    let (status, installed) = post(
        &client,
        format!("{base}/operations/restart/installations"),
        location.clone(),
        Some("alice"),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(installed["state"], "present");

    let (status, denied) = post(
        &client,
        format!("{base}/domains/prod/operations/restart/execute"),
        location.clone(),
        Some("bob"),
    )
    .await;
    assert_eq!(status, 403);
    assert_eq!(denied["error"]["code"], 4001);

    let (status, executed) = post(
        &client,
        format!("{base}/domains/prod/operations/restart/execute"),
        location,
        Some("alice"),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(executed["status"], "executed");
}

#[tokio::test]
async fn websocket_streams_subscribed_domain_events() {
    let (addr, _) = spawn_server().await;
    let Ok((mut ws, _)) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await else {
        panic!("ws handshake should succeed");
    };

    let subscribe = json!({
        "id": "sub-1",
        "type": "command",
        "payload": { "command": "subscribe", "domains": ["prod"], "filter": "type=domain_opened" },
    });
    tokio_test::assert_ok!(ws.send(Message::text(subscribe.to_string())).await);
    let ack = next_json(&mut ws).await;
    assert_eq!(ack["type"], "response");
    assert_eq!(ack["payload"]["count"], 1);

    let client = reqwest::Client::new();
    let domains = format!("http://{addr}/api/v1/domains");
    let _ = post(&client, domains.clone(), json!({ "key": "test" }), None).await;
    let _ = post(&client, domains, json!({ "key": "prod" }), None).await;

    let event = next_json(&mut ws).await;
    assert_eq!(event["type"], "event");
    assert_eq!(event["id"], "lighthouse/events/prod/domain_opened");
    assert_eq!(event["payload"]["domain"], "prod");
}

async fn next_json<S>(ws: &mut S) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let Ok(Some(Ok(msg))) = tokio::time::timeout(Duration::from_secs(5), ws.next()).await else {
            panic!("expected a ws message");
        };
        if let Message::Text(text) = msg {
            let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
                panic!("ws message should be JSON");
            };
            return value;
        }
    }
}
