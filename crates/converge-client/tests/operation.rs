mod common;

use std::time::Duration;

use converge_client::{wait_for_response, Client, ClientError, ConfigOverride, HttpResponse};
use serde_json::{json, Value};

use common::{fast_config, ScriptedTransport};

const BASE: &str = "https://compute.fake.test/compute/v1/projects/p";

fn op(status: &str, operation_type: &str) -> Value {
    json!({
        "kind": "compute#operation",
        "name": "op-1",
        "status": status,
        "operationType": operation_type,
        "selfLink": format!("{BASE}/global/operations/op-1"),
        "targetLink": format!("{BASE}/global/networks/net1"),
    })
}

fn response(body: &Value) -> HttpResponse {
    HttpResponse {
        status: 200,
        body: serde_json::to_vec(body).unwrap(),
    }
}

#[tokio::test]
async fn polls_until_done_then_fetches_the_target() {
    let transport = ScriptedTransport::new();
    transport
        .reply(200, op("RUNNING", "insert"))
        .reply(200, op("DONE", "insert"))
        .reply(200, json!({"name": "net1", "mtu": 1460}));
    let client = Client::new(fast_config(), transport.clone());

    let target = wait_for_response(&client, &response(&op("PENDING", "insert"))).await.unwrap();
    assert_eq!(target, Some(json!({"name": "net1", "mtu": 1460})));

    let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        [
            format!("{BASE}/global/operations/op-1"),
            format!("{BASE}/global/operations/op-1"),
            format!("{BASE}/global/networks/net1"),
        ]
    );
}

#[tokio::test]
async fn finished_delete_does_not_fetch_the_target() {
    let transport = ScriptedTransport::new();
    let client = Client::new(fast_config(), transport.clone());

    let target = wait_for_response(&client, &response(&op("DONE", "delete"))).await.unwrap();
    assert_eq!(target, None);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn operation_errors_are_surfaced() {
    let transport = ScriptedTransport::new();
    let mut failed = op("DONE", "insert");
    failed["error"] = json!({"errors": [{"code": "QUOTA_EXCEEDED", "message": "out of networks"}]});
    transport.reply(200, failed);
    let client = Client::new(fast_config(), transport.clone());

    let err = wait_for_response(&client, &response(&op("RUNNING", "insert"))).await.unwrap_err();
    match err {
        ClientError::OperationFailed { name, message } => {
            assert_eq!(name, "op-1");
            assert!(message.contains("QUOTA_EXCEEDED"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn wait_is_bounded_by_the_operation_timeout() {
    let transport = ScriptedTransport::new();
    for _ in 0..1_000 {
        transport.reply(200, op("RUNNING", "insert"));
    }
    let mut config = fast_config();
    config.operation_wait.poll_interval_ms = 5;
    let client = Client::new(config, transport.clone())
        .clone_with(&[ConfigOverride::Timeout(Duration::from_secs(1))]);

    let err = wait_for_response(&client, &response(&op("RUNNING", "insert"))).await.unwrap_err();
    assert!(matches!(err, ClientError::OperationTimeout { .. }));
}

#[tokio::test]
async fn plain_resource_bodies_pass_through() {
    let transport = ScriptedTransport::new();
    let client = Client::new(fast_config(), transport.clone());
    let body = json!({"name": "rule", "priority": 10});

    assert_eq!(wait_for_response(&client, &response(&body)).await.unwrap(), Some(body));
    assert_eq!(
        wait_for_response(&client, &HttpResponse { status: 200, body: Vec::new() }).await.unwrap(),
        None
    );
    assert!(transport.requests().is_empty());
}
