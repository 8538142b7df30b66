mod common;

use converge_engine::compute::Network;
use converge_engine::{get, list, EngineError};
use serde_json::json;

use common::{client, FakeCompute};

fn seed(fake: &FakeCompute, names: &[&str]) {
    for name in names {
        fake.insert(
            &format!("projects/p/global/networks/{name}"),
            json!({"name": name, "autoCreateSubnetworks": true}),
        );
    }
}

#[tokio::test]
async fn get_returns_state_with_identity_parameters() {
    let fake = FakeCompute::new();
    seed(&fake, &["net1"]);
    let client = client(&fake);

    let state = get(&client, &Network::new(), &json!({"name": "net1", "project": "p"}))
        .await
        .unwrap();
    assert_eq!(state["name"], "net1");
    assert_eq!(state["project"], "p");
    assert_eq!(state["routingConfig"]["routingMode"], "REGIONAL");
}

#[tokio::test]
async fn get_missing_resource_is_not_found() {
    let fake = FakeCompute::new();
    let client = client(&fake);

    let err = get(&client, &Network::new(), &json!({"name": "nope", "project": "p"}))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    let EngineError::NotFound { addr } = err else {
        panic!("expected NotFound");
    };
    assert_eq!(addr.name, "nope");
    assert_eq!(addr.parent, "projects/p/global/networks");
}

#[tokio::test]
async fn list_pages_through_results() {
    let fake = FakeCompute::new();
    seed(&fake, &["a", "b", "c"]);
    let client = client(&fake);
    let network = Network::new();

    let mut page = list(&client, &network, &json!({"project": "p"}), Some(2)).await.unwrap();
    let names: Vec<&str> = page.items.iter().filter_map(|i| i["name"].as_str()).collect();
    assert_eq!(names, ["a", "b"]);
    assert!(page.items.iter().all(|i| i["project"] == "p"));
    assert!(page.has_next());

    page.next(&client, &network).await.unwrap();
    let names: Vec<&str> = page.items.iter().filter_map(|i| i["name"].as_str()).collect();
    assert_eq!(names, ["c"]);
    assert!(!page.has_next());

    let before = fake.requests().len();
    page.next(&client, &network).await.unwrap();
    assert_eq!(fake.requests().len(), before);
    assert_eq!(page.items.len(), 1);

    let first = &fake.requests()[0];
    assert_eq!(first.path, "projects/p/global/networks?maxResults=2");
    assert_eq!(fake.requests()[1].path, "projects/p/global/networks?pageToken=2&maxResults=2");
}

#[tokio::test]
async fn empty_collection_lists_nothing() {
    let fake = FakeCompute::new();
    let client = client(&fake);

    let page = list(&client, &Network::new(), &json!({"project": "p"}), None).await.unwrap();
    assert!(page.items.is_empty());
    assert!(!page.has_next());
}
