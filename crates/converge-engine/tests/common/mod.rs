#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use converge_client::{
    BoxFuture, Client, ClientError, Config, HttpRequest, HttpResponse, Method, OperationWait,
    RetryPolicy, Transport,
};
use serde_json::{json, Value};

pub const BASE: &str = "https://compute.fake.test/compute/v1/";

const COLLECTIONS: &[&str] = &["networks", "forwardingRules", "instanceGroupManagers"];
const RULE_METHODS: &[&str] = &["getRule", "addRule", "removeRule", "patchRule"];
const FINGERPRINTS: &[&str] = &["fingerprint", "labelFingerprint"];

/// A request as the fake saw it, with the base path stripped.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub request_id: Option<String>,
}

#[derive(Default)]
struct State {
    resources: BTreeMap<String, Value>,
    ghosts: BTreeMap<String, (Value, u32)>,
    operations: BTreeMap<String, Value>,
    failures: VecDeque<(Method, u16)>,
    frozen: Vec<String>,
    linger: u32,
    page_size: Option<usize>,
    delay: Option<Duration>,
    counter: u64,
    requests: Vec<Recorded>,
}

/// In-memory compute API: stores resources by path, answers mutations with
/// long-running operations, and fills server-side defaults.
#[derive(Default)]
pub struct FakeCompute {
    state: Mutex<State>,
}

impl FakeCompute {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed a resource, with server defaults applied.
    pub fn insert(&self, path: &str, resource: Value) {
        let stored = with_server_defaults(path, resource);
        self.state.lock().unwrap().resources.insert(path.to_string(), stored);
    }

    pub fn resource(&self, path: &str) -> Option<Value> {
        self.state.lock().unwrap().resources.get(path).cloned()
    }

    /// The next request with `method` fails with `status`.
    pub fn fail_next(&self, method: Method, status: u16) {
        self.state.lock().unwrap().failures.push_back((method, status));
    }

    /// Writes silently ignore `field`.
    pub fn freeze(&self, field: &str) {
        self.state.lock().unwrap().frozen.push(field.to_string());
    }

    /// Deleted resources stay readable for this many further gets.
    pub fn linger_deletes(&self, reads: u32) {
        self.state.lock().unwrap().linger = reads;
    }

    /// Server-side cap on list page size.
    pub fn page_size(&self, size: usize) {
        self.state.lock().unwrap().page_size = Some(size);
    }

    /// Every response is held back this long.
    pub fn stall(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn mutations(&self) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method.is_mutating())
            .collect()
    }

    pub fn clear_requests(&self) {
        self.state.lock().unwrap().requests.clear();
    }
}

impl Transport for FakeCompute {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ClientError>> {
        let body: Option<Value> =
            request.body.as_deref().map(|b| serde_json::from_slice(b).unwrap());
        let path = request.url.strip_prefix(BASE).unwrap_or(&request.url).to_string();
        let (status, reply, delay) = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(Recorded {
                method: request.method,
                path: path.clone(),
                body: body.clone(),
                request_id: request.request_id.clone(),
            });
            let (status, reply) = handle(&mut state, request.method, &path, body);
            (status, reply, state.delay)
        };
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(HttpResponse {
                status,
                body: serde_json::to_vec(&reply).unwrap(),
            })
        })
    }
}

/// Client pointed at the fake, with millisecond backoffs and polling.
pub fn client(fake: &Arc<FakeCompute>) -> Client {
    let config = Config {
        base_path: BASE.to_string(),
        retry: RetryPolicy {
            max_attempts: 4,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
        },
        operation_wait: OperationWait {
            poll_interval_ms: 1,
            timeout_secs: 0,
        },
        delete_confirm_attempts: 3,
        ..Config::default()
    };
    Client::new(config, fake.clone())
}

fn error(status: u16, message: &str) -> (u16, Value) {
    (status, json!({"error": {"code": status, "message": message}}))
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn handle(state: &mut State, method: Method, path: &str, body: Option<Value>) -> (u16, Value) {
    if let Some(pos) = state.failures.iter().position(|(m, _)| *m == method) {
        let (_, status) = state.failures.remove(pos).unwrap();
        return error(status, "injected failure");
    }

    let (path, query) = path.split_once('?').unwrap_or((path, ""));
    let query = parse_query(query);
    if path.starts_with("operations/") {
        return match state.operations.get(path) {
            Some(op) => (200, op.clone()),
            None => error(404, "operation not found"),
        };
    }

    let (parent, last) = path.rsplit_once('/').unwrap_or(("", path));
    if RULE_METHODS.contains(&last) {
        return rule_call(state, parent, last, &query, body);
    }
    match method {
        Method::Get if COLLECTIONS.contains(&last) => list(state, path, &query),
        Method::Get => get(state, path),
        Method::Post if COLLECTIONS.contains(&last) => {
            insert(state, path, body.unwrap_or_default())
        }
        Method::Post => update(state, parent, last, body.unwrap_or_default()),
        Method::Patch => update(state, path, "patch", body.unwrap_or_default()),
        Method::Delete => delete(state, path),
        Method::Put => error(405, "PUT is not supported"),
    }
}

fn with_server_defaults(path: &str, mut resource: Value) -> Value {
    let project = path.split('/').nth(1).unwrap_or("p").to_string();
    let obj = resource.as_object_mut().unwrap();
    obj.entry("selfLink").or_insert_with(|| json!(format!("{BASE}{path}")));
    obj.entry("creationTimestamp")
        .or_insert_with(|| json!("2024-01-01T00:00:00.000-07:00"));
    if path.contains("/networks/") {
        obj.entry("mtu").or_insert(json!(1460));
        obj.entry("routingConfig")
            .or_insert_with(|| json!({"routingMode": "REGIONAL"}));
    }
    if path.contains("/forwardingRules/") {
        obj.entry("IPAddress").or_insert(json!("203.0.113.10"));
        obj.entry("IPProtocol").or_insert(json!("TCP"));
        obj.entry("networkTier").or_insert(json!("PREMIUM"));
        obj.entry("network")
            .or_insert_with(|| json!(format!("{BASE}projects/{project}/global/networks/default")));
        obj.entry("labelFingerprint").or_insert(json!("fp-0"));
        if let Some(range) = obj.get("portRange").and_then(Value::as_str) {
            if !range.contains('-') {
                let expanded = format!("{range}-{range}");
                obj.insert("portRange".to_string(), json!(expanded));
            }
        }
    }
    if path.contains("/instanceGroupManagers/") {
        obj.entry("fingerprint").or_insert(json!("fp-0"));
    }
    resource
}

fn operation(state: &mut State, operation_type: &str, target: &str) -> (u16, Value) {
    state.counter += 1;
    let name = format!("operation-{}", state.counter);
    let running = json!({
        "kind": "compute#operation",
        "name": name,
        "operationType": operation_type,
        "status": "RUNNING",
        "targetLink": format!("{BASE}{target}"),
        "selfLink": format!("{BASE}operations/{name}"),
    });
    let mut done = running.clone();
    done["status"] = json!("DONE");
    state.operations.insert(format!("operations/{name}"), done);
    (200, running)
}

fn get(state: &mut State, path: &str) -> (u16, Value) {
    if let Some(resource) = state.resources.get(path) {
        return (200, resource.clone());
    }
    if let Some((resource, reads)) = state.ghosts.get_mut(path) {
        if *reads > 0 {
            *reads -= 1;
            return (200, resource.clone());
        }
    }
    error(404, &format!("{path} not found"))
}

fn list(state: &State, collection: &str, query: &HashMap<String, String>) -> (u16, Value) {
    let prefix = format!("{collection}/");
    let all: Vec<Value> = state
        .resources
        .iter()
        .filter(|(k, _)| k.strip_prefix(&prefix).is_some_and(|rest| !rest.contains('/')))
        .map(|(_, v)| v.clone())
        .collect();
    let offset: usize = query.get("pageToken").and_then(|t| t.parse().ok()).unwrap_or(0);
    let requested: usize = query
        .get("maxResults")
        .and_then(|m| m.parse().ok())
        .unwrap_or(usize::MAX);
    let size = requested.min(state.page_size.unwrap_or(usize::MAX)).max(1);
    let page: Vec<Value> = all.iter().skip(offset).take(size).cloned().collect();

    let mut out = json!({"kind": "compute#list", "items": page});
    if offset.saturating_add(size) < all.len() {
        out["nextPageToken"] = json!((offset + size).to_string());
    }
    (200, out)
}

fn insert(state: &mut State, collection: &str, body: Value) -> (u16, Value) {
    let Some(name) = body.get("name").and_then(Value::as_str) else {
        return error(400, "name is required");
    };
    let key = format!("{collection}/{name}");
    if state.resources.contains_key(&key) {
        return error(409, &format!("{key} already exists"));
    }
    let stored = with_server_defaults(&key, body);
    state.resources.insert(key.clone(), stored);
    state.ghosts.remove(&key);
    operation(state, "insert", &key)
}

fn check_fingerprints(current: &Value, body: &Value) -> Result<(), (u16, Value)> {
    for fp in FINGERPRINTS {
        if let Some(sent) = body.get(*fp) {
            if current.get(*fp) != Some(sent) {
                return Err(error(412, &format!("{fp} does not match")));
            }
        }
    }
    Ok(())
}

fn merge(state: &mut State, target: &mut Value, body: &Value) {
    if let (Some(obj), Some(fields)) = (target.as_object_mut(), body.as_object()) {
        for (key, value) in fields {
            if FINGERPRINTS.contains(&key.as_str()) || state.frozen.contains(key) {
                continue;
            }
            obj.insert(key.clone(), value.clone());
        }
    }
    state.counter += 1;
    for fp in FINGERPRINTS {
        if let Some(v) = target.get_mut(*fp) {
            *v = json!(format!("fp-{}", state.counter));
        }
    }
}

fn update(state: &mut State, item: &str, operation_type: &str, body: Value) -> (u16, Value) {
    let Some(mut current) = state.resources.get(item).cloned() else {
        return error(404, &format!("{item} not found"));
    };
    if let Err(rejected) = check_fingerprints(&current, &body) {
        return rejected;
    }
    merge(state, &mut current, &body);
    state.resources.insert(item.to_string(), current);
    operation(state, operation_type, item)
}

fn delete(state: &mut State, path: &str) -> (u16, Value) {
    let Some(old) = state.resources.remove(path) else {
        return error(404, &format!("{path} not found"));
    };
    if state.linger > 0 {
        state.ghosts.insert(path.to_string(), (old, state.linger));
    }
    operation(state, "delete", path)
}

fn rule_priority(rule: &Value) -> Option<i64> {
    match rule.get("priority") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

/// Rules live in the policy's `rules` array and are keyed by priority.
fn rule_call(
    state: &mut State,
    policy_path: &str,
    verb: &str,
    query: &HashMap<String, String>,
    body: Option<Value>,
) -> (u16, Value) {
    let Some(mut policy) = state.resources.get(policy_path).cloned() else {
        return error(404, &format!("{policy_path} not found"));
    };
    let body = body.unwrap_or_default();
    let priority = query
        .get("priority")
        .and_then(|p| p.parse().ok())
        .or_else(|| rule_priority(&body));
    if policy["rules"].is_null() {
        policy["rules"] = json!([]);
    }
    let position = {
        let rules = policy["rules"].as_array().unwrap();
        rules.iter().position(|r| rule_priority(r) == priority && priority.is_some())
    };

    match (verb, position) {
        ("getRule", Some(i)) => return (200, policy["rules"][i].clone()),
        ("addRule", Some(_)) => return error(409, "a rule with this priority already exists"),
        ("addRule", None) => {
            let mut rule = body;
            rule["kind"] = json!("compute#firewallPolicyRule");
            rule["ruleTupleCount"] = json!(2);
            policy["rules"].as_array_mut().unwrap().push(rule);
        }
        ("removeRule", Some(i)) => {
            policy["rules"].as_array_mut().unwrap().remove(i);
        }
        ("patchRule", Some(i)) => {
            let mut rule = policy["rules"][i].clone();
            merge(state, &mut rule, &body);
            policy["rules"][i] = rule;
        }
        _ => return error(404, "rule not found"),
    }
    state.resources.insert(policy_path.to_string(), policy);
    operation(state, verb, policy_path)
}
