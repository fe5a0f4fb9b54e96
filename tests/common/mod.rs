//! Shared helpers: an in-process stand-in for the vendor cloud.

#![allow(dead_code)]

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use ics2000::crypto::HubCipher;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const MAC: &str = "00:11:22:33:44:55";
pub const EMAIL: &str = "user@example.com";
pub const PASSWORD_HASH: &str = "5f4dcc3b5aa765d61d8327deb882cf99";
pub const AES_KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c";
pub const HOME_ID: i64 = 4242;

pub fn cipher() -> HubCipher {
    HubCipher::from_hex(AES_KEY).unwrap()
}

/// A request the mock cloud received.
#[derive(Debug, Clone)]
pub struct Request {
    pub path: String,
    pub params: HashMap<String, String>,
}

impl Request {
    pub fn action(&self) -> &str {
        self.params.get("action").map(String::as_str).unwrap_or("")
    }
}

type Handler = Arc<dyn Fn(&Request) -> (u16, String) + Send + Sync>;

#[derive(Clone)]
struct CloudState {
    requests: Arc<Mutex<Vec<Request>>>,
    handler: Handler,
}

async fn serve_endpoint(
    State(state): State<CloudState>,
    Path(endpoint): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    let request = Request {
        path: format!("/ics2000_api/{}", endpoint),
        params,
    };
    let (status, body) = (state.handler)(&request);
    state.requests.lock().unwrap().push(request);
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        body,
    )
}

/// In-process stand-in for the vendor cloud API.
pub struct MockCloud {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl MockCloud {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> (u16, String) + Send + Sync + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = CloudState {
            requests: requests.clone(),
            handler: Arc::new(handler),
        };
        let app = Router::new()
            .route("/ics2000_api/{endpoint}", get(serve_endpoint))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}/ics2000_api/", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path.ends_with(path))
            .count()
    }
}

/// Base URL of a port nothing listens on.
pub async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/ics2000_api/", addr)
}

/// Encrypted inventory entry as the sync endpoint returns it.
pub fn inventory_entry(name: &str, id: u32, device: u32) -> Value {
    let data = json!({"module": {"name": name, "id": id, "device": device, "info": [0, 0]}});
    json!({ "id": id, "data": cipher().encrypt_base64(&data.to_string()).unwrap() })
}

/// Encrypted status entry as the entity endpoint returns it.
pub fn status_entry(functions: &[i64]) -> Value {
    let data = json!({"module": {"id": 1, "functions": functions}});
    json!({ "status": cipher().encrypt_base64(&data.to_string()).unwrap() })
}

pub fn login_ok() -> (u16, String) {
    (
        200,
        json!({"homes": [{"home_id": HOME_ID, "aes_key": AES_KEY}]}).to_string(),
    )
}

/// Cloud with a small inventory: a lamp, a zigbee light, a climate sensor and a scene.
pub fn default_handler(request: &Request) -> (u16, String) {
    match (request.path.as_str(), request.action()) {
        (p, "login") if p.ends_with("account.php") => login_ok(),
        (p, "check") if p.ends_with("gateway.php") => (200, r#"["ok","true"]"#.to_string()),
        (p, "sync") if p.ends_with("gateway.php") => {
            let scene = json!({"module": {"name": "Evening", "id": 90}});
            let entries = vec![
                inventory_entry("Hall", 3, 1),
                inventory_entry("Kitchen", 5, 12),
                inventory_entry("Bathroom", 7, 46),
                json!({"data": cipher().encrypt_base64(&scene.to_string()).unwrap()}),
            ];
            (200, Value::Array(entries).to_string())
        }
        (p, "get-multiple") if p.ends_with("entity.php") => (
            200,
            Value::Array(vec![status_entry(&[1, 0, 0, 0, 2150, 0, 0, 0, 0, 0, 0, 4512])])
                .to_string(),
        ),
        (p, "add") if p.ends_with("command.php") => (200, "[]".to_string()),
        _ => (404, "unknown".to_string()),
    }
}
