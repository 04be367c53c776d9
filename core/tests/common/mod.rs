//! Scripted in-process `Transport` for object-model tests.
//!
//! Responses are registered per (method, path); every executed request is
//! logged so tests can assert exactly which calls were made. Per-path
//! latency lets tests force out-of-order completion.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use trellis_core::{
    ApiError, ClientConfig, Credentials, HttpMethod, HttpRequest, HttpResponse, Session, TrelloClient, Transport,
};

type Responder = Box<dyn Fn(Option<&Value>) -> (u16, String) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(HttpMethod, String), Responder>>,
    latency: Mutex<HashMap<String, Duration>>,
    log: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn route(&self, method: HttpMethod, path: &str, responder: Responder) {
        self.routes.lock().unwrap().insert((method, path.to_string()), responder);
    }

    /// Serve `body` with 200 for `GET path`.
    pub fn get(&self, path: &str, body: Value) -> &Self {
        let text = body.to_string();
        self.route(HttpMethod::Get, path, Box::new(move |_| (200, text.clone())));
        self
    }

    /// Answer `PUT path` with `base` overlaid by the request body.
    pub fn put_echo(&self, path: &str, base: Value) -> &Self {
        self.route(
            HttpMethod::Put,
            path,
            Box::new(move |body| {
                let mut echoed = base.clone();
                if let (Some(target), Some(Value::Object(sent))) = (echoed.as_object_mut(), body) {
                    for (field, value) in sent {
                        target.insert(field.clone(), value.clone());
                    }
                }
                (200, echoed.to_string())
            }),
        );
        self
    }

    pub fn respond(&self, method: HttpMethod, path: &str, status: u16, body: &str) -> &Self {
        let body = body.to_string();
        self.route(method, path, Box::new(move |_| (status, body.clone())));
        self
    }

    pub fn delay(&self, path: &str, latency: Duration) -> &Self {
        self.latency.lock().unwrap().insert(path.to_string(), latency);
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, method: HttpMethod, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn total(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn reset_log(&self) {
        self.log.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = Url::parse(&request.url).map_err(|e| ApiError::Transport(e.to_string()))?;
        let path = url.path().trim_start_matches("/1/").to_string();
        let query = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
        let body = request.body.as_deref().map(|b| serde_json::from_str(b).unwrap());

        let latency = self.latency.lock().unwrap().get(&path).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let (status, text) = {
            let routes = self.routes.lock().unwrap();
            match routes.get(&(request.method, path.clone())) {
                Some(responder) => responder(body.as_ref()),
                None => (404, "The requested resource was not found.".to_string()),
            }
        };
        self.log.lock().unwrap().push(Recorded {
            method: request.method,
            path,
            query,
            body,
        });
        Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: text,
        })
    }
}

pub fn config() -> ClientConfig {
    ClientConfig::new(Credentials::new("test-key", "test-token")).with_base_url("https://trello.test/1")
}

pub fn session(transport: &Arc<ScriptedTransport>) -> Session {
    let client = TrelloClient::with_transport(config(), transport.clone()).unwrap();
    Session::new(client)
}

/// A 24-hex id ending in `n`, e.g. `hex_id(7)` = `"000000000000000000000007"`.
pub fn hex_id(n: u32) -> String {
    format!("{n:024x}")
}
