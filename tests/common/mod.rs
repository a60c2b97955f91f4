#![allow(dead_code)]
use http_client::{Error, HttpClient, Request, Response};
use http_types::{Method, StatusCode, Url};
use lidarr_api::{ConnectionConfig, LidarrClient, RequestGateway};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const BASE_URL: &str = "http://lidarr.test:8686";
pub const API_KEY: &str = "0123456789abcdef";

/// One canned reaction to a request.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Answer with a status, a body and extra headers
    Respond {
        status: u16,
        body: String,
        headers: Vec<(String, String)>,
    },
    /// Fail before any response arrives
    ConnectionError(String),
    /// Never answer within any sane timeout
    Hang,
}

impl Scripted {
    pub fn status(status: u16, body: &str) -> Self {
        Scripted::Respond {
            status,
            body: body.to_string(),
            headers: Vec::new(),
        }
    }

    pub fn ok(body: &str) -> Self {
        Self::status(200, body)
    }

    pub fn with_header(self, name: &str, value: &str) -> Self {
        match self {
            Scripted::Respond {
                status,
                body,
                mut headers,
            } => {
                headers.push((name.to_string(), value.to_string()));
                Scripted::Respond {
                    status,
                    body,
                    headers,
                }
            }
            other => other,
        }
    }
}

/// A request as the server saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: Url,
    pub api_key: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
    pub at: Instant,
}

impl RecordedRequest {
    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body should be JSON")
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    responses: VecDeque<Scripted>,
    requests: Vec<RecordedRequest>,
}

/// HTTP client that plays back a fixed list of responses and records
/// every request. Clones share the same script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedClient {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<Scripted>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                responses: responses.into(),
                requests: Vec::new(),
            })),
        }
    }

    pub fn push(&self, response: Scripted) {
        self.state.lock().unwrap().responses.push_back(response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests()
            .pop()
            .expect("at least one request should have been sent")
    }
}

fn header(req: &Request, name: &str) -> Option<String> {
    req.header(name)
        .and_then(|values| values.get(0))
        .map(|value| value.as_str().to_string())
}

#[async_trait::async_trait]
impl HttpClient for ScriptedClient {
    async fn send(&self, mut req: Request) -> Result<Response, Error> {
        let body = req.body_string().await.unwrap_or_default();
        let recorded = RecordedRequest {
            method: req.method(),
            url: req.url().clone(),
            api_key: header(&req, "X-Api-Key"),
            content_type: header(&req, "Content-Type"),
            body,
            at: Instant::now(),
        };

        let next = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(recorded);
            state.responses.pop_front()
        };

        match next {
            Some(Scripted::Respond {
                status,
                body,
                headers,
            }) => {
                let mut response = Response::new(status);
                for (name, value) in headers {
                    response.insert_header(name.as_str(), value.as_str());
                }
                response.set_body(body);
                Ok(response)
            }
            Some(Scripted::ConnectionError(message)) => {
                Err(Error::from_str(StatusCode::BadGateway, message))
            }
            Some(Scripted::Hang) => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Ok(Response::new(StatusCode::Ok))
            }
            None => {
                let mut response = Response::new(StatusCode::InternalServerError);
                response.set_body("no scripted response left");
                Ok(response)
            }
        }
    }
}

pub fn test_config() -> ConnectionConfig {
    ConnectionConfig::new(BASE_URL, API_KEY).unwrap()
}

pub fn gateway(client: &ScriptedClient, config: ConnectionConfig) -> RequestGateway {
    RequestGateway::new(Box::new(client.clone()), config)
}

/// A client with no rate limit, for tests that only look at requests.
pub fn lidarr_client(responses: Vec<Scripted>) -> (LidarrClient, ScriptedClient) {
    let scripted = ScriptedClient::new(responses);
    let config = test_config().with_rate_limit_interval(Duration::ZERO);
    (LidarrClient::new(Box::new(scripted.clone()), config), scripted)
}
