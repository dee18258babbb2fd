//! Scripted HTTP client for end-to-end tests: responses are served from
//! per-URL queues, the last entry repeating once the queue drains. URLs with
//! no script get a 404.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use hsr_core::http::{FetchRequest, FetchResponse, HttpClient};
use hsr_core::retry::FetchError;

#[derive(Debug, Clone)]
pub struct Scripted {
    pub status: u32,
    pub body: Vec<u8>,
}

impl Scripted {
    pub fn ok(body: &str) -> Self {
        Self {
            status: 200,
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn status(status: u32) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct ScriptedClient {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    hits: Mutex<HashMap<String, u32>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, url: &str, responses: Vec<Scripted>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), responses.into());
    }

    pub fn hits(&self, url: &str) -> u32 {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn fetch(&self, req: FetchRequest) -> Result<FetchResponse, FetchError> {
        *self.hits.lock().unwrap().entry(req.url.clone()).or_insert(0) += 1;

        let mut scripts = self.scripts.lock().unwrap();
        let response = match scripts.get_mut(&req.url) {
            Some(queue) => {
                if queue.len() > 1 {
                    queue.pop_front().unwrap()
                } else {
                    queue.front().cloned().unwrap_or(Scripted::status(404))
                }
            }
            None => Scripted::status(404),
        };

        Ok(FetchResponse {
            status: response.status,
            body: response.body,
            headers: HashMap::new(),
        })
    }
}
