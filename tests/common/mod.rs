//! Shared test helpers: a tiny blocking HTTP server on `std::net`, a fake
//! vendor cloud routed through it, and a `SetupProvider` with scripted
//! answers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use reqwest::StatusCode;
use tonie_upload::{Chapter, CredentialStore, Credentials, Endpoints, SetupError, SetupProvider};

// ─── Mock HTTP server ──────────────────────────────────────────────

/// One request as seen by the mock server.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is(&self, method: &str, path: &str) -> bool {
        self.method == method && self.path == path
    }
}

pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Reply {
            status,
            body: body.into(),
        }
    }
}

pub struct MockServer {
    base: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockServer {
    /// Serve every connection on a background thread. Each connection
    /// carries exactly one request and is closed after the reply.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&Recorded) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock HTTP server");
        let port = listener.local_addr().expect("get mock port").port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let mut stream = match stream {
                    Ok(s) => s,
                    Err(_) => break,
                };
                let Some(request) = read_request(&mut stream) else {
                    continue;
                };
                seen.lock().unwrap().push(request.clone());
                let reply = handler(&request);
                write_reply(&mut stream, &reply);
            }
        });

        MockServer {
            base: format!("http://127.0.0.1:{port}"),
            requests,
        }
    }

    pub fn url(&self) -> &str {
        &self.base
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

fn read_request(stream: &mut TcpStream) -> Option<Recorded> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    let content_length: usize = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while data.len() < body_start + content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
    }
    let body = data[body_start..].to_vec();

    Some(Recorded {
        method,
        path,
        headers,
        body,
    })
}

fn write_reply(stream: &mut TcpStream, reply: &Reply) {
    let reason = StatusCode::from_u16(reply.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        reason,
        reply.body.len(),
        reply.body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

// ─── Fake vendor cloud ─────────────────────────────────────────────

pub const TOKEN: &str = "tok-1";
pub const HOUSEHOLD: &str = "h-1";
pub const FIGURINE: &str = "t-1";

/// Vendor API, token endpoint and object store in one. The `*_status`
/// overrides turn individual endpoints into failures.
#[derive(Default)]
pub struct FakeCloud {
    pub households: Vec<(&'static str, &'static str)>,
    pub figurines: Vec<(&'static str, &'static str)>,
    pub token_status: Option<u16>,
    pub households_status: Option<u16>,
    /// 1-based number of the slot request that fails with 500.
    pub fail_slot_at: Option<usize>,
    pub bucket_status: Option<u16>,
    pub publish_status: Option<u16>,
    /// Slot requests served so far.
    pub slots: AtomicUsize,
    /// Chapter list stored by the last successful PATCH.
    pub chapters: Mutex<Option<Vec<Chapter>>>,
}

impl FakeCloud {
    pub fn start(mut self) -> Cloud {
        if self.households.is_empty() {
            self.households = vec![(HOUSEHOLD, "Home"), ("h-2", "Grandma")];
        }
        if self.figurines.is_empty() {
            self.figurines = vec![(FIGURINE, "Bear"), ("t-2", "Rabbit")];
        }
        let state = Arc::new(self);
        let handler_state = Arc::clone(&state);
        let server = MockServer::start(move |req| handler_state.handle(req));
        Cloud { state, server }
    }

    fn handle(&self, req: &Recorded) -> Reply {
        let figurines_path = format!("/v2/households/{HOUSEHOLD}/creativetonies");
        let figurine_path = format!("{figurines_path}/{FIGURINE}");

        match (req.method.as_str(), req.path.as_str()) {
            ("POST", "/token") => match self.token_status {
                Some(status) => Reply::json(status, r#"{"error":"invalid_grant"}"#),
                None => Reply::json(
                    200,
                    format!(r#"{{"access_token":"{TOKEN}","token_type":"bearer","expires_in":300}}"#),
                ),
            },
            ("GET", "/v2/households") => match self.households_status {
                Some(status) => Reply::json(status, "maintenance"),
                None => Reply::json(200, named_json(&self.households)),
            },
            ("GET", path) if path == figurines_path => {
                Reply::json(200, named_json(&self.figurines))
            }
            ("POST", "/v2/file") => {
                let n = self.slots.fetch_add(1, Ordering::SeqCst) + 1;
                if self.fail_slot_at == Some(n) {
                    return Reply::json(500, "boom");
                }
                let host = req.header("host").unwrap_or("127.0.0.1");
                Reply::json(
                    200,
                    format!(
                        r#"{{"request":{{"url":"http://{host}/bucket","fields":{{"key":"key-{n}","policy":"p0l1cy","x-amz-signature":"s1g"}}}},"fileId":"file-{n}"}}"#
                    ),
                )
            }
            ("POST", "/bucket") => match self.bucket_status {
                Some(status) => Reply::json(status, "<Error>AccessDenied</Error>"),
                None => Reply::json(204, ""),
            },
            ("PATCH", path) if path == figurine_path => {
                if let Some(status) = self.publish_status {
                    return Reply::json(status, "");
                }
                let update: serde_json::Value =
                    serde_json::from_slice(&req.body).expect("chapter update is json");
                let chapters: Vec<Chapter> =
                    serde_json::from_value(update["chapters"].clone()).expect("chapters array");
                *self.chapters.lock().unwrap() = Some(chapters);
                Reply::json(200, "{}")
            }
            _ => Reply::json(404, "not found"),
        }
    }
}

fn named_json(items: &[(&str, &str)]) -> String {
    let items: Vec<serde_json::Value> = items
        .iter()
        .map(|(id, name)| serde_json::json!({ "id": id, "name": name }))
        .collect();
    serde_json::Value::Array(items).to_string()
}

/// A running `FakeCloud`.
pub struct Cloud {
    state: Arc<FakeCloud>,
    server: MockServer,
}

impl Cloud {
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            api_base_url: format!("{}/v2", self.server.url()),
            token_url: format!("{}/token", self.server.url()),
            ..Endpoints::default()
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.server.requests()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests().iter().filter(|r| r.is(method, path)).count()
    }

    pub fn publish_count(&self) -> usize {
        self.requests().iter().filter(|r| r.method == "PATCH").count()
    }

    /// Chapter list currently stored on the figurine.
    pub fn chapters(&self) -> Option<Vec<Chapter>> {
        self.state.chapters.lock().unwrap().clone()
    }
}

// ─── Fixtures ──────────────────────────────────────────────────────

pub fn complete_credentials() -> Credentials {
    Credentials {
        username: "kid@example.com".into(),
        password: "secret".into(),
        household_id: HOUSEHOLD.into(),
        figurine_id: FIGURINE.into(),
    }
}

/// Credentials store inside `dir`, pre-filled with a complete config.
pub fn configured_store(dir: &Path) -> CredentialStore {
    let store = CredentialStore::new(dir.join("tonie_upload.yml"));
    store.save(&complete_credentials()).unwrap();
    store
}

/// A source directory holding the given files.
pub fn source_dir(parent: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
    let dir = parent.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    for (file, content) in files {
        std::fs::write(dir.join(file), content).unwrap();
    }
    dir
}

pub fn chapter(title: &str, file: &str) -> Chapter {
    Chapter {
        title: title.into(),
        file: file.into(),
    }
}

// ─── Scripted setup provider ───────────────────────────────────────

/// Answers prompts from queues; an empty queue counts as the user
/// cancelling. Every prompt is recorded in `asked`.
#[derive(Default)]
pub struct Scripted {
    pub texts: VecDeque<String>,
    pub secrets: VecDeque<String>,
    pub choices: VecDeque<usize>,
    pub paths: VecDeque<PathBuf>,
    pub asked: Vec<String>,
    pub text_defaults: Vec<String>,
}

impl SetupProvider for Scripted {
    fn ask_text(&mut self, prompt: &str, default: &str) -> Result<String, SetupError> {
        self.asked.push(prompt.to_string());
        self.text_defaults.push(default.to_string());
        self.texts.pop_front().ok_or(SetupError::AbortedByUser)
    }

    fn ask_secret(&mut self, prompt: &str) -> Result<String, SetupError> {
        self.asked.push(prompt.to_string());
        self.secrets.pop_front().ok_or(SetupError::AbortedByUser)
    }

    fn ask_choice(&mut self, prompt: &str, items: &[String]) -> Result<usize, SetupError> {
        self.asked.push(format!("{prompt}: {}", items.join(", ")));
        self.choices.pop_front().ok_or(SetupError::AbortedByUser)
    }

    fn ask_path(&mut self, prompt: &str) -> Result<PathBuf, SetupError> {
        self.asked.push(prompt.to_string());
        self.paths.pop_front().ok_or(SetupError::AbortedByUser)
    }
}
