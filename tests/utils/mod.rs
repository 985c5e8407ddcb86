//! Loopback HTTP server standing in for GitHub and the model endpoint.
//!
//! Every request is recorded with its body so tests can assert on what the
//! binary sent. Responses come from a shared, replaceable handler.

use assert_cmd::prelude::*;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response, StatusCode, body::Incoming, service::service_fn};
use hyper_util::{rt::TokioExecutor, server::conn::auto};
use serde_json::json;
use std::io::ErrorKind;
use std::path::Path;
use std::{
    net::SocketAddr,
    process::Command,
    sync::{Arc, Mutex},
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

/// A request seen by the server.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: String,
}

/// Shared handler type invoked for each incoming request.
pub type Handler = Arc<Mutex<Box<dyn FnMut(&Request<Bytes>) -> Response<Full<Bytes>> + Send>>>;

/// Requests received so far, in arrival order.
pub type Log = Arc<Mutex<Vec<Recorded>>>;

/// Handle returned by [`start_mitm`] for shutting down the server.
pub struct ShutdownHandle {
    join: JoinHandle<()>,
    stop: oneshot::Sender<()>,
}

impl ShutdownHandle {
    /// Signal the server to stop and await shutdown.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        let _ = self.join.await;
    }
}

/// Start an HTTP server forwarding requests to a shared handler.
///
/// # Errors
///
/// Returns an error if the server fails to bind to a local port.
///
/// # Panics
///
/// Panics if the default response cannot be constructed.
#[expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! uses % internally"
)]
pub async fn start_mitm() -> Result<(SocketAddr, Handler, Log, ShutdownHandle), std::io::Error> {
    let handler: Handler = Arc::new(Mutex::new(Box::new(|_req| {
        Response::builder()
            .status(404)
            .body(Full::from("No handler"))
            .expect("failed to create default response")
    })));
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let handler_clone = handler.clone();
    let log_clone = log.clone();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, mut rx) = oneshot::channel();

    let join = tokio::spawn(async move {
        let builder = auto::Builder::new(TokioExecutor::new());
        loop {
            tokio::select! {
                res = listener.accept() => match res {
                    Ok((stream, _)) => {
                        let io = hyper_util::rt::TokioIo::new(stream);
                        let h = handler_clone.clone();
                        let log = log_clone.clone();
                        let service = service_fn(move |req: Request<Incoming>| {
                            let h = h.clone();
                            let log = log.clone();
                            async move {
                                let (parts, body) = req.into_parts();
                                let bytes = body.collect().await.map(|b| b.to_bytes()).unwrap_or_default();
                                let req = Request::from_parts(parts, bytes);
                                log.lock().expect("lock log").push(Recorded {
                                    method: req.method().clone(),
                                    path: req.uri().path().to_owned(),
                                    body: String::from_utf8_lossy(req.body()).into_owned(),
                                });
                                let resp = {
                                    let mut f = h.lock().expect("lock handler in service");
                                    (f)(&req)
                                };
                                Ok::<_, std::convert::Infallible>(resp)
                            }
                        });
                        let builder = builder.clone();
                        tokio::spawn(async move {
                            let _ = builder.serve_connection(io, service).await;
                        });
                    }
                    Err(e) => {
                        eprintln!("accept error: {e}");
                        match e.kind() {
                            ErrorKind::ConnectionAborted
                            | ErrorKind::ConnectionReset
                            | ErrorKind::Interrupted
                            | ErrorKind::WouldBlock => {}
                            _ => break,
                        }
                    }
                },
                _ = &mut rx => break,
            }
        }
    });

    Ok((addr, handler, log, ShutdownHandle { join, stop: tx }))
}

/// Canned pull request served by [`serve_pull_request`].
#[derive(Debug, Clone)]
pub struct MockPr {
    pub head: String,
    pub base: String,
    pub diff: String,
    /// Assistant message returned by the chat-completions endpoint.
    pub completion: String,
    /// Status returned for review submissions.
    pub review_status: u16,
}

fn respond(status: u16, content_type: &str, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::from_u16(status).expect("status"))
        .header("Content-Type", content_type)
        .body(Full::from(body))
        .expect("build response")
}

/// Route GitHub REST and chat-completions requests to `mock`.
///
/// # Panics
///
/// Panics if the handler lock is poisoned.
#[allow(dead_code, reason = "helper used in some tests only")]
pub fn serve_pull_request(handler: &Handler, mock: MockPr) {
    *handler.lock().expect("lock handler") = Box::new(move |req| {
        let path = req.uri().path();
        match (req.method(), path) {
            (&Method::POST, p) if p.ends_with("/chat/completions") => {
                let body = json!({
                    "choices": [{ "message": { "role": "assistant", "content": mock.completion } }]
                });
                respond(200, "application/json", body.to_string())
            }
            (&Method::POST, p) if p.ends_with("/reviews") => {
                respond(mock.review_status, "application/json", json!({ "id": 1 }).to_string())
            }
            (&Method::GET, p) if p.contains("/compare/") => {
                respond(200, "text/plain", mock.diff.clone())
            }
            (&Method::GET, p) if p.contains("/pulls/") => {
                let body = json!({
                    "head": { "sha": mock.head },
                    "base": { "sha": mock.base }
                });
                respond(200, "application/json", body.to_string())
            }
            _ => respond(404, "text/plain", "not found".into()),
        }
    });
}

/// Create a `revk` command pointed at the loopback server.
///
/// The command runs inside `workspace`, ignores any ambient credentials and
/// disables retries so failures surface immediately.
#[allow(
    clippy::must_use_candidate,
    reason = "helper for integration tests"
)]
pub fn revk_cmd(addr: SocketAddr, workspace: &Path) -> Command {
    revk_cmd_with_attempts(addr, workspace, 1)
}

/// Like [`revk_cmd`], allowing up to `attempts` tries per retryable request.
#[allow(
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    reason = "helper for integration tests"
)]
pub fn revk_cmd_with_attempts(addr: SocketAddr, workspace: &Path, attempts: u32) -> Command {
    let mut cmd = Command::cargo_bin("revk").expect("binary");
    cmd.current_dir(workspace)
        .env("REVK_CONFIG_PATH", workspace.join("missing.toml"))
        .env_remove("GITHUB_TOKEN")
        .env_remove("REVK_GITHUB_TOKEN")
        .env_remove("OPENAI_API_KEY")
        .env_remove("REVK_LLM_API_KEY")
        .env("NO_COLOR", "1")
        .args([
            "--repo",
            "octocat/hello-world",
            "--github-token",
            "dummy",
            "--github-api-url",
        ])
        .arg(format!("http://{addr}"))
        .arg("--llm-api-key")
        .arg("sk-test")
        .arg("--llm-endpoint")
        .arg(format!("http://{addr}/v1"))
        .arg("--workspace")
        .arg(workspace)
        .arg("--retry-attempts")
        .arg(attempts.to_string());
    cmd
}

const _: fn(SocketAddr, &Path) -> Command = revk_cmd;
const _: fn(SocketAddr, &Path, u32) -> Command = revk_cmd_with_attempts;
