use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ResolvedConfig;
use crate::output::OutputSink;
use crate::protocol::{ServerResponse, TaskRequest};

// ── Transport ─────────────────────────────────────────────────────────────────

/// One JSON POST round trip to the task service.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, endpoint: &str, body: &Value) -> Result<ServerResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn post(&self, endpoint: &str, body: &Value) -> Result<ServerResponse> {
        (**self).post(endpoint, body).await
    }
}

pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    cookie: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &ResolvedConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("taskterm/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            http: builder.build().context("Failed to build HTTP client")?,
            base_url: config.base_url.clone(),
            cookie: config.cookie.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, endpoint: &str, body: &Value) -> Result<ServerResponse> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), endpoint);

        let mut req = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(cookie) = &self.cookie {
            req = req.header("Cookie", cookie);
        }

        let resp = req.send().await?;
        // The service answers validation failures with 400 + a normal envelope,
        // so the body is decoded regardless of status.
        let status = resp.status();
        let text = resp.text().await?;
        serde_json::from_str(&text)
            .with_context(|| format!("HTTP {status}: response is not a task service envelope"))
    }
}

// ── Request client ────────────────────────────────────────────────────────────

/// How a call's outcome is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    /// Don't render the outcome to the output sink
    pub silent: bool,
    /// Hand the envelope back to the caller
    pub return_result: bool,
}

impl SendOptions {
    /// Fire-and-render: used by single-step commands.
    pub const RENDER: Self = Self { silent: false, return_result: false };
}

pub struct RequestClient<T> {
    transport: T,
}

impl<T: Transport> RequestClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Perform one call. Never fails: transport and decode errors come back
    /// as an `error` envelope, exactly like a service-side error.
    pub async fn send(
        &self,
        request: &TaskRequest,
        opts: SendOptions,
        out: &mut dyn OutputSink,
    ) -> Option<ServerResponse> {
        let response = self.dispatch(request, opts.silent, out).await;
        opts.return_result.then_some(response)
    }

    /// Silent call that always hands the envelope back. Multi-step flows
    /// use it and render on their own.
    pub async fn inspect(&self, request: &TaskRequest, out: &mut dyn OutputSink) -> ServerResponse {
        self.dispatch(request, true, out).await
    }

    async fn dispatch(
        &self,
        request: &TaskRequest,
        silent: bool,
        out: &mut dyn OutputSink,
    ) -> ServerResponse {
        let response = match request.endpoint() {
            Some(endpoint) => {
                debug!(endpoint, silent, "sending request");
                match self.transport.post(endpoint, &request.body()).await {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(endpoint, error = %format!("{e:#}"), "transport failure");
                        ServerResponse::transport_error(format!("Error: {e:#}"))
                    }
                }
            }
            None => {
                warn!(command = request.command_name(), "no remote endpoint for command");
                ServerResponse::transport_error(format!(
                    "Error: '{}' has no remote endpoint",
                    request.command_name()
                ))
            }
        };
        debug!(command = request.command_name(), status = ?response.status, "response received");

        if !silent {
            if response.is_success() {
                out.success(response.result_text());
            } else {
                out.error(response.message_text());
            }
        }
        response
    }
}

// ── Scripted transport for tests ──────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use super::fake::ScriptedTransport;
    use super::*;
    use crate::output::{LineKind, OutputLog};
    use crate::protocol::{Status, TaskId};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn view(id: &str) -> TaskRequest {
        TaskRequest::View { task_id: TaskId(id.to_string()) }
    }

    #[tokio::test]
    async fn test_render_mode_shows_success_result() {
        let t = ScriptedTransport::new();
        t.reply_ok("1. Write report");
        let client = RequestClient::new(t.clone());
        let mut out = OutputLog::default();

        let r = client
            .send(&TaskRequest::List { args: String::new() }, SendOptions::RENDER, &mut out)
            .await;
        assert!(r.is_none());
        assert_eq!(out.rendered(), vec![(LineKind::Success, "1. Write report")]);
        assert_eq!(t.endpoints(), vec!["/terminal/list"]);
    }

    #[tokio::test]
    async fn test_render_mode_shows_error_message() {
        let t = ScriptedTransport::new();
        t.reply_err("not found");
        let client = RequestClient::new(t);
        let mut out = OutputLog::default();

        client.send(&view("9"), SendOptions::RENDER, &mut out).await;
        assert_eq!(out.rendered(), vec![(LineKind::Error, "not found")]);
    }

    #[tokio::test]
    async fn test_inspect_mode_is_silent_and_returns() {
        let t = ScriptedTransport::new();
        t.reply_ok("{}");
        let client = RequestClient::new(t);
        let mut out = OutputLog::default();

        let r = client.inspect(&view("1"), &mut out).await;
        assert!(r.is_success());
        assert!(out.lines().is_empty());
    }

    #[tokio::test]
    async fn test_flags_are_independent() {
        let t = ScriptedTransport::new();
        t.reply_ok("shown");
        let client = RequestClient::new(t);
        let mut out = OutputLog::default();

        let opts = SendOptions { silent: false, return_result: true };
        let r = client.send(&view("1"), opts, &mut out).await;
        assert_eq!(r.unwrap().result_text(), "shown");
        assert_eq!(out.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_normalized() {
        let t = ScriptedTransport::new();
        t.fail("connection refused");
        let client = RequestClient::new(t);
        let mut out = OutputLog::default();

        let r = client.inspect(&view("1"), &mut out).await;
        assert_eq!(r.status, Status::Error);
        assert_eq!(r.message_text(), "Error: connection refused");
        assert_eq!(r.result, None);
        assert!(out.lines().is_empty());

        let t = ScriptedTransport::new();
        t.fail("connection refused");
        let client = RequestClient::new(t);
        client.send(&view("1"), SendOptions::RENDER, &mut out).await;
        assert_eq!(out.rendered(), vec![(LineKind::Error, "Error: connection refused")]);
    }

    // ── HttpTransport against a local socket ──────────────────────────────────

    fn config(base_url: String) -> ResolvedConfig {
        ResolvedConfig {
            base_url,
            request_timeout_secs: Some(5),
            cookie: Some("session=abc".to_string()),
            profile_name: "test".to_string(),
        }
    }

    /// Serve exactly one canned HTTP response; yields the raw request text.
    async fn serve_once(status_line: &str, body: &str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let len = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if buf.len() >= head_end + 4 + len {
                        break;
                    }
                }
            }
            sock.write_all(response.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
            String::from_utf8_lossy(&buf).to_string()
        });
        (format!("http://{addr}/"), handle)
    }

    #[tokio::test]
    async fn test_http_posts_json_and_decodes_envelope() {
        let (base, server) = serve_once("200 OK", r#"{"status":"success","result":"added"}"#).await;
        let transport = HttpTransport::new(&config(base)).unwrap();

        let r = transport
            .post("/terminal/view", &serde_json::json!({"task_id": "4"}))
            .await
            .unwrap();
        assert!(r.is_success());
        assert_eq!(r.result_text(), "added");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /terminal/view HTTP/1.1"));
        assert!(request.to_lowercase().contains("cookie: session=abc"));
        assert!(request.ends_with(r#"{"task_id":"4"}"#));
    }

    #[tokio::test]
    async fn test_http_error_status_still_decodes_envelope() {
        let (base, _server) =
            serve_once("400 Bad Request", r#"{"status":"error","message":"bad id"}"#).await;
        let transport = HttpTransport::new(&config(base)).unwrap();
        let r = transport.post("/terminal/delete", &Value::Null).await.unwrap();
        assert_eq!(r.status, Status::Error);
        assert_eq!(r.message_text(), "bad id");
    }

    #[tokio::test]
    async fn test_http_malformed_body_becomes_error_envelope() {
        let (base, _server) = serve_once("500 Internal Server Error", "<html>oops</html>").await;
        let client = RequestClient::new(HttpTransport::new(&config(base)).unwrap());
        let mut out = OutputLog::default();

        let r = client.inspect(&view("1"), &mut out).await;
        assert_eq!(r.status, Status::Error);
        assert!(r.message_text().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_http_network_failure_becomes_error_envelope() {
        // Bind then drop to get a port nobody is listening on.
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };
        let client =
            RequestClient::new(HttpTransport::new(&config(format!("http://127.0.0.1:{port}"))).unwrap());
        let mut out = OutputLog::default();

        let r = client.inspect(&view("1"), &mut out).await;
        assert_eq!(r.status, Status::Error);
        assert!(r.message_text().starts_with("Error: "));
        assert!(r.message_text().len() > "Error: ".len());
    }
}
