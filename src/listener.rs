//! Local HTTP listener for the OAuth2 authorization callback.
//!
//! The provider redirects the user's browser to `http://localhost:<port>`
//! with either a `code` or an `error` query parameter. The listener runs
//! as a background tokio task, captures whichever arrives first, serves a
//! static human-readable page, and then stops accepting connections.
//!
//! Lifetime is bounded: `stop()` (or receipt of the first callback) shuts
//! the accept loop down, joins the task within a short bounded wait, and
//! releases the port. Binding a second listener without stopping the first
//! is unsupported; the bind simply fails while the port is held.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::observability;

/// Interval at which `wait` re-checks the captured state.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Bound on how long `stop` waits for the accept task to finish.
const STOP_GRACE: Duration = Duration::from_secs(2);

/// What the listener captured, if anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// An authorization code arrived.
    Code(String),
    /// The provider redirected back with an error parameter.
    Denied(String),
    /// Nothing arrived within the caller's timeout.
    TimedOut,
}

#[derive(Default)]
struct Captured {
    code: Option<String>,
    error: Option<String>,
}

/// A bounded-lifetime local listener for one OAuth callback.
pub struct CallbackListener {
    port: u16,
    captured: Arc<Mutex<Captured>>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackListener {
    /// Binds the listener and starts accepting in the background.
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await.map_err(|err| {
            Error::connection(
                format!("failed to bind OAuth callback listener on port {port}"),
                Some(Box::new(err)),
            )
        })?;

        let captured = Arc::new(Mutex::new(Captured::default()));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let state = Arc::clone(&captured);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { continue };
                        if serve_connection(stream, &state).await {
                            // First code or error captured; stop accepting.
                            break;
                        }
                    }
                }
            }
        });

        Ok(Self {
            port,
            captured,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// The redirect URI the authorization request must name.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Polls the captured state until a code or error appears or the
    /// timeout elapses.
    pub async fn wait(&self, timeout: Duration) -> CallbackOutcome {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let captured = self.captured.lock().expect("listener state poisoned");
                if let Some(code) = &captured.code {
                    return CallbackOutcome::Code(code.clone());
                }
                if let Some(error) = &captured.error {
                    return CallbackOutcome::Denied(error.clone());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return CallbackOutcome::TimedOut;
            }
            tokio::time::sleep_until(deadline.min(tokio::time::Instant::now() + POLL_INTERVAL))
                .await;
        }
    }

    /// Shuts the accept loop down and releases the port.
    ///
    /// Joins the background task within a short bounded wait. Safe to call
    /// more than once.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            // Bounded join; a task wedged in a client write is abandoned.
            let _ = tokio::time::timeout(STOP_GRACE, handle).await;
        }
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Handles one inbound connection. Returns true once a code or error has
/// been captured and the listener should stop accepting.
async fn serve_connection(mut stream: TcpStream, state: &Arc<Mutex<Captured>>) -> bool {
    let mut buf = vec![0u8; 4096];
    let n = match stream.read(&mut buf).await {
        Ok(n) => n,
        Err(_) => return false,
    };
    let request = String::from_utf8_lossy(&buf[..n]);

    let Some(target) = request_target(&request) else {
        let _ = stream
            .write_all(response(400, "Bad Request", "<p>Malformed request.</p>").as_bytes())
            .await;
        return false;
    };

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };

    if path != "/" && !path.starts_with("/oauth") {
        let _ = stream
            .write_all(response(404, "Not Found", "<p>Not found.</p>").as_bytes())
            .await;
        return false;
    }

    let mut code = None;
    let mut error = None;
    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                _ => {}
            }
        }
    }

    observability::CALLBACK_REQUESTS.click();

    if let Some(code) = code {
        state.lock().expect("listener state poisoned").code = Some(code);
        let _ = stream
            .write_all(response(200, "OK", SUCCESS_PAGE).as_bytes())
            .await;
        true
    } else if let Some(error) = error {
        let body = ERROR_PAGE.replace("{error}", &error);
        state.lock().expect("listener state poisoned").error = Some(error);
        let _ = stream
            .write_all(response(400, "Bad Request", &body).as_bytes())
            .await;
        true
    } else {
        let _ = stream
            .write_all(
                response(404, "Not Found", "<p>Missing code or error parameter.</p>").as_bytes(),
            )
            .await;
        false
    }
}

/// Extracts the request target from the first line of an HTTP request.
fn request_target(request: &str) -> Option<&str> {
    let first_line = request.lines().next()?;
    let mut parts = first_line.split_whitespace();
    let method = parts.next()?;
    if method != "GET" {
        return None;
    }
    parts.next()
}

fn response(status: u16, reason: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Authorization Successful</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 50px; text-align: center; }
    .success { color: #28a745; }
    .container { max-width: 600px; margin: 0 auto; }
  </style>
</head>
<body>
  <div class="container">
    <h1 class="success">Authorization Successful</h1>
    <p>The bot has been authorized to access your Blogger account.</p>
    <p><strong>You can close this tab and return to the chat.</strong></p>
    <p>Finish setup with the <code>/complete_auth</code> command.</p>
  </div>
</body>
</html>
"#;

const ERROR_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Authorization Failed</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 50px; text-align: center; }
    .error { color: #dc3545; }
    .container { max-width: 600px; margin: 0 auto; }
  </style>
</head>
<body>
  <div class="container">
    <h1 class="error">Authorization Failed</h1>
    <p>Error: {error}</p>
    <p>Please try again from the chat.</p>
  </div>
</body>
</html>
"#;
