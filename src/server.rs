//! HTTP server
//! Simple HTTP/1.1 server using tokio and basic request framing. One request per
//! connection; every response carries permissive CORS headers.

use crate::api::{self, AppState, HttpResponse};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

const MAX_REQUEST_BYTES: usize = 1_000_000;
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A parsed request line + body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Accept connections forever, one task per connection.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "Server listening");
    loop {
        let (stream, addr) = listener.accept().await?;
        debug!(%addr, "New connection");
        let state = state.clone();
        tokio::spawn(async move {
            handle_connection(stream, &state).await;
        });
    }
}

async fn handle_connection(mut stream: TcpStream, state: &AppState) {
    let raw = match timeout(READ_TIMEOUT, read_request(&mut stream)).await {
        Ok(Ok(raw)) => raw,
        Ok(Err(e)) => {
            warn!(error = %e, "Failed to read from stream");
            return;
        }
        Err(_) => {
            warn!("Request read timeout");
            return;
        }
    };
    if raw.is_empty() {
        return;
    }

    let response = match parse_request(&raw) {
        Some(req) => {
            debug!(method = %req.method, path = %req.path, "Request");
            api::route(state, &req.method, &req.path, &req.body).await
        }
        None => HttpResponse::json(400, &serde_json::json!({"detail": "Bad Request"})),
    };

    if let Err(e) = stream.write_all(render_response(&response).as_bytes()).await {
        warn!(error = %e, "Failed to write response");
    }
}

/// Read until headers plus `Content-Length` bytes of body have arrived.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(headers_end) = find_headers_end(&buffer) {
            let head = String::from_utf8_lossy(&buffer[..headers_end]);
            let content_length = extract_content_length(&head).unwrap_or(0);
            if buffer.len() >= headers_end + content_length {
                break;
            }
        }
        if buffer.len() > MAX_REQUEST_BYTES {
            break;
        }
    }
    Ok(buffer)
}

fn find_headers_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

fn extract_content_length(head: &str) -> Option<usize> {
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// Split raw bytes into method, path (query string dropped) and body.
pub fn parse_request(raw: &[u8]) -> Option<Request> {
    let headers_end = find_headers_end(raw).unwrap_or(raw.len());
    let head = std::str::from_utf8(&raw[..headers_end]).ok()?;
    let mut parts = head.lines().next()?.split_whitespace();
    let method = parts.next()?.to_uppercase();
    let target = parts.next()?;
    let path = target.split('?').next().unwrap_or(target).to_string();

    let body_bytes = raw.get(headers_end..).unwrap_or_default();
    let body = match extract_content_length(head) {
        Some(len) => &body_bytes[..len.min(body_bytes.len())],
        None => body_bytes,
    };

    Some(Request {
        method,
        path,
        body: String::from_utf8_lossy(body).into_owned(),
    })
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

pub fn render_response(response: &HttpResponse) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Credentials: true\r\n\
         Access-Control-Allow-Methods: GET, POST, PUT, DELETE, OPTIONS\r\n\
         Access-Control-Allow-Headers: *\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        response.status,
        status_text(response.status),
        response.body.len(),
        response.body
    )
}
