#![allow(dead_code)]

use cfg_evals::api::AppState;
use cfg_evals::config::Settings;
use cfg_evals::execution::QueryExecutor;
use cfg_evals::translator::Translator;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub fn grammar_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("grammars/clickhouse_sql.bnf")
}

/// Default settings: mock mode, no credentials.
pub fn mock_state() -> AppState {
    AppState::from_settings(Settings::default()).unwrap()
}

/// Model path pointed at `base_url`, executing against the sample data.
pub fn model_state(base_url: &str) -> AppState {
    let settings = Settings {
        mock_mode: false,
        openai_api_key: Some("sk-test".to_string()),
        openai_base_url: base_url.to_string(),
        grammar_path: grammar_path(),
        ..Settings::default()
    };
    let translator = Translator::from_settings(&settings).unwrap();
    assert!(translator.uses_model());
    AppState::new(settings, translator, QueryExecutor::simulated())
}

/// Completion body in the OpenAI chat format.
pub fn completion(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}]
    })
    .to_string()
}

/// One-shot-per-connection HTTP stub that always answers with `status` + `body`.
/// Returns the base URL and the raw requests it received.
pub async fn spawn_stub(status: u16, body: String) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_task = seen.clone();

    tokio::spawn(async move {
        loop {
            let (mut stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let request = read_full_request(&mut stream).await;
            seen_task.lock().unwrap().push(request);
            let response = format!(
                "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (format!("http://{}/v1", addr), seen)
}

async fn read_full_request(stream: &mut tokio::net::TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buffer.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buffer);
        if let Some(pos) = text.find("\r\n\r\n") {
            let content_length = text[..pos]
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.trim().eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            if buffer.len() >= pos + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
