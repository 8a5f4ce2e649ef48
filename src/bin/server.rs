//! HTTP server for the schema localization endpoints
//! Simple HTTP server using tokio and basic HTTP handling

use schema_localization::config::Config;
use schema_localization::db::open_read_only;
use schema_localization::routes::{dispatch, match_route, parse_query, ApiResponse};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const READ_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REQUEST_BYTES: usize = 1_000_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Arc::new(Config::from_env()?);
    info!("Starting schema localization server on {}", config.bind_addr);
    info!("Database: {}", config.database_path.display());

    let listener = TcpListener::bind(&config.bind_addr).await?;

    loop {
        let (stream, addr) = listener.accept().await?;
        debug!("New connection from: {}", addr);
        tokio::spawn(handle_connection(stream, Arc::clone(&config)));
    }
}

async fn handle_connection(mut stream: TcpStream, config: Arc<Config>) {
    let mut buffer = Vec::new();
    let mut temp_buf = [0; 8192];

    // GET requests only, so the headers are the whole request
    let read_result = timeout(READ_TIMEOUT, async {
        loop {
            match stream.read(&mut temp_buf).await {
                Ok(0) => break,
                Ok(n) => {
                    buffer.extend_from_slice(&temp_buf[..n]);
                    if buffer.windows(4).any(|w| w == b"\r\n\r\n") || buffer.len() > MAX_REQUEST_BYTES {
                        break;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    })
    .await;

    match read_result {
        Err(_) => {
            warn!("Request read timeout");
            return;
        }
        Ok(Err(e)) => {
            error!("Failed to read from stream: {}", e);
            return;
        }
        Ok(Ok(())) => {}
    }

    if buffer.is_empty() {
        return;
    }

    let response = match String::from_utf8(buffer) {
        Ok(request) => handle_request(&request, config).await,
        Err(_) => create_response(400, r#"{"error":"request is not valid UTF-8"}"#),
    };

    if let Err(e) = stream.write_all(response.as_bytes()).await {
        error!("Failed to write response: {}", e);
    }
}

async fn handle_request(request: &str, config: Arc<Config>) -> String {
    let request_line = request.lines().next().unwrap_or_default();
    let parts: Vec<&str> = request_line.split_whitespace().collect();

    if parts.len() < 2 {
        return create_response(400, r#"{"error":"malformed request line"}"#);
    }

    let method = parts[0];
    let (path, query_string) = parts[1].split_once('?').unwrap_or((parts[1], ""));

    debug!("Request: {} {}", method, path);

    let route = match match_route(path) {
        Some(route) => route,
        None => return create_response(404, r#"{"error":"not found"}"#),
    };

    if method != "GET" {
        return create_response(405, r#"{"error":"method not allowed"}"#);
    }

    let params = parse_query(query_string);
    let endpoint = route.endpoint;

    // Localization runs synchronous SQLite reads
    let result = tokio::task::spawn_blocking(move || {
        dispatch(endpoint, &params, &config, || open_read_only(&config.database_path))
    })
    .await;

    match result {
        Ok(ApiResponse { status, body }) => {
            if status >= 500 {
                error!("{} {} failed: {}", method, path, body);
            }
            create_response(status, &body)
        }
        Err(e) => {
            error!("Request handler panicked: {}", e);
            create_response(500, r#"{"error":"internal server error"}"#)
        }
    }
}

fn create_response(status: u16, body: &str) -> String {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "Internal Server Error",
    };
    format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    )
}
