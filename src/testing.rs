// src/testing.rs
// =============================================================================
// A tiny HTTP server for tests.
//
// It binds a random local port, answers each request from a fixed list of
// routes, and closes the connection after every response. Only the request
// path is matched (the query string is ignored). Unknown paths get a 404.
// =============================================================================

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One canned response.
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub status: u16,
    pub body: String,
}

pub fn route(path: &str, status: u16, body: &str) -> Route {
    Route {
        path: path.to_string(),
        status,
        body: body.to_string(),
    }
}

// Starts the server in the background.
//
// Parameters:
//   make_routes: builds the routes from the server's base URL, so bodies can
//     point back at the server (e.g. a resource URL in a catalogue listing)
//
// Returns: the base URL, e.g. "http://127.0.0.1:41234/"
pub async fn serve(make_routes: impl FnOnce(&str) -> Vec<Route>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/", listener.local_addr().unwrap());
    let routes = make_routes(&base);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let routes = routes.clone();
            tokio::spawn(async move {
                let _ = respond(stream, &routes).await;
            });
        }
    });

    base
}

async fn respond(mut stream: TcpStream, routes: &[Route]) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }

    // "GET /path?query HTTP/1.1"
    let head = String::from_utf8_lossy(&request);
    let target = head.split_whitespace().nth(1).unwrap_or("/");
    let path = target.split('?').next().unwrap_or(target);

    let (status, body) = routes
        .iter()
        .find(|r| r.path == path)
        .map(|r| (r.status, r.body.as_str()))
        .unwrap_or((404, r#"{"error":"not found"}"#));

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason(status),
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
