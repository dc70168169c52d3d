//! Minimal HTTP/1.1 server for tests.
//!
//! Serves fixed responses per path and records every requested path in order.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Route status that accepts the request but never answers it.
pub(crate) const STALL: u16 = 0;

/// A running test server. It lives until the test process exits.
pub(crate) struct TestServer {
    base: String,
    hits: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Starts a server answering each path in `routes` with the given status and body; other paths get a 404.
    ///
    /// A route with status [STALL] keeps the connection open without sending anything.
    pub(crate) fn start(routes: &[(&str, u16, &str)]) -> Self {
        let routes: HashMap<String, (u16, Vec<u8>)> = routes
            .iter()
            .map(|(path, status, body)| (path.to_string(), (*status, body.as_bytes().to_vec())))
            .collect();
        let routes = Arc::new(routes);
        let hits = Arc::new(Mutex::new(Vec::new()));

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let server_hits = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&routes);
                let hits = Arc::clone(&server_hits);
                thread::spawn(move || handle(stream, &routes, &hits));
            }
        });

        Self {
            base: format!("http://127.0.0.1:{port}"),
            hits,
        }
    }

    /// Returns the full URL for the given path.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Returns the requested paths in order.
    pub(crate) fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

/// Returns a URL on a port nobody listens on, so connecting fails immediately.
pub(crate) fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/setup_shell_gpt.py")
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, (u16, Vec<u8>)>, hits: &Mutex<Vec<String>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));

    // read the request head
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    let request = String::from_utf8_lossy(&request);
    let Some(path) = request.split_whitespace().nth(1) else {
        return;
    };
    hits.lock().unwrap().push(path.to_string());

    let (status, body) = routes.get(path).cloned().unwrap_or((404, b"not found".to_vec()));
    if status == STALL {
        thread::sleep(Duration::from_secs(10));
        return;
    }
    let head = format!("HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n", body.len());
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}
