//! Minimal HTTP/1.1 server imitating the provider's `getsourcecode` endpoint.
//!
//! Each request's target is recorded. The response is chosen by a closure
//! given the `address` query parameter and the request count so far.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// Status code and body to answer with.
pub type Reply = (u16, String);

pub struct ProviderServer {
    pub api_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ProviderServer {
    /// Request targets seen so far (path plus query).
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Body of a successful answer for a verified contract named `name`.
pub fn verified(name: &str) -> String {
    format!(
        r#"{{"status":"1","message":"OK","result":[{{"SourceCode":"contract {name} {{}}","ContractName":"{name}","CompilerVersion":"v0.8.19+commit.7dd6d404"}}]}}"#
    )
}

/// Body of a provider rejection (`status = "0"`).
pub fn rejected(reason: &str) -> String {
    format!(r#"{{"status":"0","message":"NOTOK","result":"{reason}"}}"#)
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start<F>(reply: F) -> ProviderServer
where
    F: Fn(&str, usize) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);
    let reply = Arc::new(reply);
    let count = Arc::new(AtomicUsize::new(0));
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let reply = Arc::clone(&reply);
            let seen = Arc::clone(&seen);
            let count = Arc::clone(&count);
            thread::spawn(move || handle(stream, reply.as_ref(), &seen, &count));
        }
    });
    ProviderServer {
        api_url: format!("http://127.0.0.1:{}/api", port),
        requests,
    }
}

fn handle<F>(
    mut stream: std::net::TcpStream,
    reply: &F,
    seen: &Mutex<Vec<String>>,
    count: &AtomicUsize,
) where
    F: Fn(&str, usize) -> Reply,
{
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("")
        .to_string();
    let address = query_param(&target, "address").unwrap_or_default();
    let index = count.fetch_add(1, Ordering::SeqCst);
    seen.lock().unwrap().push(target);

    let (status, body) = reply(&address, index);
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(body.as_bytes());
}

fn query_param(target: &str, name: &str) -> Option<String> {
    let (_, query) = target.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}
